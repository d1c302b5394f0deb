//! User-wide configuration.
//!
//! Location: `$XDG_CONFIG_HOME/xsdb-bridge/xsdb-bridge.toml`, falling back to
//! the platform config directory.

use std::path::PathBuf;

use thiserror::Error;

use super::settings::BridgeConfig;

const CONFIG_DIR: &str = "xsdb-bridge";
const CONFIG_FILE: &str = "xsdb-bridge.toml";

#[derive(Debug, Error)]
pub enum UserConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type UserConfigResult<T> = Result<T, UserConfigError>;

/// Path of the user config file, or `None` when no config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => dirs::config_dir()?,
    };
    Some(base.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load the user config. A missing file is `Ok(None)`.
pub fn load_user_config() -> UserConfigResult<Option<BridgeConfig>> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|source| UserConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&contents)
        .map(Some)
        .map_err(|source| UserConfigError::Parse { path, source })
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Run `f` with `XDG_CONFIG_HOME` set to `value`, restoring it afterwards.
    ///
    /// Callers must be `#[serial(xdg_env)]`.
    pub(crate) fn with_xdg_config_home<T>(value: &std::path::Path, f: impl FnOnce() -> T) -> T {
        let original = std::env::var_os("XDG_CONFIG_HOME");
        // SAFETY: env mutation is serialised by #[serial(xdg_env)]
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", value);
        }
        let result = f();
        // SAFETY: as above
        unsafe {
            match original {
                Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::with_xdg_config_home;
    use super::*;
    use serial_test::serial;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    #[serial(xdg_env)]
    fn user_config_path_uses_xdg_config_home_when_set() {
        let path = with_xdg_config_home(Path::new("/custom/config"), user_config_path);
        assert_eq!(
            path,
            Some(PathBuf::from("/custom/config/xsdb-bridge/xsdb-bridge.toml"))
        );
    }

    #[test]
    #[serial(xdg_env)]
    fn missing_user_config_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let loaded = with_xdg_config_home(dir.path(), load_user_config).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    #[serial(xdg_env)]
    fn user_config_is_parsed() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("xsdb-bridge")).unwrap();
        std::fs::write(
            dir.path().join("xsdb-bridge/xsdb-bridge.toml"),
            "args = [\"-interactive\", \"-quiet\"]\n",
        )
        .unwrap();

        let loaded = with_xdg_config_home(dir.path(), load_user_config)
            .unwrap()
            .unwrap();
        assert_eq!(
            loaded.args,
            Some(vec!["-interactive".to_string(), "-quiet".to_string()])
        );
    }

    #[test]
    #[serial(xdg_env)]
    fn malformed_user_config_reports_path() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("xsdb-bridge")).unwrap();
        std::fs::write(dir.path().join("xsdb-bridge/xsdb-bridge.toml"), "args = 3\n").unwrap();

        let err = with_xdg_config_home(dir.path(), load_user_config).unwrap_err();
        assert!(matches!(err, UserConfigError::Parse { .. }));
        assert!(err.to_string().contains("xsdb-bridge.toml"));
    }
}
