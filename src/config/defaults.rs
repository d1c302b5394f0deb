//! Programmed defaults, the lowest configuration layer.

use std::path::PathBuf;

use super::settings::BridgeConfig;

/// Environment variable set by the vendor's `settings64.sh`.
pub const VITIS_ROOT_ENV: &str = "XILINX_VITIS";

pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 1000;

/// `$XILINX_VITIS/bin/xsdb` when the toolchain environment is sourced,
/// otherwise whatever `xsdb` is on `PATH`.
pub fn default_xsdb_path() -> String {
    match std::env::var_os(VITIS_ROOT_ENV) {
        Some(root) if !root.is_empty() => PathBuf::from(root)
            .join("bin")
            .join("xsdb")
            .to_string_lossy()
            .into_owned(),
        _ => "xsdb".to_string(),
    }
}

pub fn default_args() -> Vec<String> {
    vec!["-interactive".to_string()]
}

pub fn default_init_commands() -> Vec<String> {
    vec!["connect".to_string()]
}

pub fn default_settings() -> BridgeConfig {
    BridgeConfig {
        xsdb_path: Some(default_xsdb_path()),
        args: Some(default_args()),
        env: None,
        init_commands: Some(default_init_commands()),
        target_filter: None,
        shutdown_timeout_ms: Some(DEFAULT_SHUTDOWN_TIMEOUT_MS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn with_vitis_root<T>(value: Option<&str>, f: impl FnOnce() -> T) -> T {
        let original = std::env::var(VITIS_ROOT_ENV).ok();
        // SAFETY: serialised by #[serial(vitis_env)]
        unsafe {
            match value {
                Some(v) => std::env::set_var(VITIS_ROOT_ENV, v),
                None => std::env::remove_var(VITIS_ROOT_ENV),
            }
        }
        let result = f();
        // SAFETY: as above
        unsafe {
            match original {
                Some(v) => std::env::set_var(VITIS_ROOT_ENV, v),
                None => std::env::remove_var(VITIS_ROOT_ENV),
            }
        }
        result
    }

    #[test]
    #[serial(vitis_env)]
    fn xsdb_path_follows_vitis_root() {
        let path = with_vitis_root(Some("/tools/Xilinx/Vitis/2023.2"), default_xsdb_path);
        assert_eq!(path, "/tools/Xilinx/Vitis/2023.2/bin/xsdb");
    }

    #[test]
    #[serial(vitis_env)]
    fn xsdb_path_falls_back_to_path_lookup() {
        assert_eq!(with_vitis_root(None, default_xsdb_path), "xsdb");
    }

    #[test]
    #[serial(vitis_env)]
    fn defaults_fill_every_field_but_optional_ones() {
        let defaults = with_vitis_root(None, default_settings);
        assert_eq!(defaults.xsdb_path.as_deref(), Some("xsdb"));
        assert!(defaults.env.is_none());
        assert!(defaults.target_filter.is_none());
    }
}
