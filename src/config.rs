//! Layered configuration.
//!
//! Settings are merged from four layers, later layers overriding earlier
//! ones field by field: programmed defaults, the user config file, the
//! project config file and command-line overrides.

pub mod defaults;
pub mod load;
pub mod settings;
pub mod user;

pub use load::{
    PROJECT_CONFIG_FILE, SettingsEvent, SettingsEventKind, SettingsLoadOutcome, load_settings,
};
pub use settings::{BridgeConfig, BridgeSettings};
pub use user::{UserConfigError, UserConfigResult, load_user_config, user_config_path};

/// Merge layers in order of increasing precedence.
pub fn merge_all(configs: &[Option<BridgeConfig>]) -> Option<BridgeConfig> {
    configs.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two layers, preferring values from `primary` over `fallback`.
pub fn merge_settings(
    fallback: Option<BridgeConfig>,
    primary: Option<BridgeConfig>,
) -> Option<BridgeConfig> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) | (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(BridgeConfig {
            xsdb_path: primary.xsdb_path.or(fallback.xsdb_path),
            args: primary.args.or(fallback.args),
            env: match (fallback.env, primary.env) {
                (Some(mut base), Some(overrides)) => {
                    base.extend(overrides);
                    Some(base)
                }
                (base, overrides) => overrides.or(base),
            },
            init_commands: primary.init_commands.or(fallback.init_commands),
            target_filter: primary.target_filter.or(fallback.target_filter),
            shutdown_timeout_ms: primary.shutdown_timeout_ms.or(fallback.shutdown_timeout_ms),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn primary_fields_win() {
        let fallback = BridgeConfig {
            xsdb_path: Some("/opt/xsdb".to_string()),
            shutdown_timeout_ms: Some(500),
            ..BridgeConfig::default()
        };
        let primary = BridgeConfig {
            xsdb_path: Some("/usr/bin/xsdb".to_string()),
            ..BridgeConfig::default()
        };

        let merged = merge_settings(Some(fallback), Some(primary)).unwrap();
        assert_eq!(merged.xsdb_path.as_deref(), Some("/usr/bin/xsdb"));
        assert_eq!(merged.shutdown_timeout_ms, Some(500));
    }

    #[test]
    fn env_maps_merge_key_by_key() {
        let fallback = BridgeConfig {
            env: env(&[("HW_SERVER", "localhost"), ("LANG", "C")]),
            ..BridgeConfig::default()
        };
        let primary = BridgeConfig {
            env: env(&[("LANG", "en_US.UTF-8")]),
            ..BridgeConfig::default()
        };

        let merged = merge_settings(Some(fallback), Some(primary)).unwrap();
        assert_eq!(
            merged.env,
            env(&[("HW_SERVER", "localhost"), ("LANG", "en_US.UTF-8")])
        );
    }

    #[test]
    fn merge_all_skips_missing_layers() {
        let user = BridgeConfig {
            target_filter: Some("name =~ \"*R5*#0\"".to_string()),
            ..BridgeConfig::default()
        };
        let merged = merge_all(&[None, Some(user.clone()), None]).unwrap();
        assert_eq!(merged, user);
        assert_eq!(merge_all(&[None, None]), None);
    }
}
