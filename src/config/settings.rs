use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::defaults::{
    DEFAULT_SHUTDOWN_TIMEOUT_MS, default_args, default_init_commands, default_xsdb_path,
};

/// One configuration layer as written in a TOML file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub xsdb_path: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, String>>,
    /// Commands run once the banner is done; failures are logged, not fatal
    pub init_commands: Option<Vec<String>>,
    /// Tcl filter passed to `targets -filter`
    pub target_filter: Option<String>,
    pub shutdown_timeout_ms: Option<u64>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeSettings {
    pub xsdb_path: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub init_commands: Vec<String>,
    pub target_filter: Option<String>,
    pub shutdown_timeout_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from(BridgeConfig::default())
    }
}

impl From<BridgeConfig> for BridgeSettings {
    fn from(config: BridgeConfig) -> Self {
        Self {
            xsdb_path: config.xsdb_path.unwrap_or_else(default_xsdb_path),
            args: config.args.unwrap_or_else(default_args),
            env: config.env.unwrap_or_default(),
            init_commands: config.init_commands.unwrap_or_else(default_init_commands),
            target_filter: config.target_filter,
            shutdown_timeout_ms: config
                .shutdown_timeout_ms
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_MS),
        }
    }
}
