//! Resolving settings from every layer.
//!
//! Loading never fails: unreadable or malformed layers are skipped and
//! reported as [`SettingsEvent`]s for the caller to log.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::defaults::default_settings;
use super::settings::{BridgeConfig, BridgeSettings};
use super::user::load_user_config;
use super::merge_all;

/// File name looked up in the project directory.
pub const PROJECT_CONFIG_FILE: &str = "xsdb-bridge.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEventKind {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsEvent {
    pub kind: SettingsEventKind,
    pub message: String,
}

impl SettingsEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Warning,
            message: message.into(),
        }
    }

    /// Forward to the `log` facade.
    pub fn log(&self) {
        match self.kind {
            SettingsEventKind::Info => info!(target: "xsdb_bridge::config", "{}", self.message),
            SettingsEventKind::Warning => warn!(target: "xsdb_bridge::config", "{}", self.message),
        }
    }
}

#[derive(Debug)]
pub struct SettingsLoadOutcome {
    pub settings: BridgeSettings,
    pub events: Vec<SettingsEvent>,
}

/// Merge defaults < user config < project config < `overrides`.
///
/// The project layer is `explicit_config` when given, otherwise
/// `project_root/xsdb-bridge.toml` if it exists. An explicit file that is
/// missing is reported as a warning.
pub fn load_settings(
    project_root: Option<&Path>,
    explicit_config: Option<&Path>,
    overrides: Option<BridgeConfig>,
) -> SettingsLoadOutcome {
    let mut events = Vec::new();

    let defaults = Some(default_settings());
    let user_config = load_user_config_with_events(&mut events);
    let project_config = match explicit_config {
        Some(path) => load_toml_settings(path, true, &mut events),
        None => project_root.and_then(|root| {
            load_toml_settings(&root.join(PROJECT_CONFIG_FILE), false, &mut events)
        }),
    };

    let merged = merge_all(&[defaults, user_config, project_config, overrides]);
    let settings = merged.map(BridgeSettings::from).unwrap_or_default();

    SettingsLoadOutcome { settings, events }
}

fn load_user_config_with_events(events: &mut Vec<SettingsEvent>) -> Option<BridgeConfig> {
    match load_user_config() {
        Ok(Some(config)) => {
            events.push(SettingsEvent::info("Loaded user config"));
            Some(config)
        }
        Ok(None) => None,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to load user config: {}",
                err
            )));
            None
        }
    }
}

fn load_toml_settings(
    path: &Path,
    required: bool,
    events: &mut Vec<SettingsEvent>,
) -> Option<BridgeConfig> {
    if !path.exists() {
        if required {
            events.push(SettingsEvent::warning(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return None;
    }

    events.push(SettingsEvent::info(format!(
        "Found config file: {}",
        path.display()
    )));

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to read {}: {}",
                display_name(path),
                err
            )));
            return None;
        }
    };
    match toml::from_str::<BridgeConfig>(&contents) {
        Ok(config) => {
            events.push(SettingsEvent::info(format!(
                "Successfully loaded {}",
                display_name(path)
            )));
            Some(config)
        }
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to parse {}: {}",
                display_name(path),
                err
            )));
            None
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
