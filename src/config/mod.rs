use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_HISTORY_CAPACITY, DEFAULT_TEXTURE_FETCH_TIMEOUT_SECS};

/// System set for config loading (other plugins can run after this)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigLoaded;

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_texture_fetch_timeout() -> u64 {
    DEFAULT_TEXTURE_FETCH_TIMEOUT_SECS
}

/// Editor configuration persisted to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfigData {
    /// Maximum number of undo entries kept before the oldest is evicted
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Prefix for relative texture URLs (e.g. the REST host serving `/api/element-texture/`)
    #[serde(default)]
    pub texture_base_url: Option<String>,

    /// Timeout for a single remote texture fetch
    #[serde(default = "default_texture_fetch_timeout")]
    pub texture_fetch_timeout_secs: u64,
}

impl Default for EditorConfigData {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            texture_base_url: None,
            texture_fetch_timeout_secs: DEFAULT_TEXTURE_FETCH_TIMEOUT_SECS,
        }
    }
}

impl EditorConfigData {
    /// History capacity clamped to at least one entry
    pub fn effective_history_capacity(&self) -> usize {
        self.history_capacity.max(1)
    }

    /// Turn a texture URL from a record into something the fetcher can open.
    ///
    /// Absolute URLs and `file://` paths pass through; root-relative paths are
    /// joined onto `texture_base_url` when one is configured.
    pub fn resolve_texture_url(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        match (&self.texture_base_url, url.starts_with('/')) {
            (Some(base), true) => format!("{}{}", base.trim_end_matches('/'), url),
            _ => url.to_string(),
        }
    }
}

/// Runtime configuration resource
#[derive(Resource)]
pub struct EditorConfig {
    /// The persisted configuration data
    pub data: EditorConfigData,
    /// Path to the config file
    pub config_path: PathBuf,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            data: EditorConfigData::default(),
            config_path: crate::paths::config_file(),
        }
    }
}

/// Resource to notify user when config was reset to defaults
#[derive(Resource, Default)]
pub struct ConfigResetNotification {
    /// Whether the notification still has to be shown
    pub show: bool,
    /// The reason for the reset (parse error, read error, etc.)
    pub reason: Option<String>,
}

/// Result of loading config from disk
struct LoadConfigResult {
    data: EditorConfigData,
    /// Error message if config was reset to defaults due to an error
    reset_reason: Option<String>,
}

/// Load configuration from disk
fn load_config(config_path: &Path) -> LoadConfigResult {
    if !config_path.exists() {
        info!("No config file found, using defaults");
        return LoadConfigResult {
            data: EditorConfigData::default(),
            reset_reason: None,
        };
    }

    match std::fs::read_to_string(config_path) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(data) => {
                info!("Loaded config from {:?}", config_path);
                LoadConfigResult {
                    data,
                    reset_reason: None,
                }
            }
            Err(e) => {
                warn!("Failed to parse config file: {}", e);
                LoadConfigResult {
                    data: EditorConfigData::default(),
                    reset_reason: Some(format!("Configuration file was corrupted: {}", e)),
                }
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            LoadConfigResult {
                data: EditorConfigData::default(),
                reset_reason: Some(format!("Could not read configuration file: {}", e)),
            }
        }
    }
}

/// Write the default config so users have a file to edit
fn write_default_config(config: &EditorConfig) {
    match serde_json::to_string_pretty(&config.data) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&config.config_path, json) {
                error!("Failed to save config: {}", e);
            } else {
                info!("Config saved to {:?}", config.config_path);
            }
        }
        Err(e) => {
            error!("Failed to serialize config: {}", e);
        }
    }
}

/// Startup system to load config from disk into the existing resource
fn load_config_system(
    mut config: ResMut<EditorConfig>,
    mut reset_notification: ResMut<ConfigResetNotification>,
) {
    if let Err(e) = crate::paths::ensure_directories() {
        warn!("Failed to create config directories: {}", e);
    }

    let existed = config.config_path.exists();
    let result = load_config(&config.config_path);
    config.data = result.data;

    if let Some(reason) = result.reset_reason {
        reset_notification.show = true;
        reset_notification.reason = Some(reason);
    } else if !existed {
        write_default_config(&config);
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EditorConfig>()
            .init_resource::<ConfigResetNotification>()
            .add_systems(Startup, load_config_system.in_set(ConfigLoaded));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_config_data_default() {
        let data = EditorConfigData::default();
        assert_eq!(data.history_capacity, 50);
        assert!(data.texture_base_url.is_none());
        assert_eq!(data.texture_fetch_timeout_secs, 30);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let data: EditorConfigData = serde_json::from_str("{}").unwrap();
        assert_eq!(data, EditorConfigData::default());

        let data: EditorConfigData = serde_json::from_str(r#"{"history_capacity": 5}"#).unwrap();
        assert_eq!(data.history_capacity, 5);
        assert_eq!(data.texture_fetch_timeout_secs, 30);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let data = EditorConfigData {
            history_capacity: 0,
            ..default()
        };
        assert_eq!(data.effective_history_capacity(), 1);
    }

    #[test]
    fn test_resolve_texture_url() {
        let mut data = EditorConfigData::default();
        assert_eq!(
            data.resolve_texture_url("/api/element-texture/?type=road&face=top"),
            "/api/element-texture/?type=road&face=top"
        );

        data.texture_base_url = Some("https://maps.example.org/".to_string());
        assert_eq!(
            data.resolve_texture_url("/api/element-texture/?type=road&face=top"),
            "https://maps.example.org/api/element-texture/?type=road&face=top"
        );
        assert_eq!(
            data.resolve_texture_url("https://cdn.example.org/brick.png"),
            "https://cdn.example.org/brick.png"
        );
        assert_eq!(data.resolve_texture_url("textures/brick.png"), "textures/brick.png");
    }
}
