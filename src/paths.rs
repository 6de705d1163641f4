//! Centralized path resolution for platform-appropriate user data directories.
//!
//! In development mode (cargo run), paths resolve to local directories.
//! In installed mode, paths resolve to platform-specific locations:
//! - Windows: `%APPDATA%\Mapforge\`
//! - macOS: `~/Library/Application Support/Mapforge/`
//! - Linux: `~/.config/mapforge/` (config), `~/.local/share/mapforge/` (data)

use std::path::PathBuf;

/// Returns true when running in development mode (cargo run).
///
/// Detection methods:
/// - `CARGO` env var is set (cargo run sets this)
/// - Debug assertions enabled (debug builds)
pub fn is_dev_mode() -> bool {
    std::env::var("CARGO").is_ok() || cfg!(debug_assertions)
}

/// Platform-appropriate config directory.
///
/// - Dev mode: current directory
/// - Linux: `~/.config/mapforge/`
/// - Windows/macOS: same as data_dir
pub fn config_dir() -> Option<PathBuf> {
    if is_dev_mode() {
        return Some(PathBuf::from("."));
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir().map(|p| p.join("mapforge"))
    }

    #[cfg(not(target_os = "linux"))]
    {
        data_dir()
    }
}

/// Platform-appropriate data directory.
pub fn data_dir() -> Option<PathBuf> {
    if is_dev_mode() {
        return Some(PathBuf::from("."));
    }

    dirs::data_dir().map(|p| p.join("mapforge"))
}

/// Path to the config file.
///
/// - Dev mode: `./config.json`
/// - Installed: `{config_dir}/config.json`
pub fn config_file() -> PathBuf {
    config_dir()
        .map(|p| p.join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Path to the logs directory.
///
/// - Dev mode: `./logs/`
/// - Installed: `{data_dir}/logs/`
pub fn logs_dir() -> PathBuf {
    data_dir()
        .map(|p| p.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Ensure the config and data directories exist.
pub fn ensure_directories() -> std::io::Result<()> {
    if is_dev_mode() {
        return Ok(());
    }

    if let Some(config) = config_dir() {
        std::fs::create_dir_all(&config)?;
    }
    if let Some(data) = data_dir() {
        std::fs::create_dir_all(&data)?;
        std::fs::create_dir_all(data.join("logs"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_has_json_extension() {
        let path = config_file();
        assert!(path.to_string_lossy().ends_with("config.json"));
    }

    #[test]
    fn test_dev_mode_returns_local_paths() {
        // In tests, is_dev_mode() should be true due to debug_assertions
        assert!(is_dev_mode());
        assert_eq!(config_dir(), Some(PathBuf::from(".")));
        assert_eq!(logs_dir(), PathBuf::from("./logs"));
    }
}
