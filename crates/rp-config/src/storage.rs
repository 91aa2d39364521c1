//! Configuration persistence

use crate::types::BotConfig;
use rp_types::{AppError, AppResult};
use std::path::Path;
use tracing::{debug, info};

/// Load configuration from a JSON file.
///
/// A missing file is not an error: the defaults are returned so a fresh
/// checkout works without any setup.
pub fn load_config(path: &Path) -> AppResult<BotConfig> {
    if !path.exists() {
        info!(
            "no configuration at {}, using defaults",
            path.display()
        );
        return Ok(BotConfig::default());
    }

    let raw = std::fs::read_to_string(path)?;
    let config: BotConfig = serde_json::from_str(&raw)
        .map_err(|e| AppError::Config(format!("invalid configuration {}: {}", path.display(), e)))?;

    debug!("loaded configuration from {}", path.display());
    Ok(config)
}

/// Save configuration to a JSON file, creating parent directories.
pub fn save_config(path: &Path, config: &BotConfig) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let raw = serde_json::to_string_pretty(config)?;
    std::fs::write(path, raw)?;

    debug!("saved configuration to {}", path.display());
    Ok(())
}
