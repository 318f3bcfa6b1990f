/// Helper utilities for the odoobup CLI

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::utils::{AppConfig, DATA_DIR_ENV, DATA_DIR_NAME};

/// Get the directory holding the profile store
///
/// Resolution order: `ODOOBUP_HOME`, then `data_dir` from the user config,
/// then `~/.odoobup`.
pub fn get_data_dir(config: &AppConfig) -> Result<PathBuf> {
    // 1. Environment override
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    // 2. Saved configuration
    if let Some(dir) = &config.data_dir {
        return Ok(PathBuf::from(dir));
    }

    // 3. Default under the home directory
    let home = dirs::home_dir().context("Failed to locate home directory")?;
    Ok(home.join(DATA_DIR_NAME))
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
