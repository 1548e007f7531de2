// Persisted player settings

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tunestream_core::{AudioError, Result};

const DEFAULT_VOLUME: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub volume: u8,
}

/// On-disk shape, wide enough to hold out-of-range values
#[derive(Debug, Default, Deserialize)]
struct StoredSettings {
    volume: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults; values
    /// outside their range are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let stored: StoredSettings = toml::from_str(&text)?;
        let mut settings = Self::default();
        match stored.volume {
            Some(volume) if (0..=100).contains(&volume) => {
                settings.volume = volume as u8;
                log::info!("Loaded saved volume: {}%", settings.volume);
            }
            Some(volume) => log::warn!("Ignoring saved volume out of range: {}", volume),
            None => {}
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string(self)
            .map_err(|e| AudioError::ConfigError(format!("cannot encode settings: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, text)?;
        log::debug!("Saved settings to {}", path.display());
        Ok(())
    }
}
