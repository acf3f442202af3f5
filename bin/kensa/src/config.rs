use std::path::Path;

use kensa::HttpConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "kensa.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between two runs when the manifest has no `MPD@minimumUpdatePeriod`
    pub fallback_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            fallback_interval_secs: 2,
        }
    }
}

impl Config {
    /// Read `file`. The default file is optional, an explicitly requested one is not.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let (file, required) = match file {
            Some(file) => (file, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !file.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(file)?;
        let config = toml::from_str(&data)?;
        tracing::debug!(file = %file.display(), "Loaded configuration");
        Ok(config)
    }
}
