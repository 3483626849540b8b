//! Bridge configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Prefix of the per-view method channel name
    pub channel_prefix: String,
    /// Capacity of the session inbox (commands + events)
    pub queue_capacity: usize,
    /// Forward progress events only on multiples of this many seconds (0 = all)
    pub progress_interval_secs: u32,
    /// Let the player fetch unbuffered data when seeking
    pub allow_seek_ahead: bool,
    /// Snap requested playback rates to the player's supported buckets
    pub snap_playback_rate: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_prefix: "tubelink/player_".to_string(),
            queue_capacity: 64,
            progress_interval_secs: 5,
            allow_seek_ahead: true,
            snap_playback_rate: false,
        }
    }
}

impl BridgeConfig {
    /// Forward every progress tick to the host
    pub fn verbose_progress() -> Self {
        Self {
            progress_interval_secs: 0,
            ..Default::default()
        }
    }

    /// Restrict playback rates to what native player SDKs accept
    pub fn native_rates() -> Self {
        Self {
            snap_playback_rate: true,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BridgeConfig = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be > 0".to_string()));
        }
        if self.channel_prefix.is_empty() {
            return Err(Error::InvalidConfig("channel_prefix must not be empty".to_string()));
        }
        Ok(())
    }

    /// Method channel name for a rendered player view
    pub fn channel_name(&self, view_id: i64) -> String {
        format!("{}{}", self.channel_prefix, view_id)
    }
}
