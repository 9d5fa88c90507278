//! Engine configuration
//!
//! Every tunable the scheduler relies on lives here instead of in constants, so a host
//! can trade frame pacing against throughput.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Config file (.ron or .json)
//! 3. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use blockvm::util::config::EngineConfig;
//!
//! let config = EngineConfig::from_ron_str("(framerate: 60, turbo_mode: true)").unwrap();
//! assert_eq!(config.framerate, 60);
//! assert_eq!(config.max_clones, 300);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Hard cap on reporter nesting. Reporters are evaluated on the host stack, and this
/// depth stays well inside a 2 MiB thread stack in debug builds.
pub const REPORTER_DEPTH_CEILING: usize = 256;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nominal passes per second the host aims for
    pub framerate: u32,
    /// Share of a frame interval the sequencer may spend running scripts
    pub work_fraction: f64,
    /// How long a warp (atomic) frame may run before it is forced to yield
    pub warp_time_ms: u64,
    /// Deepest procedure nesting a thread may reach
    pub max_call_depth: usize,
    /// Deepest reporter nesting inside one block's inputs, capped at
    /// [`REPORTER_DEPTH_CEILING`]
    pub max_reporter_depth: usize,
    /// Clone cap across all sprites
    pub max_clones: usize,
    /// Ignore redraw requests when deciding whether to run another round
    pub turbo_mode: bool,
    /// Run further rounds in one pass while no actor asked for a redraw
    pub repeat_until_redraw: bool,
    /// Outgoing cloud variable updates allowed per second
    pub cloud_updates_per_second: u32,
    /// Stage width in stage units
    pub stage_width: f64,
    /// Stage height in stage units
    pub stage_height: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            framerate: 30,
            work_fraction: 0.75,
            warp_time_ms: 500,
            max_call_depth: 1024,
            max_reporter_depth: 128,
            max_clones: 300,
            turbo_mode: false,
            repeat_until_redraw: false,
            cloud_updates_per_second: 10,
            stage_width: 480.0,
            stage_height: 360.0,
        }
    }
}

impl EngineConfig {
    /// Target duration of one frame
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.framerate.max(1)))
    }

    /// Time budget of one sequencer pass
    pub fn work_time(&self) -> Duration {
        self.frame_interval()
            .mul_f64(self.work_fraction.clamp(0.0, 1.0))
    }

    /// Reporter nesting limit actually enforced
    pub fn reporter_depth(&self) -> usize {
        self.max_reporter_depth.min(REPORTER_DEPTH_CEILING)
    }

    /// Time budget of one warp frame
    pub fn warp_time(&self) -> Duration {
        Duration::from_millis(self.warp_time_ms)
    }

    /// Parse a RON document
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Parse a JSON document
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load from a `.ron` or `.json` file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::from_ron_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    /// Serialize as pretty RON
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Unsupported config format: '{0}' (expected .ron or .json)")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests;
