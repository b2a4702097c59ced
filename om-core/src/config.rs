//! Unified configuration schema for the omega replay pipeline.
//!
//! The trainer and the self-play workers read the same YAML file; the
//! `board` section must agree between them or shard files will not decode.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::geometry::{BoardGeometry, GeometryError};

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid board geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Board and action-space shape shared with the producers.
    #[serde(default)]
    pub board: BoardGeometry,
    /// Shard ingestion and retention window.
    pub replay: ReplayConfig,
    /// Minibatch sampling settings.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Per-generation preprocessing toggles.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

/// Replay ingestion and retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplayConfig {
    /// Directory the self-play workers write `{generation}_{shard}.dat` into.
    pub data_dir: PathBuf,
    /// Maximum number of resident generations.
    #[serde(default = "default_window_size")]
    pub window_size: u32,
    /// Expected shard count per generation (one per self-play worker).
    pub n_thread: u32,
    /// Sleep between shard-completion polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting for a generation after this long.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
    /// First generation index the trainer expects.
    #[serde(default)]
    pub start_generation: u64,
    /// Optional NDJSON file receiving merge/load/evict events.
    #[serde(default)]
    pub event_log: Option<PathBuf>,
}

fn default_window_size() -> u32 {
    20
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_wait_ms() -> u64 {
    3_600_000
}

impl ReplayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// Minibatch sampling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingConfig {
    /// Samples per minibatch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Minibatches drawn between two `advance()` calls.
    #[serde(default = "default_n_update")]
    pub n_update: u32,
    /// Multiplier applied to every resident weight when a generation arrives.
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,
    /// Fraction of the value target taken from the search value `Q`
    /// (the rest comes from the game result).
    #[serde(default)]
    pub q_frac: f32,
    /// Seed for the minibatch RNG.
    #[serde(default)]
    pub seed: u64,
}

fn default_batch_size() -> u32 {
    512
}

fn default_n_update() -> u32 {
    1_000
}

fn default_decay_factor() -> f64 {
    0.9
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            n_update: default_n_update(),
            decay_factor: default_decay_factor(),
            q_frac: 0.0,
            seed: 0,
        }
    }
}

/// Per-generation preprocessing toggles.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreprocessConfig {
    /// Expand every sample into its 8 dihedral variants.
    #[serde(default = "default_true")]
    pub augment: bool,
    /// Merge samples that are the same position up to symmetry.
    #[serde(default = "default_true")]
    pub dedup: bool,
    /// Persist decoded generations next to their `.dat` file.
    #[serde(default = "default_true")]
    pub cache: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            augment: true,
            dedup: true,
            cache: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.board.check()?;

        let r = &self.replay;
        if r.window_size < 1 {
            return Err(invalid("replay.window_size must be >= 1"));
        }
        if r.n_thread < 1 {
            return Err(invalid("replay.n_thread must be >= 1"));
        }
        if r.poll_interval_ms < 1 {
            return Err(invalid("replay.poll_interval_ms must be >= 1"));
        }

        let t = &self.training;
        if t.batch_size < 1 {
            return Err(invalid("training.batch_size must be >= 1"));
        }
        if t.n_update < 1 {
            return Err(invalid("training.n_update must be >= 1"));
        }
        if !(t.decay_factor.is_finite() && t.decay_factor > 0.0 && t.decay_factor < 1.0) {
            return Err(invalid("training.decay_factor must be in (0,1)"));
        }
        if !(0.0..=1.0).contains(&t.q_frac) {
            return Err(invalid("training.q_frac must be in [0,1]"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}
