//! om-core: Board geometry and configuration shared by the replay pipeline.

pub mod config;
pub mod geometry;

pub use config::{Config, ConfigError};
pub use geometry::{BoardGeometry, GeometryError, DEFAULT_BOARD_SIZE, DEFAULT_N_ACTIONS};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod geometry_tests;
