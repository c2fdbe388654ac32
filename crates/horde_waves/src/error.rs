//! Error types for wave configuration and orchestration

use crate::direction::SpawnDirection;
use thiserror::Error;

/// Wave system errors
#[derive(Debug, Error)]
pub enum WaveError {
    /// A wave has no spawn groups
    #[error("Wave has no spawn groups")]
    NoSpawnGroups,

    /// A spawn group is misconfigured
    #[error("Spawn group {index} is invalid: {reason}")]
    InvalidGroup { index: usize, reason: String },

    /// A level has no spawn directions
    #[error("Level has no spawn directions")]
    NoDirections,

    /// A level has no waves
    #[error("Level has no waves")]
    NoWaves,

    /// Negative or non-finite pause between waves
    #[error("Interval between waves must be a non-negative number, got {0}")]
    InvalidInterval(f32),

    /// A wave inside a level is invalid
    #[error("Wave {index} is invalid: {source}")]
    InvalidWave {
        index: usize,
        #[source]
        source: Box<WaveError>,
    },

    /// A configured direction has no spawn area
    #[error("No spawn point for direction {0}")]
    MissingSpawnPoint(SpawnDirection),

    /// A spawn area whose bounds or span are not finite
    #[error("Spawn area for direction {0} must have finite bounds")]
    InvalidSpawnArea(SpawnDirection),

    /// A level is already running
    #[error("A level is already active")]
    LevelActive,
}

/// Result type for wave operations
pub type Result<T> = std::result::Result<T, WaveError>;
