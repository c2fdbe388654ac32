//! Horde Waves - Wave and Spawn Orchestration
//!
//! This crate paces population growth over a level.
//!
//! # Features
//!
//! - Spawn groups, waves and levels as validated serde data
//! - Parallel and sequential group spawning
//! - Deterministic distribution of each batch across spawn directions
//! - Level runner with preparation delay, inter-wave pauses and statistics
//! - Spawn-area position sampling
//!
//! # Example
//!
//! ```ignore
//! use horde_waves::prelude::*;
//!
//! let mut runner = LevelRunner::new(WavePolicy::default());
//! runner.start_level(level, SpawnDirections::all())?;
//! runner.tick(dt, &mut spawner);
//! for event in runner.drain_events() { /* ... */ }
//! ```

pub mod config;
pub mod direction;
pub mod error;
pub mod events;
pub mod level;
pub mod spawn_area;
pub mod wave;

pub mod prelude {
    pub use crate::config::{LevelConfig, SpawnGroupConfig, WaveConfig};
    pub use crate::direction::{distribute, SpawnDirection, SpawnDirections};
    pub use crate::error::{Result, WaveError};
    pub use crate::events::{WaveEvent, WaveStatistics};
    pub use crate::level::{EntitySpawner, LevelRunner, WavePolicy, WaveSystemState};
    pub use crate::spawn_area::{SpawnConfig, SpawnPlacer};
    pub use crate::wave::{GroupState, WaveState, WaveStatus};
}

pub use prelude::*;
