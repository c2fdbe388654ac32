//! Horde Sim - World Wiring and Harness
//!
//! This crate assembles the swarm simulation from its parts and runs it.
//!
//! # Features
//!
//! - `SimWorld`: explicit world object owning agents, flock, waves and render grouping
//! - Campaigns of levels played back to back
//! - TOML configuration with environment overrides
//! - Bounded ragdoll pool
//!
//! # Example
//!
//! ```ignore
//! use horde_sim::prelude::*;
//!
//! let mut world = SimWorld::new(SimConfig::load());
//! world.start_campaign()?;
//! loop {
//!     world.tick(1.0 / 60.0);
//!     for batch in world.render_batches() { /* draw */ }
//! }
//! ```

pub mod config;
pub mod effects;
pub mod world;

pub mod prelude {
    pub use crate::config::{
        ArenaConfig, CombatConfig, ConfigError, HarnessConfig, Result, SimConfig, SpawnPointConfig,
    };
    pub use crate::effects::{Ragdoll, RagdollPool};
    pub use crate::world::{SimEvent, SimStats, SimWorld};
}

pub use prelude::*;
