//! # horde_core - Core Types
//!
//! Shared building blocks for the swarm simulation:
//! - Generational entity identifiers
//! - Axis-aligned bounds with closest-point queries
//! - Agent poses (position + yaw rotation)
//! - Fixed-step accumulators and a virtual clock

pub mod bounds;
pub mod id;
pub mod pose;
pub mod time;

/// Number of visual agent kinds the simulation knows about.
pub const MAX_AGENT_KINDS: u8 = 3;

pub mod prelude {
    pub use crate::bounds::Aabb;
    pub use crate::id::{EntityId, IdAllocator};
    pub use crate::pose::{slerp_direction, Pose};
    pub use crate::time::{FixedStep, SimClock};
    pub use crate::MAX_AGENT_KINDS;
}

pub use prelude::*;
