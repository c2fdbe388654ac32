//! Horde AI - Agent Behaviour and Flocking
//!
//! This crate drives individual swarm agents and the flock they move in.
//!
//! # Features
//!
//! - Agent state machine (Chase, Attack, Death)
//! - Flock coordinator with deferred membership changes
//! - Parallel neighbour-influence kernel with a serial fallback
//! - Distance-aware flock steering and stuck detection
//! - Collaborator traits for navigation, effects and targets
//!
//! # Example
//!
//! ```ignore
//! use horde_ai::prelude::*;
//!
//! let mut flock = FlockCoordinator::new(&FlockConfig::default());
//! flock.register(agent.id());
//! flock.tick(dt, &mut agents);
//! agent.tick(&TickContext { dt, now });
//! ```

pub mod agent;
pub mod capability;
pub mod config;
pub mod error;
pub mod flock;
pub mod navigation;
pub mod state;
pub mod steering;
pub mod target;

pub mod prelude {
    pub use crate::agent::{Agent, AgentCapabilities, AgentEvent, AgentSpawn, TickContext};
    pub use crate::capability::{AnimationCue, EffectHandle, EffectPool, Navigator, PrefabKind};
    pub use crate::config::{AgentConfig, FlockConfig};
    pub use crate::error::{FlockError, Result};
    pub use crate::flock::{
        DistributionReport, FlockBatch, FlockCoordinator, FlockHost, FlockKernel, FlockSample,
        NeighborParams,
    };
    pub use crate::navigation::DirectNavigator;
    pub use crate::state::AgentState;
    pub use crate::steering::{FlockInputs, SteeringDecision, SteeringMemory, StuckDetector};
    pub use crate::target::{MovingTarget, StaticTarget, TargetHandle, TargetProvider, WeakTarget};
}

pub use prelude::*;
