//! Agent behavioural states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavioural state of a swarm agent
///
/// Chase is the flocking state: an agent is a flock member exactly while it
/// chases. Death is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Moving toward the target with the flock
    Chase,
    /// In reach of the target, swinging
    Attack,
    /// Dead, waiting to be recycled
    Death,
}

impl AgentState {
    /// Whether agents in this state belong to the flock
    pub fn is_flocking(self) -> bool {
        matches!(self, Self::Chase)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Death)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chase => write!(f, "chase"),
            Self::Attack => write!(f, "attack"),
            Self::Death => write!(f, "death"),
        }
    }
}
