//! Collaborator capabilities consumed by agents
//!
//! Pathfinding, pooled effects and animation are external systems. Agents
//! receive typed handles to them at construction and call them opaquely.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Locomotion and path following
pub trait Navigator: Send {
    /// Ask for a path to `destination`. Returns false when no path exists
    /// (off mesh, unreachable); callers retry on their next interval.
    fn request_seek(&mut self, destination: Vec3) -> bool;

    /// Current velocity
    fn velocity(&self) -> Vec3;

    /// Distance left to the current path goal
    fn remaining_distance(&self) -> f32;

    /// Halt or resume path following
    fn set_stopped(&mut self, stopped: bool);

    fn is_stopped(&self) -> bool;

    /// Advance along the path from `position` and return the new position
    fn step(&mut self, position: Vec3, dt: f32) -> Vec3;
}

/// Pooled prefab kinds spawned by agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrefabKind {
    /// Physical ragdoll matching an agent kind
    Ragdoll { agent_kind: u8 },
}

/// Handle to a pooled instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectHandle(pub u64);

/// Object pool for effects and ragdolls. Spawning is fire-and-forget.
pub trait EffectPool: Send + Sync {
    /// Take an instance from the pool and place it
    fn spawn(&self, prefab: PrefabKind, position: Vec3, rotation: Quat) -> EffectHandle;

    /// Push a spawned instance. Pools without physics ignore this.
    fn apply_impulse(&self, handle: EffectHandle, impulse: Vec3) {
        let _ = (handle, impulse);
    }

    /// Return an instance to the pool
    fn recycle(&self, handle: EffectHandle);
}

/// Animation changes requested by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationCue {
    Walk(bool),
    Attack(bool),
    /// Animation stops entirely (death)
    Disabled,
}
