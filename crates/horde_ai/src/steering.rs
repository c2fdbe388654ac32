//! Flock steering
//!
//! Turns the neighbour influences computed by the flock kernel into a path
//! destination for one agent. Steering happens on the ground plane; vertical
//! components are dropped.

use crate::config::FlockConfig;
use glam::Vec3;
use horde_core::slerp_direction;
use serde::{Deserialize, Serialize};

/// Neighbour influences written by the flock coordinator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlockInputs {
    /// Average neighbour position relative to the agent
    pub cohesion: Vec3,
    /// Push away from neighbours inside the avoid radius
    pub separation: Vec3,
    /// Average neighbour velocity
    pub alignment: Vec3,
    pub neighbors: u32,
}

/// Output of one steering evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringDecision {
    /// Unit steering direction
    pub direction: Vec3,
    /// New path destination, `None` when the change is too small to send
    pub destination: Option<Vec3>,
}

/// Steering state carried between evaluations
#[derive(Debug, Clone, Copy, Default)]
pub struct SteeringMemory {
    last_direction: Option<Vec3>,
    last_destination: Option<Vec3>,
}

impl SteeringMemory {
    /// Forget previous steering (after a hard re-seek or state change)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last_direction(&self) -> Option<Vec3> {
        self.last_direction
    }
}

#[inline]
fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// 0 at or beyond `far_distance`, 1 at or inside `near_distance`
fn proximity(distance: f32, config: &FlockConfig) -> f32 {
    let span = config.far_distance - config.near_distance;
    if span <= f32::EPSILON {
        return if distance <= config.near_distance { 1.0 } else { 0.0 };
    }
    ((config.far_distance - distance) / span).clamp(0.0, 1.0)
}

/// Blend flock influences with the direct heading to `target`.
pub fn steer(
    position: Vec3,
    target: Vec3,
    inputs: &FlockInputs,
    config: &FlockConfig,
    memory: &mut SteeringMemory,
) -> SteeringDecision {
    let offset = flatten(target - position);
    let to_target = offset.normalize_or_zero();
    let near = proximity(offset.length(), config);

    let separation_weight =
        config.separation_weight * (1.0 + (config.near_separation_scale - 1.0) * near);
    let target_weight = config.target_weight * (1.0 + (config.near_target_boost - 1.0) * near);

    let blended = flatten(
        inputs.cohesion * config.cohesion_weight
            + inputs.separation * separation_weight
            + inputs.alignment * config.alignment_weight
            + to_target * target_weight,
    );

    let mut direction = blended.normalize_or_zero();
    if direction == Vec3::ZERO {
        direction = to_target;
    } else if to_target != Vec3::ZERO && to_target.dot(direction) <= config.max_deviation {
        direction = (direction + to_target).normalize_or_zero();
        if direction == Vec3::ZERO {
            direction = to_target;
        }
    }

    if let Some(previous) = memory.last_direction {
        let smoothed = flatten(slerp_direction(previous, direction, config.turn_blend)).normalize_or_zero();
        if smoothed != Vec3::ZERO {
            direction = smoothed;
        }
    }
    if direction != Vec3::ZERO {
        memory.last_direction = Some(direction);
    }

    let candidate = position + direction * config.look_ahead;
    let destination = match memory.last_destination {
        Some(last) if last.distance(candidate) < config.retarget_distance => None,
        _ => {
            memory.last_destination = Some(candidate);
            Some(candidate)
        }
    };

    SteeringDecision {
        direction,
        destination,
    }
}

/// Detects agents wedged against each other or geometry
#[derive(Debug, Clone, Copy, Default)]
pub struct StuckDetector {
    timer: f32,
}

impl StuckDetector {
    /// Accumulate stuck time. Returns true when a hard re-seek is due.
    pub fn update(
        &mut self,
        dt: f32,
        speed: f32,
        remaining_distance: f32,
        target_distance: f32,
        config: &FlockConfig,
    ) -> bool {
        let stuck = speed < config.stuck_speed
            && remaining_distance < config.stuck_remaining_distance
            && target_distance > config.stuck_target_distance;
        if !stuck {
            self.timer = 0.0;
            return false;
        }

        self.timer += dt;
        if self.timer >= config.stuck_duration {
            self.timer = 0.0;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.timer = 0.0;
    }

    pub fn elapsed(&self) -> f32 {
        self.timer
    }
}
