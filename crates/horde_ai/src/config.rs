//! Agent and flock tuning

use serde::{Deserialize, Serialize};

/// Smallest attack cycle length accepted
const MIN_RECOVER_TIME: f32 = 0.01;

/// Per-agent behaviour tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Distance to the target's closest point at which an attack starts
    pub attack_enter_radius: f32,
    /// Distance at which an attack is abandoned (>= enter radius)
    pub attack_exit_radius: f32,
    /// Time into an attack cycle at which the hit detector is armed
    pub attack_arm_time: f32,
    /// Length of one attack cycle
    pub attack_recover_time: f32,
    /// Interval between direct path requests while chasing
    pub nav_repath_interval: f32,
    /// Impulse applied to the ragdoll on death
    pub ragdoll_impulse: f32,
    /// Locomotion speed in units per second
    pub move_speed: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            attack_enter_radius: 1.0,
            attack_exit_radius: 1.25,
            attack_arm_time: 0.0,
            attack_recover_time: 4.6,
            nav_repath_interval: 0.5,
            ragdoll_impulse: 100.0,
            move_speed: 3.5,
        }
    }
}

impl AgentConfig {
    /// Repair values that would break the state machine
    pub fn normalized(mut self) -> Self {
        if self.attack_exit_radius < self.attack_enter_radius {
            log::warn!(
                "attack exit radius {} below enter radius {}, raising it",
                self.attack_exit_radius,
                self.attack_enter_radius
            );
            self.attack_exit_radius = self.attack_enter_radius;
        }
        if self.attack_recover_time < MIN_RECOVER_TIME {
            log::warn!("attack recover time {} too small", self.attack_recover_time);
            self.attack_recover_time = MIN_RECOVER_TIME;
        }
        self.attack_arm_time = self.attack_arm_time.clamp(0.0, self.attack_recover_time);
        self.nav_repath_interval = self.nav_repath_interval.max(0.0);
        self
    }
}

/// Flocking tuning shared by the coordinator and every member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    /// Seconds between flock batches
    pub step: f32,
    /// Neighbours closer than this influence each other
    pub radius_of_influence: f32,
    /// Neighbours closer than this push each other apart
    pub avoid_radius: f32,

    pub cohesion_weight: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub target_weight: f32,
    /// Cosine below which the blend is pulled back toward the target
    pub max_deviation: f32,
    /// Distance ahead of the agent used as the path destination
    pub look_ahead: f32,

    /// Distance at which the near-target weighting is fully applied
    pub near_distance: f32,
    /// Distance beyond which the plain weights apply
    pub far_distance: f32,
    /// Separation weight multiplier at `near_distance`
    pub near_separation_scale: f32,
    /// Target weight multiplier at `near_distance`
    pub near_target_boost: f32,
    /// Slerp factor from the previous steering direction to the new one
    pub turn_blend: f32,
    /// Destination changes shorter than this are not sent to navigation
    pub retarget_distance: f32,

    pub stuck_speed: f32,
    pub stuck_remaining_distance: f32,
    pub stuck_target_distance: f32,
    pub stuck_duration: f32,

    /// Use the thread-pool kernel
    pub parallel: bool,
    /// Worker threads for the kernel, 0 lets rayon decide
    pub worker_threads: usize,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            step: 0.25,
            radius_of_influence: 6.0,
            avoid_radius: 1.5,
            cohesion_weight: 1.0,
            separation_weight: 1.0,
            alignment_weight: 1.0,
            target_weight: 1.0,
            max_deviation: 0.2,
            look_ahead: 1.0,
            near_distance: 3.0,
            far_distance: 20.0,
            near_separation_scale: 0.25,
            near_target_boost: 2.0,
            turn_blend: 0.5,
            retarget_distance: 0.25,
            stuck_speed: 0.1,
            stuck_remaining_distance: 0.5,
            stuck_target_distance: 2.0,
            stuck_duration: 1.5,
            parallel: true,
            worker_threads: 0,
        }
    }
}

impl FlockConfig {
    /// Clamp values into their usable ranges
    pub fn normalized(mut self) -> Self {
        self.step = self.step.max(0.01);
        self.max_deviation = self.max_deviation.clamp(0.0, 0.9);
        self.turn_blend = self.turn_blend.clamp(0.0, 1.0);
        self.avoid_radius = self.avoid_radius.clamp(0.0, self.radius_of_influence.max(0.0));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_hysteresis_repaired() {
        let config = AgentConfig {
            attack_enter_radius: 2.0,
            attack_exit_radius: 1.0,
            attack_arm_time: 9.0,
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.attack_exit_radius, 2.0);
        assert_eq!(config.attack_arm_time, config.attack_recover_time);
    }

    #[test]
    fn test_flock_config_clamps() {
        let config = FlockConfig {
            max_deviation: 1.5,
            avoid_radius: 10.0,
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.max_deviation, 0.9);
        assert_eq!(config.avoid_radius, config.radius_of_influence);
    }
}
