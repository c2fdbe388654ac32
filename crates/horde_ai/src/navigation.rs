//! Straight-line locomotion
//!
//! `DirectNavigator` walks toward its destination without a navigation mesh.
//! It is the locomotion used by the headless simulation and tests; a
//! mesh-backed pathfinder plugs in through the same `Navigator` trait.

use crate::capability::Navigator;
use glam::Vec3;
use horde_core::Aabb;

/// Navigator that moves in a straight line toward the destination
#[derive(Debug, Clone)]
pub struct DirectNavigator {
    /// Movement speed
    pub speed: f32,
    /// Arrival threshold
    pub stopping_distance: f32,
    destination: Option<Vec3>,
    velocity: Vec3,
    position: Vec3,
    stopped: bool,
    /// Horizontal area seeks must land in
    walkable: Option<Aabb>,
}

impl DirectNavigator {
    /// Create a new navigator
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            stopping_distance: 0.05,
            destination: None,
            velocity: Vec3::ZERO,
            position: Vec3::ZERO,
            stopped: false,
            walkable: None,
        }
    }

    /// Refuse destinations outside `area` (checked on X and Z)
    pub fn with_walkable(mut self, area: Aabb) -> Self {
        self.walkable = Some(area);
        self
    }

    /// Current destination
    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    fn is_walkable(&self, point: Vec3) -> bool {
        match &self.walkable {
            Some(area) => {
                point.x >= area.min.x
                    && point.x <= area.max.x
                    && point.z >= area.min.z
                    && point.z <= area.max.z
            }
            None => true,
        }
    }
}

impl Navigator for DirectNavigator {
    fn request_seek(&mut self, destination: Vec3) -> bool {
        if !destination.is_finite() || !self.is_walkable(destination) {
            return false;
        }
        self.destination = Some(destination);
        true
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn remaining_distance(&self) -> f32 {
        self.destination
            .map_or(0.0, |destination| destination.distance(self.position))
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
        if stopped {
            self.velocity = Vec3::ZERO;
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn step(&mut self, position: Vec3, dt: f32) -> Vec3 {
        self.position = position;
        let destination = match self.destination {
            Some(d) if !self.stopped && dt > 0.0 => d,
            _ => {
                self.velocity = Vec3::ZERO;
                return position;
            }
        };

        let offset = destination - position;
        let distance = offset.length();
        if distance <= self.stopping_distance {
            self.velocity = Vec3::ZERO;
            return position;
        }

        let direction = offset / distance;
        let travel = (self.speed * dt).min(distance);
        self.velocity = direction * self.speed;
        self.position = position + direction * travel;
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_toward_destination() {
        let mut nav = DirectNavigator::new(2.0);
        assert!(nav.request_seek(Vec3::new(10.0, 0.0, 0.0)));

        let pos = nav.step(Vec3::ZERO, 0.5);
        assert_eq!(pos, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(nav.velocity(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(nav.remaining_distance(), 9.0);
    }

    #[test]
    fn test_does_not_overshoot() {
        let mut nav = DirectNavigator::new(100.0);
        nav.request_seek(Vec3::new(1.0, 0.0, 0.0));
        let pos = nav.step(Vec3::ZERO, 1.0);
        assert_eq!(pos, Vec3::new(1.0, 0.0, 0.0));

        let pos = nav.step(pos, 1.0);
        assert_eq!(pos, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(nav.velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_stopped_and_unwalkable() {
        let area = Aabb::new(Vec3::splat(-5.0), Vec3::splat(5.0));
        let mut nav = DirectNavigator::new(1.0).with_walkable(area);

        assert!(!nav.request_seek(Vec3::new(50.0, 0.0, 0.0)));
        assert!(!nav.request_seek(Vec3::new(f32::NAN, 0.0, 0.0)));
        assert!(nav.request_seek(Vec3::new(4.0, 100.0, 0.0)));

        nav.set_stopped(true);
        assert_eq!(nav.step(Vec3::ZERO, 1.0), Vec3::ZERO);
        assert!(nav.is_stopped());
    }
}
