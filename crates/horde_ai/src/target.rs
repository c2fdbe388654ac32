//! Pursuit targets
//!
//! Agents hold targets through weak handles. A handle that no longer
//! upgrades is a destroyed target and is treated as absent.

use glam::Vec3;
use horde_combat::{SharedDamageable, WeakDamageable};
use horde_core::{Aabb, EntityId};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// Position provider an agent can pursue and attack
pub trait TargetProvider: Send + Sync {
    fn id(&self) -> EntityId;

    /// Reference position used for path requests
    fn position(&self) -> Vec3;

    /// Closest point on the target's body to `from`
    fn closest_point(&self, from: Vec3) -> Vec3 {
        let _ = from;
        self.position()
    }

    fn is_dead(&self) -> bool {
        false
    }

    /// Damage capability hit by melee attacks, if any
    fn damageable(&self) -> Option<SharedDamageable> {
        None
    }
}

/// Shared handle to a target
pub type TargetHandle = Arc<dyn TargetProvider>;

/// Non-owning handle to a target
pub type WeakTarget = Weak<dyn TargetProvider>;

/// A fixed target with a box-shaped body, such as the defended facility
#[derive(Debug, Clone)]
pub struct StaticTarget {
    id: EntityId,
    bounds: Aabb,
}

impl StaticTarget {
    pub fn new(id: EntityId, bounds: Aabb) -> Self {
        Self { id, bounds }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

impl TargetProvider for StaticTarget {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.bounds.center()
    }

    fn closest_point(&self, from: Vec3) -> Vec3 {
        self.bounds.closest_point(from)
    }
}

/// A target that moves, such as the player
pub struct MovingTarget {
    id: EntityId,
    position: RwLock<Vec3>,
    half_extents: Vec3,
    health: Option<WeakDamageable>,
}

impl MovingTarget {
    pub fn new(id: EntityId, position: Vec3) -> Self {
        Self {
            id,
            position: RwLock::new(position),
            half_extents: Vec3::ZERO,
            health: None,
        }
    }

    /// Give the target a box-shaped body
    pub fn with_half_extents(mut self, half_extents: Vec3) -> Self {
        self.half_extents = half_extents;
        self
    }

    /// Attach a health capability. The target counts as dead once it dies or is dropped.
    pub fn with_health(mut self, health: &SharedDamageable) -> Self {
        self.health = Some(Arc::downgrade(health));
        self
    }

    pub fn set_position(&self, position: Vec3) {
        *self.position.write() = position;
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(*self.position.read(), self.half_extents)
    }
}

impl TargetProvider for MovingTarget {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec3 {
        *self.position.read()
    }

    fn closest_point(&self, from: Vec3) -> Vec3 {
        self.bounds().closest_point(from)
    }

    fn is_dead(&self) -> bool {
        match &self.health {
            Some(weak) => weak.upgrade().map_or(true, |h| h.lock().is_dead()),
            None => false,
        }
    }

    fn damageable(&self) -> Option<SharedDamageable> {
        self.health.as_ref().and_then(Weak::upgrade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_combat::{DamageInfo, Health};
    use parking_lot::Mutex;

    #[test]
    fn test_static_target_closest_point() {
        let facility = StaticTarget::new(
            EntityId::new(0, 0),
            Aabb::new(Vec3::new(-2.0, 0.0, -2.0), Vec3::new(2.0, 3.0, 2.0)),
        );
        assert_eq!(facility.position(), Vec3::new(0.0, 1.5, 0.0));
        assert_eq!(
            facility.closest_point(Vec3::new(10.0, 0.0, 0.0)),
            Vec3::new(2.0, 0.0, 0.0)
        );
        assert!(!facility.is_dead());
        assert!(facility.damageable().is_none());
    }

    #[test]
    fn test_moving_target_follows_health() {
        let health: SharedDamageable = Arc::new(Mutex::new(Health::new(EntityId::new(1, 0), 10.0)));
        let player = MovingTarget::new(EntityId::new(1, 0), Vec3::ZERO)
            .with_half_extents(Vec3::splat(0.5))
            .with_health(&health);

        player.set_position(Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(player.closest_point(Vec3::ZERO), Vec3::new(3.5, 0.0, 0.0));
        assert!(!player.is_dead());
        assert!(player.damageable().is_some());

        health.lock().damage(&DamageInfo::new(10.0));
        assert!(player.is_dead());

        drop(health);
        assert!(player.is_dead());
        assert!(player.damageable().is_none());
    }

    #[test]
    fn test_weak_handle_upgrade() {
        let target: TargetHandle = Arc::new(MovingTarget::new(EntityId::new(2, 0), Vec3::ONE));
        let weak: WeakTarget = Arc::downgrade(&target);
        assert!(weak.upgrade().is_some());
        drop(target);
        assert!(weak.upgrade().is_none());
    }
}
