//! Melee hit detection
//!
//! A hit detector is armed by its owner during an attack swing and applies
//! damage to at most one overlapping target per swing. The `HitApplied` flag
//! is owned by the detector and cleared by the attacker at the start of each
//! swing.

use crate::damage::DamageInfo;
use crate::health::Damageable;
use glam::Vec3;
use horde_core::EntityId;
use parking_lot::Mutex;
use std::sync::Arc;

/// Hit detection capability consumed by attacking agents
pub trait HitDetector: Send {
    /// Start detecting overlaps
    fn activate(&mut self);

    /// Stop detecting overlaps
    fn deactivate(&mut self);

    /// Clear the applied flag at the start of a new swing
    fn reset_applied(&mut self);

    /// Whether damage was applied during the current swing
    fn has_applied(&self) -> bool;

    fn is_active(&self) -> bool;
}

/// Shared handle to a hit detector
pub type SharedHitDetector = Arc<Mutex<dyn HitDetector>>;

/// Hit trigger attached to an agent's arm
#[derive(Debug, Clone)]
pub struct MeleeHitTrigger {
    owner: EntityId,
    /// Damage dealt per applied hit
    pub damage: f32,
    active: bool,
    applied: bool,
    activations: u32,
}

impl MeleeHitTrigger {
    /// Default damage of a single swing
    pub const DEFAULT_DAMAGE: f32 = 5.0;

    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            damage: Self::DEFAULT_DAMAGE,
            active: false,
            applied: false,
            activations: 0,
        }
    }

    /// Set damage per hit
    pub fn with_damage(mut self, damage: f32) -> Self {
        self.damage = damage;
        self
    }

    /// Owner of the trigger
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Total number of times the trigger was armed
    pub fn activations(&self) -> u32 {
        self.activations
    }

    /// Resolve an overlap with `target`.
    ///
    /// Damage is applied only while active and not yet applied this swing.
    /// The trigger deactivates itself after a successful hit.
    pub fn try_apply(&mut self, target: &mut dyn Damageable, hit_point: Vec3, hit_normal: Vec3) -> bool {
        if !self.active || self.applied || target.is_dead() {
            return false;
        }

        let info = DamageInfo::new(self.damage)
            .with_source(self.owner)
            .with_hit(hit_point, hit_normal);
        let applied = target.damage(&info);
        if applied {
            log::debug!("{} hit {} for {}", self.owner, target.entity(), self.damage);
            self.applied = true;
            self.active = false;
        }
        applied
    }
}

impl HitDetector for MeleeHitTrigger {
    fn activate(&mut self) {
        if !self.active {
            self.active = true;
            self.activations += 1;
        }
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn reset_applied(&mut self) {
        self.applied = false;
    }

    fn has_applied(&self) -> bool {
        self.applied
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
