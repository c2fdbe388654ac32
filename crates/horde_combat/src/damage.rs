//! Damage information

use glam::Vec3;
use horde_core::EntityId;
use serde::{Deserialize, Serialize};

/// Information about a damage instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageInfo {
    /// Base damage amount
    pub amount: f32,
    /// Entity that caused the damage (if any)
    pub source: Option<EntityId>,
    /// World position where damage was applied
    pub hit_point: Vec3,
    /// Surface normal at hit point
    pub hit_normal: Vec3,
}

impl DamageInfo {
    /// Create new damage info
    pub fn new(amount: f32) -> Self {
        Self {
            amount,
            source: None,
            hit_point: Vec3::ZERO,
            hit_normal: Vec3::Y,
        }
    }

    /// Set the source entity
    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the hit point and surface normal
    pub fn with_hit(mut self, point: Vec3, normal: Vec3) -> Self {
        self.hit_point = point;
        self.hit_normal = normal;
        self
    }
}

impl Default for DamageInfo {
    fn default() -> Self {
        Self::new(0.0)
    }
}
