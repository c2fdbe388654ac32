//! Horde Combat - Health and Melee Hits
//!
//! This crate provides the combat capabilities agents consume:
//!
//! - `Damageable` capability and its `Health` implementation
//! - Damage descriptions with source, hit point and normal
//! - `HitDetector` capability and the `MeleeHitTrigger` implementation
//!
//! Agents hold these through shared handles assigned at construction.

pub mod damage;
pub mod health;
pub mod hit;

pub mod prelude {
    pub use crate::damage::DamageInfo;
    pub use crate::health::{Damageable, Health, HealthEvent, SharedDamageable, WeakDamageable};
    pub use crate::hit::{HitDetector, MeleeHitTrigger, SharedHitDetector};
}

pub use prelude::*;
