//! Health capability and management

use crate::damage::DamageInfo;
use horde_core::EntityId;
use horde_event::EventSender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

/// Highest fraction of incoming damage a `Health` may absorb
pub const MAX_ABSORPTION: f32 = 0.9;

/// Events emitted by the health system
#[derive(Debug, Clone, PartialEq)]
pub enum HealthEvent {
    /// Damage was taken
    Damaged {
        entity: EntityId,
        source: Option<EntityId>,
        amount: f32,
        remaining: f32,
    },
    /// Entity died. Fires once per life.
    Died {
        entity: EntityId,
        source: Option<EntityId>,
    },
}

/// Something that can take damage and die
pub trait Damageable: Send {
    /// Entity owning this capability
    fn entity(&self) -> EntityId;

    /// Apply damage. Returns false when nothing was applied (already dead).
    fn damage(&mut self, info: &DamageInfo) -> bool;

    fn is_dead(&self) -> bool;
}

/// Shared handle to a damage capability
pub type SharedDamageable = Arc<Mutex<dyn Damageable>>;

/// Non-owning handle to a damage capability
pub type WeakDamageable = Weak<Mutex<dyn Damageable>>;

/// Health with damage absorption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    entity: EntityId,
    /// Current health
    pub current: f32,
    /// Maximum health
    pub max: f32,
    /// Fraction of incoming damage ignored, in `[0, MAX_ABSORPTION]`
    absorption: f32,
    #[serde(skip)]
    dead: bool,
    #[serde(skip)]
    events: Option<EventSender<HealthEvent>>,
}

impl Health {
    /// Create a new health capability
    pub fn new(entity: EntityId, max_health: f32) -> Self {
        Self {
            entity,
            current: max_health,
            max: max_health,
            absorption: 0.0,
            dead: false,
            events: None,
        }
    }

    /// Set damage absorption (clamped to `[0, MAX_ABSORPTION]`)
    pub fn with_absorption(mut self, absorption: f32) -> Self {
        self.absorption = absorption.clamp(0.0, MAX_ABSORPTION);
        self
    }

    /// Publish damage and death events on a channel
    pub fn with_events(mut self, events: EventSender<HealthEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Damage absorption factor
    pub fn absorption(&self) -> f32 {
        self.absorption
    }

    /// Heal the entity
    /// Returns the actual amount healed
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.dead || amount <= 0.0 {
            return 0.0;
        }

        let old_health = self.current;
        self.current = (self.current + amount).min(self.max);
        self.current - old_health
    }

    /// Restore full health, used when a pooled entity is reused
    pub fn reset(&mut self) {
        self.current = self.max;
        self.dead = false;
    }

    /// Get health as a percentage (0.0 - 1.0)
    pub fn health_percent(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        self.current / self.max
    }

    /// Check if alive
    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    fn emit(&self, event: HealthEvent) {
        if let Some(events) = &self.events {
            events.send(event);
        }
    }
}

impl Damageable for Health {
    fn entity(&self) -> EntityId {
        self.entity
    }

    fn damage(&mut self, info: &DamageInfo) -> bool {
        if self.dead || info.amount.is_nan() || info.amount <= 0.0 {
            return false;
        }

        let applied = info.amount * (1.0 - self.absorption);
        self.current = (self.current - applied).max(0.0);
        self.emit(HealthEvent::Damaged {
            entity: self.entity,
            source: info.source,
            amount: applied,
            remaining: self.current,
        });

        if self.current <= 0.0 {
            self.dead = true;
            log::debug!("{} died", self.entity);
            self.emit(HealthEvent::Died {
                entity: self.entity,
                source: info.source,
            });
        }
        true
    }

    fn is_dead(&self) -> bool {
        self.dead
    }
}
