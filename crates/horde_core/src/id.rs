//! Entity identifiers with generational indices
//!
//! Dead agents are recycled, so their slot index is handed out again with a
//! bumped generation. Stale ids held by other systems then never alias the
//! new occupant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier with a generation counter for safe reuse
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    /// Lower 32 bits: index, Upper 32 bits: generation
    bits: u64,
}

impl EntityId {
    /// Create a new ID from index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
        }
    }

    /// Get the index portion
    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    /// Get the generation portion
    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Get the raw bits
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Hands out entity ids and takes them back when the entity is recycled.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_index: u32,
    /// Released slots with the generation their next occupant gets
    free: Vec<(u32, u32)>,
    live: usize,
}

impl IdAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id, preferring recycled slots
    pub fn allocate(&mut self) -> EntityId {
        self.live += 1;
        if let Some((index, generation)) = self.free.pop() {
            return EntityId::new(index, generation);
        }
        let index = self.next_index;
        self.next_index += 1;
        EntityId::new(index, 0)
    }

    /// Return an id to the pool. Its slot comes back with the next generation.
    pub fn release(&mut self, id: EntityId) {
        if self.free.iter().any(|(index, _)| *index == id.index()) {
            return;
        }
        self.live = self.live.saturating_sub(1);
        self.free.push((id.index(), id.generation().wrapping_add(1)));
    }

    /// Number of ids currently handed out
    pub fn live_count(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parts() {
        let id = EntityId::new(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert_eq!(EntityId::from_bits(id.to_bits()), id);
        assert_eq!(id.to_string(), "7v3");
    }

    #[test]
    fn test_allocator_recycles_with_new_generation() {
        let mut ids = IdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_ne!(a, b);
        assert_eq!(ids.live_count(), 2);

        ids.release(a);
        ids.release(a);
        assert_eq!(ids.live_count(), 1);

        let c = ids.allocate();
        assert_eq!(c.index(), a.index());
        assert_eq!(c.generation(), a.generation() + 1);
        assert_ne!(c, a);
    }
}
