//! Ragdoll pool used by the headless world

use glam::{Quat, Vec3};
use horde_ai::{EffectHandle, EffectPool, PrefabKind};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A spawned ragdoll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ragdoll {
    pub handle: EffectHandle,
    pub prefab: PrefabKind,
    pub position: Vec3,
    pub rotation: Quat,
    /// Accumulated impulse
    pub impulse: Vec3,
}

#[derive(Debug, Default)]
struct PoolState {
    live: VecDeque<Ragdoll>,
    next_handle: u64,
    spawned: u64,
    recycled: u64,
}

/// Bounded ragdoll pool. Spawning past capacity recycles the oldest ragdoll.
#[derive(Debug)]
pub struct RagdollPool {
    capacity: usize,
    state: Mutex<PoolState>,
}

impl RagdollPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Ragdolls currently out of the pool
    pub fn live(&self) -> Vec<Ragdoll> {
        self.state.lock().live.iter().copied().collect()
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Total ragdolls ever spawned
    pub fn spawned(&self) -> u64 {
        self.state.lock().spawned
    }

    pub fn recycled(&self) -> u64 {
        self.state.lock().recycled
    }
}

impl EffectPool for RagdollPool {
    fn spawn(&self, prefab: PrefabKind, position: Vec3, rotation: Quat) -> EffectHandle {
        let mut state = self.state.lock();
        if state.live.len() >= self.capacity {
            if let Some(oldest) = state.live.pop_front() {
                log::debug!("Ragdoll pool full, recycling {:?}", oldest.handle);
                state.recycled += 1;
            }
        }

        let handle = EffectHandle(state.next_handle);
        state.next_handle += 1;
        state.spawned += 1;
        state.live.push_back(Ragdoll {
            handle,
            prefab,
            position,
            rotation,
            impulse: Vec3::ZERO,
        });
        handle
    }

    fn apply_impulse(&self, handle: EffectHandle, impulse: Vec3) {
        let mut state = self.state.lock();
        if let Some(ragdoll) = state.live.iter_mut().find(|r| r.handle == handle) {
            ragdoll.impulse += impulse;
        }
    }

    fn recycle(&self, handle: EffectHandle) {
        let mut state = self.state.lock();
        let before = state.live.len();
        state.live.retain(|r| r.handle != handle);
        if state.live.len() != before {
            state.recycled += 1;
        }
    }
}
