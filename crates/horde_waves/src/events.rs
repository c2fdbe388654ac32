//! Wave system notifications

use crate::direction::SpawnDirection;
use crate::level::WaveSystemState;
use horde_core::EntityId;
use serde::{Deserialize, Serialize};

/// Events published by [`WaveState`](crate::wave::WaveState) and
/// [`LevelRunner`](crate::level::LevelRunner)
#[derive(Debug, Clone, PartialEq)]
pub enum WaveEvent {
    LevelStarted {
        name: String,
    },
    SystemStateChanged {
        from: WaveSystemState,
        to: WaveSystemState,
    },
    WaveStarted {
        index: usize,
        name: String,
    },
    /// One spawn group produced a batch
    GroupBatchSpawned {
        wave: usize,
        group: usize,
        kind: u8,
        count: u32,
    },
    /// Part of a batch entered from one direction
    DirectionBatchSpawned {
        direction: SpawnDirection,
        count: u32,
    },
    /// Every group of the wave reached its maximum
    WaveSpawnComplete {
        wave: usize,
    },
    /// Every entity of the wave has been spawned and has died
    WaveCompleted {
        wave: usize,
    },
    LevelCompleted {
        name: String,
    },
    EntityDied {
        id: EntityId,
    },
    Statistics(WaveStatistics),
}

/// Snapshot of level progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveStatistics {
    pub current_wave_index: usize,
    pub total_waves: usize,
    pub entities_spawned: u32,
    pub entities_alive: u32,
    pub entities_killed: u32,
    /// Seconds since the level started
    pub time_elapsed: f32,
    pub system_state: WaveSystemState,
}
