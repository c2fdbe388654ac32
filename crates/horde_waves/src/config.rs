//! Spawn group, wave and level configuration
//!
//! Configuration is plain serde data. Validation runs when a wave or level
//! starts; a level that fails validation never starts.

use crate::direction::{distribute, SpawnDirection, SpawnDirections};
use crate::error::{Result, WaveError};
use horde_core::MAX_AGENT_KINDS;
use serde::{Deserialize, Serialize};

/// One sub-population of a wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnGroupConfig {
    /// Agent kind index
    pub kind: u8,
    /// Entities this group spawns in total
    pub max_amount: u32,
    /// Entities per batch
    pub per_spawn: u32,
    /// Seconds between batches
    pub interval: f32,
}

impl Default for SpawnGroupConfig {
    fn default() -> Self {
        Self {
            kind: 0,
            max_amount: 10,
            per_spawn: 2,
            interval: 3.0,
        }
    }
}

impl SpawnGroupConfig {
    pub fn new(kind: u8, max_amount: u32, per_spawn: u32, interval: f32) -> Self {
        Self {
            kind,
            max_amount,
            per_spawn,
            interval,
        }
    }

    /// Batches needed to spawn the whole group
    pub fn total_batches(&self) -> u32 {
        if self.per_spawn == 0 {
            return 0;
        }
        self.max_amount.div_ceil(self.per_spawn)
    }

    /// Seconds from wave start until the last batch
    pub fn estimated_duration(&self) -> f32 {
        self.total_batches() as f32 * self.interval
    }

    /// Reason the group is unusable, if any
    fn problem(&self) -> Option<String> {
        if self.kind >= MAX_AGENT_KINDS {
            Some(format!("kind {} is outside 0..{}", self.kind, MAX_AGENT_KINDS))
        } else if self.max_amount == 0 {
            Some("max amount must be greater than 0".to_string())
        } else if self.per_spawn == 0 {
            Some("entities per spawn must be greater than 0".to_string())
        } else if !self.interval.is_finite() || self.interval < 0.0 {
            Some(format!("spawn interval {} cannot be negative", self.interval))
        } else {
            None
        }
    }

    pub fn validate(&self, index: usize) -> Result<()> {
        match self.problem() {
            Some(reason) => Err(WaveError::InvalidGroup { index, reason }),
            None => Ok(()),
        }
    }
}

/// A wave: an ordered list of spawn groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub name: String,
    /// Spawn groups one after another instead of all at once
    pub sequential: bool,
    pub groups: Vec<SpawnGroupConfig>,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            name: "Wave".to_string(),
            sequential: false,
            groups: Vec::new(),
        }
    }
}

impl WaveConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn with_group(mut self, group: SpawnGroupConfig) -> Self {
        self.groups.push(group);
        self
    }

    pub fn total_entities(&self) -> u32 {
        self.groups.iter().map(|g| g.max_amount).sum()
    }

    /// Spawn time of the wave: the slowest group in parallel mode, the sum in sequential mode
    pub fn estimated_duration(&self) -> f32 {
        let durations = self.groups.iter().map(SpawnGroupConfig::estimated_duration);
        if self.sequential {
            durations.sum()
        } else {
            durations.fold(0.0, f32::max)
        }
    }

    /// Validate every group, logging each problem and returning the first
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            log::error!("Wave '{}' has no spawn groups", self.name);
            return Err(WaveError::NoSpawnGroups);
        }

        let mut first = None;
        for (index, group) in self.groups.iter().enumerate() {
            if let Err(e) = group.validate(index) {
                log::error!("Wave '{}': {}", self.name, e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// A level: waves played in order with a pause between them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub name: String,
    pub directions: SpawnDirections,
    /// Seconds between a wave completing and the next one starting
    pub interval_between_waves: f32,
    pub waves: Vec<WaveConfig>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            name: "Level".to_string(),
            directions: SpawnDirections::NONE
                .with(SpawnDirection::North)
                .with(SpawnDirection::South),
            interval_between_waves: 10.0,
            waves: Vec::new(),
        }
    }
}

impl LevelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_directions(mut self, directions: SpawnDirections) -> Self {
        self.directions = directions;
        self
    }

    pub fn with_interval(mut self, seconds: f32) -> Self {
        self.interval_between_waves = seconds;
        self
    }

    pub fn with_wave(mut self, wave: WaveConfig) -> Self {
        self.waves.push(wave);
        self
    }

    pub fn total_waves(&self) -> usize {
        self.waves.len()
    }

    pub fn total_entities(&self) -> u32 {
        self.waves.iter().map(WaveConfig::total_entities).sum()
    }

    pub fn active_direction_count(&self) -> u32 {
        self.directions.count()
    }

    /// Split a batch across this level's directions
    pub fn distribute(&self, count: u32) -> Vec<(SpawnDirection, u32)> {
        distribute(count, self.directions)
    }

    /// Validate the level and every wave, logging each problem and returning the first
    pub fn validate(&self) -> Result<()> {
        let mut first: Option<WaveError> = None;
        let mut report = |e: WaveError| {
            log::error!("Level '{}': {}", self.name, e);
            first.get_or_insert(e);
        };

        if self.directions.is_empty() {
            report(WaveError::NoDirections);
        }
        if self.waves.is_empty() {
            report(WaveError::NoWaves);
        }
        if !self.interval_between_waves.is_finite() || self.interval_between_waves < 0.0 {
            report(WaveError::InvalidInterval(self.interval_between_waves));
        }
        for (index, wave) in self.waves.iter().enumerate() {
            if let Err(e) = wave.validate() {
                report(WaveError::InvalidWave {
                    index,
                    source: Box::new(e),
                });
            }
        }

        first.map_or(Ok(()), Err)
    }
}
