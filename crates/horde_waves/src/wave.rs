//! Runtime state of one wave
//!
//! A wave moves through `Waiting -> InProgress -> SpawnComplete -> Complete`
//! and never goes back. The wave does not spawn anything itself: the owner
//! asks [`WaveState::ready_groups`] which groups are due, spawns them and
//! reports the new entities with [`WaveState::record_spawn`].

use crate::config::{SpawnGroupConfig, WaveConfig};
use crate::error::Result;
use crate::events::WaveEvent;
use horde_core::EntityId;
use horde_event::EventSender;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Wave lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WaveStatus {
    /// Not started
    #[default]
    Waiting,
    /// Groups are spawning
    InProgress,
    /// Every group is full; waiting for the population to die
    SpawnComplete,
    Complete,
}

/// Per-group counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupState {
    spawned: u32,
    /// Seconds since the last batch
    timer: f32,
}

impl GroupState {
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn remaining(&self, config: &SpawnGroupConfig) -> u32 {
        config.max_amount.saturating_sub(self.spawned)
    }

    pub fn is_complete(&self, config: &SpawnGroupConfig) -> bool {
        self.spawned >= config.max_amount
    }

    pub fn is_ready(&self, config: &SpawnGroupConfig) -> bool {
        !self.is_complete(config) && self.timer >= config.interval
    }

    fn accrue(&mut self, dt: f32, config: &SpawnGroupConfig) {
        if !self.is_complete(config) {
            self.timer += dt;
        }
    }
}

/// Runtime state of a wave
#[derive(Debug)]
pub struct WaveState {
    config: Arc<WaveConfig>,
    index: usize,
    status: WaveStatus,
    groups: Vec<GroupState>,
    /// Active group in sequential mode
    current_group: usize,
    alive: BTreeSet<EntityId>,
    total_spawned: u32,
    killed: u32,
    cancelled: bool,
    events: EventSender<WaveEvent>,
}

impl WaveState {
    pub fn new(config: Arc<WaveConfig>, index: usize, events: EventSender<WaveEvent>) -> Self {
        let groups = vec![GroupState::default(); config.groups.len()];
        Self {
            config,
            index,
            status: WaveStatus::Waiting,
            groups,
            current_group: 0,
            alive: BTreeSet::new(),
            total_spawned: 0,
            killed: 0,
            cancelled: false,
            events,
        }
    }

    /// Validate the configuration and move to `InProgress`
    pub fn start(&mut self) -> Result<()> {
        if self.status != WaveStatus::Waiting {
            log::warn!("Cannot start wave '{}' in {:?} status", self.config.name, self.status);
            return Ok(());
        }
        self.config.validate()?;

        self.set_status(WaveStatus::InProgress);
        log::info!(
            "Wave '{}' started ({} groups, {} entities, {})",
            self.config.name,
            self.config.groups.len(),
            self.config.total_entities(),
            if self.config.sequential { "sequential" } else { "parallel" }
        );
        self.emit(WaveEvent::WaveStarted {
            index: self.index,
            name: self.config.name.clone(),
        });
        Ok(())
    }

    /// Advance group timers.
    ///
    /// In parallel mode every unfinished group accrues. In sequential mode the
    /// current group accrues; when it is full the wave moves to the next group
    /// first, at most one step per tick.
    pub fn tick(&mut self, dt: f32) {
        if self.status != WaveStatus::InProgress || self.cancelled {
            return;
        }

        if self.config.sequential {
            let current = self.current_group;
            if current + 1 < self.groups.len() && self.groups[current].is_complete(&self.config.groups[current]) {
                self.current_group += 1;
                log::debug!(
                    "Wave '{}' advanced to group {}",
                    self.config.name,
                    self.current_group
                );
            }
            let current = self.current_group;
            if let (Some(state), Some(config)) = (self.groups.get_mut(current), self.config.groups.get(current)) {
                state.accrue(dt, config);
            }
        } else {
            for (state, config) in self.groups.iter_mut().zip(&self.config.groups) {
                state.accrue(dt, config);
            }
        }
    }

    /// Groups due for a batch, with the batch size `min(per_spawn, remaining)`
    pub fn ready_groups(&self) -> Vec<(usize, u32)> {
        if self.status != WaveStatus::InProgress || self.cancelled {
            return Vec::new();
        }

        let candidates = if self.config.sequential {
            self.current_group..(self.current_group + 1).min(self.groups.len())
        } else {
            0..self.groups.len()
        };

        candidates
            .filter_map(|i| {
                let config = &self.config.groups[i];
                let state = &self.groups[i];
                state
                    .is_ready(config)
                    .then(|| (i, config.per_spawn.min(state.remaining(config))))
            })
            .collect()
    }

    /// Record the entities a group spawned. Extra ids beyond the group's
    /// remaining capacity are ignored.
    ///
    /// Returns how many were counted.
    pub fn record_spawn(&mut self, group: usize, ids: &[EntityId]) -> u32 {
        if self.status != WaveStatus::InProgress || self.cancelled {
            log::warn!("Wave '{}' is not spawning, ignoring batch", self.config.name);
            return 0;
        }
        let Some(config) = self.config.groups.get(group) else {
            log::warn!("Wave '{}' has no spawn group {}", self.config.name, group);
            return 0;
        };

        let state = &mut self.groups[group];
        let count = state.remaining(config).min(ids.len() as u32);
        state.spawned += count;
        state.timer = 0.0;
        let kind = config.kind;

        self.alive.extend(ids.iter().take(count as usize).copied());
        self.total_spawned += count;
        if count > 0 {
            self.emit(WaveEvent::GroupBatchSpawned {
                wave: self.index,
                group,
                kind,
                count,
            });
        }

        if self.all_spawned() {
            self.set_status(WaveStatus::SpawnComplete);
            log::info!("Wave '{}' finished spawning {} entities", self.config.name, self.total_spawned);
            self.emit(WaveEvent::WaveSpawnComplete { wave: self.index });
            self.check_completion();
        }
        count
    }

    /// Record a death. Returns false when the entity does not belong to this wave.
    pub fn record_death(&mut self, id: EntityId) -> bool {
        if !self.alive.remove(&id) {
            return false;
        }
        self.killed += 1;
        self.check_completion();
        true
    }

    /// Treat `SpawnComplete` as terminal without waiting for the population to die.
    ///
    /// Returns false in any other status.
    pub fn force_complete(&mut self) -> bool {
        if self.status != WaveStatus::SpawnComplete || self.cancelled {
            return false;
        }
        self.complete();
        true
    }

    /// Stop the wave. No further events fire. Returns the live entities for release.
    pub fn cancel(&mut self) -> Vec<EntityId> {
        self.cancelled = true;
        log::info!("Wave '{}' cancelled", self.config.name);
        std::mem::take(&mut self.alive).into_iter().collect()
    }

    fn check_completion(&mut self) {
        if self.status == WaveStatus::SpawnComplete && self.alive.is_empty() {
            self.complete();
        }
    }

    fn complete(&mut self) {
        self.set_status(WaveStatus::Complete);
        log::info!("Wave '{}' complete", self.config.name);
        self.emit(WaveEvent::WaveCompleted { wave: self.index });
    }

    fn set_status(&mut self, status: WaveStatus) {
        if status > self.status {
            self.status = status;
        }
    }

    fn emit(&self, event: WaveEvent) {
        if !self.cancelled {
            self.events.send(event);
        }
    }

    pub fn all_spawned(&self) -> bool {
        self.groups
            .iter()
            .zip(&self.config.groups)
            .all(|(state, config)| state.is_complete(config))
    }

    pub fn config(&self) -> &Arc<WaveConfig> {
        &self.config
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> WaveStatus {
        self.status
    }

    pub fn group_states(&self) -> &[GroupState] {
        &self.groups
    }

    pub fn current_group(&self) -> usize {
        self.current_group
    }

    pub fn total_spawned(&self) -> u32 {
        self.total_spawned
    }

    pub fn alive_count(&self) -> u32 {
        self.alive.len() as u32
    }

    pub fn killed(&self) -> u32 {
        self.killed
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaveError;
    use horde_core::IdAllocator;
    use horde_event::EventChannel;

    fn spawn_ready(wave: &mut WaveState, ids: &mut IdAllocator) -> Vec<(usize, Vec<EntityId>)> {
        let mut batches = Vec::new();
        for (group, count) in wave.ready_groups() {
            let spawned: Vec<EntityId> = (0..count).map(|_| ids.allocate()).collect();
            wave.record_spawn(group, &spawned);
            batches.push((group, spawned));
        }
        batches
    }

    #[test]
    fn test_single_group_status_sequence() {
        let channel = EventChannel::new();
        let config = WaveConfig::new("W").with_group(SpawnGroupConfig::new(0, 4, 2, 1.0));
        let mut wave = WaveState::new(Arc::new(config), 0, channel.sender());
        let mut ids = IdAllocator::new();

        assert_eq!(wave.status(), WaveStatus::Waiting);
        wave.start().unwrap();
        assert_eq!(wave.status(), WaveStatus::InProgress);

        let mut spawned = Vec::new();
        let mut batch_times = Vec::new();
        for step in 1..=8 {
            wave.tick(0.5);
            for (_, batch) in spawn_ready(&mut wave, &mut ids) {
                batch_times.push(step as f32 * 0.5);
                spawned.extend(batch);
            }
        }

        assert_eq!(batch_times, vec![1.0, 2.0]);
        assert_eq!(spawned.len(), 4);
        assert_eq!(wave.status(), WaveStatus::SpawnComplete);

        for id in &spawned[..3] {
            assert!(wave.record_death(*id));
            assert_eq!(wave.status(), WaveStatus::SpawnComplete);
        }
        assert!(!wave.record_death(spawned[0]));
        assert!(wave.record_death(spawned[3]));
        assert_eq!(wave.status(), WaveStatus::Complete);
        assert_eq!(wave.killed(), 4);

        let events = channel.drain();
        assert_eq!(events.first(), Some(&WaveEvent::WaveStarted { index: 0, name: "W".into() }));
        assert_eq!(
            events.iter().filter(|e| matches!(e, WaveEvent::GroupBatchSpawned { count: 2, .. })).count(),
            2
        );
        assert_eq!(
            &events[events.len() - 2..],
            &[WaveEvent::WaveSpawnComplete { wave: 0 }, WaveEvent::WaveCompleted { wave: 0 }][..]
        );
    }

    #[test]
    fn test_parallel_groups_spawn_together() {
        let channel = EventChannel::new();
        let config = WaveConfig::new("P")
            .with_group(SpawnGroupConfig::new(0, 3, 2, 1.0))
            .with_group(SpawnGroupConfig::new(1, 3, 3, 1.0));
        let mut wave = WaveState::new(Arc::new(config), 0, channel.sender());
        wave.start().unwrap();

        wave.tick(1.0);
        assert_eq!(wave.ready_groups(), vec![(0, 2), (1, 3)]);

        let mut ids = IdAllocator::new();
        spawn_ready(&mut wave, &mut ids);
        assert_eq!(wave.status(), WaveStatus::InProgress);

        // Last batch of group 0 is clamped to the remaining capacity
        wave.tick(1.0);
        assert_eq!(wave.ready_groups(), vec![(0, 1)]);
        spawn_ready(&mut wave, &mut ids);
        assert_eq!(wave.status(), WaveStatus::SpawnComplete);
        assert_eq!(wave.total_spawned(), 6);
    }

    #[test]
    fn test_sequential_advances_one_group_at_a_time() {
        let channel = EventChannel::new();
        let config = WaveConfig::new("S")
            .sequential(true)
            .with_group(SpawnGroupConfig::new(0, 2, 1, 1.0))
            .with_group(SpawnGroupConfig::new(1, 2, 2, 0.5))
            .with_group(SpawnGroupConfig::new(2, 1, 1, 0.0));
        let mut wave = WaveState::new(Arc::new(config.clone()), 0, channel.sender());
        wave.start().unwrap();
        let mut ids = IdAllocator::new();

        let mut previous_group = wave.current_group();
        for _ in 0..40 {
            let before: Vec<GroupState> = wave.group_states().to_vec();
            wave.tick(0.25);
            let current = wave.current_group();

            assert!(current - previous_group <= 1);
            if current != previous_group {
                let group = &config.groups[previous_group];
                assert!(before[previous_group].is_complete(group));
            }

            let changed = wave
                .group_states()
                .iter()
                .zip(&before)
                .filter(|(now, then)| now.timer() != then.timer())
                .count();
            if !wave.all_spawned() {
                assert_eq!(changed, 1);
            }

            for (group, _) in wave.ready_groups() {
                assert_eq!(group, current);
            }
            spawn_ready(&mut wave, &mut ids);
            previous_group = current;
        }

        assert_eq!(wave.status(), WaveStatus::SpawnComplete);
        assert_eq!(wave.current_group(), 2);
        assert_eq!(wave.total_spawned(), 5);
    }

    #[test]
    fn test_force_complete_requires_spawn_complete() {
        let channel = EventChannel::new();
        let config = WaveConfig::new("F").with_group(SpawnGroupConfig::new(0, 1, 1, 0.0));
        let mut wave = WaveState::new(Arc::new(config), 0, channel.sender());
        wave.start().unwrap();
        assert!(!wave.force_complete());

        wave.tick(0.1);
        let mut ids = IdAllocator::new();
        spawn_ready(&mut wave, &mut ids);
        assert_eq!(wave.status(), WaveStatus::SpawnComplete);

        assert!(wave.force_complete());
        assert_eq!(wave.status(), WaveStatus::Complete);
        assert_eq!(wave.alive_count(), 1);
    }

    #[test]
    fn test_cancel_silences_events() {
        let channel = EventChannel::new();
        let config = WaveConfig::new("C").with_group(SpawnGroupConfig::new(0, 4, 2, 0.0));
        let mut wave = WaveState::new(Arc::new(config), 0, channel.sender());
        wave.start().unwrap();
        wave.tick(0.1);
        let mut ids = IdAllocator::new();
        spawn_ready(&mut wave, &mut ids);
        channel.clear();

        let released = wave.cancel();
        assert_eq!(released.len(), 2);
        assert_eq!(wave.alive_count(), 0);

        wave.tick(1.0);
        assert!(wave.ready_groups().is_empty());
        assert_eq!(wave.record_spawn(0, &[ids.allocate()]), 0);
        assert!(!wave.record_death(released[0]));
        assert!(channel.is_empty());
    }

    #[test]
    fn test_invalid_wave_refuses_to_start() {
        let channel = EventChannel::new();
        let mut wave = WaveState::new(Arc::new(WaveConfig::new("Empty")), 0, channel.sender());
        assert!(matches!(wave.start(), Err(WaveError::NoSpawnGroups)));
        assert_eq!(wave.status(), WaveStatus::Waiting);
        assert!(channel.is_empty());
    }
}
