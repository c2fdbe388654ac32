//! Level sequencing
//!
//! [`LevelRunner`] plays the waves of one level strictly in order. After a
//! preparation delay the first wave starts; each completed wave is followed
//! by the level's pause before the next one. The final wave's completion
//! ends the level.

use crate::config::{LevelConfig, WaveConfig};
use crate::direction::{SpawnDirection, SpawnDirections};
use crate::error::{Result, WaveError};
use crate::events::{WaveEvent, WaveStatistics};
use crate::wave::{WaveState, WaveStatus};
use horde_core::EntityId;
use horde_event::EventChannel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Coarse state of the level runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WaveSystemState {
    #[default]
    Idle,
    /// Counting down to the first wave
    PreparingLevel,
    WaveInProgress,
    WaitingBetweenWaves,
    LevelComplete,
}

impl WaveSystemState {
    /// A level is loaded and has not finished
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::PreparingLevel | Self::WaveInProgress | Self::WaitingBetweenWaves
        )
    }
}

/// Runner tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WavePolicy {
    /// Start the next wave as soon as the current one finishes spawning
    pub advance_on_spawn_complete: bool,
    /// Seconds between level start and the first wave
    pub start_delay: f32,
    /// Seconds between statistics updates, 0 disables them
    pub stats_interval: f32,
}

impl Default for WavePolicy {
    fn default() -> Self {
        Self {
            advance_on_spawn_complete: false,
            start_delay: 1.0,
            stats_interval: 1.0,
        }
    }
}

/// Creates the entities of one batch at one spawn direction
pub trait EntitySpawner {
    /// Spawn up to `count` entities of `kind`. Returns the ids actually created.
    fn spawn_batch(&mut self, kind: u8, direction: SpawnDirection, count: u32) -> Vec<EntityId>;
}

impl<F> EntitySpawner for F
where
    F: FnMut(u8, SpawnDirection, u32) -> Vec<EntityId>,
{
    fn spawn_batch(&mut self, kind: u8, direction: SpawnDirection, count: u32) -> Vec<EntityId> {
        self(kind, direction, count)
    }
}

/// Plays the waves of a level in order
pub struct LevelRunner {
    policy: WavePolicy,
    state: WaveSystemState,
    level: Option<Arc<LevelConfig>>,
    waves: Vec<Arc<WaveConfig>>,
    current: Option<WaveState>,
    wave_index: usize,
    /// Countdown for the preparation delay and the pause between waves
    countdown: f32,
    elapsed: f32,
    stats_timer: f32,
    entities_spawned: u32,
    entities_killed: u32,
    /// Live entities of the whole level, including force-completed waves
    alive: BTreeSet<EntityId>,
    events: EventChannel<WaveEvent>,
}

impl LevelRunner {
    pub fn new(policy: WavePolicy) -> Self {
        Self {
            policy,
            state: WaveSystemState::Idle,
            level: None,
            waves: Vec::new(),
            current: None,
            wave_index: 0,
            countdown: 0.0,
            elapsed: 0.0,
            stats_timer: 0.0,
            entities_spawned: 0,
            entities_killed: 0,
            alive: BTreeSet::new(),
            events: EventChannel::new(),
        }
    }

    /// Load and start a level.
    ///
    /// `available` lists the directions that have a spawn area. The level is
    /// validated before anything changes; on error the runner is untouched.
    pub fn start_level(&mut self, level: LevelConfig, available: SpawnDirections) -> Result<()> {
        if self.state.is_active() {
            log::warn!("Cannot start level '{}': a level is already active", level.name);
            return Err(WaveError::LevelActive);
        }
        level.validate()?;
        if let Some(missing) = level.directions.iter().find(|d| !available.contains(*d)) {
            log::error!("Level '{}' uses direction {} without a spawn point", level.name, missing);
            return Err(WaveError::MissingSpawnPoint(missing));
        }

        log::info!(
            "Level '{}' started: {} waves, {} entities, {} directions",
            level.name,
            level.total_waves(),
            level.total_entities(),
            level.active_direction_count()
        );

        self.waves = level.waves.iter().cloned().map(Arc::new).collect();
        self.current = None;
        self.wave_index = 0;
        self.countdown = self.policy.start_delay;
        self.elapsed = 0.0;
        self.stats_timer = 0.0;
        self.entities_spawned = 0;
        self.entities_killed = 0;
        self.alive.clear();
        self.events.send(WaveEvent::LevelStarted {
            name: level.name.clone(),
        });
        self.level = Some(Arc::new(level));
        self.set_state(WaveSystemState::PreparingLevel);
        Ok(())
    }

    /// Advance the level by `dt` seconds, spawning through `spawner`
    pub fn tick<S: EntitySpawner + ?Sized>(&mut self, dt: f32, spawner: &mut S) {
        if !self.state.is_active() {
            return;
        }
        self.elapsed += dt;

        match self.state {
            WaveSystemState::PreparingLevel => {
                self.countdown -= dt;
                if self.countdown <= 0.0 {
                    self.begin_wave(0);
                }
            }
            WaveSystemState::WaitingBetweenWaves => {
                self.countdown -= dt;
                if self.countdown <= 0.0 {
                    self.begin_wave(self.wave_index + 1);
                }
            }
            WaveSystemState::WaveInProgress => self.drive_wave(dt, spawner),
            WaveSystemState::Idle | WaveSystemState::LevelComplete => {}
        }

        if self.policy.stats_interval > 0.0 && self.state.is_active() {
            self.stats_timer += dt;
            if self.stats_timer >= self.policy.stats_interval {
                self.stats_timer = 0.0;
                self.events.send(WaveEvent::Statistics(self.statistics()));
            }
        }
    }

    /// Record the death of a spawned entity. Returns false for unknown ids.
    pub fn notify_entity_died(&mut self, id: EntityId) -> bool {
        if !self.alive.remove(&id) {
            return false;
        }
        self.entities_killed += 1;
        self.events.send(WaveEvent::EntityDied { id });

        let completed = match self.current.as_mut() {
            Some(wave) => wave.record_death(id) && wave.status() == WaveStatus::Complete,
            None => false,
        };
        if completed && self.state == WaveSystemState::WaveInProgress {
            self.on_wave_complete();
        }
        true
    }

    /// Halt the level immediately. No further events fire for it.
    ///
    /// Returns every live entity so the caller can release it.
    pub fn stop(&mut self) -> Vec<EntityId> {
        if let Some(wave) = self.current.as_mut() {
            wave.cancel();
        }
        if let Some(level) = &self.level {
            log::info!("Level '{}' stopped", level.name);
        }
        self.current = None;
        self.level = None;
        self.waves.clear();
        self.state = WaveSystemState::Idle;
        std::mem::take(&mut self.alive).into_iter().collect()
    }

    fn begin_wave(&mut self, index: usize) {
        let Some(config) = self.waves.get(index).cloned() else {
            self.finish_level();
            return;
        };

        let mut wave = WaveState::new(config, index, self.events.sender());
        if let Err(e) = wave.start() {
            // Levels are validated on start, so this only happens for hand-built runners
            log::error!("Wave {} failed to start: {}", index, e);
            self.stop();
            return;
        }
        self.wave_index = index;
        self.current = Some(wave);
        self.set_state(WaveSystemState::WaveInProgress);
    }

    fn drive_wave<S: EntitySpawner + ?Sized>(&mut self, dt: f32, spawner: &mut S) {
        let Some(level) = self.level.clone() else {
            return;
        };
        let Some(wave) = self.current.as_mut() else {
            return;
        };

        wave.tick(dt);
        for (group, count) in wave.ready_groups() {
            let kind = wave.config().groups[group].kind;
            let mut ids = Vec::with_capacity(count as usize);
            for (direction, share) in level.distribute(count) {
                if share == 0 {
                    continue;
                }
                let spawned = spawner.spawn_batch(kind, direction, share);
                if spawned.is_empty() {
                    log::warn!("Spawner produced nothing at {}, retrying next interval", direction);
                    continue;
                }
                log::debug!("Spawned {} entities at {}", spawned.len(), direction);
                self.events.send(WaveEvent::DirectionBatchSpawned {
                    direction,
                    count: spawned.len() as u32,
                });
                ids.extend(spawned);
            }

            let recorded = wave.record_spawn(group, &ids) as usize;
            self.entities_spawned += recorded as u32;
            self.alive.extend(ids.iter().take(recorded).copied());
        }

        if self.policy.advance_on_spawn_complete && wave.status() == WaveStatus::SpawnComplete {
            wave.force_complete();
        }
        if wave.status() == WaveStatus::Complete {
            self.on_wave_complete();
        }
    }

    fn on_wave_complete(&mut self) {
        if self.wave_index + 1 < self.waves.len() {
            self.countdown = self
                .level
                .as_ref()
                .map_or(0.0, |level| level.interval_between_waves);
            self.set_state(WaveSystemState::WaitingBetweenWaves);
        } else {
            self.finish_level();
        }
    }

    fn finish_level(&mut self) {
        self.set_state(WaveSystemState::LevelComplete);
        if let Some(level) = &self.level {
            log::info!(
                "Level '{}' complete: {} spawned, {} killed in {:.1}s",
                level.name,
                self.entities_spawned,
                self.entities_killed,
                self.elapsed
            );
            self.events.send(WaveEvent::LevelCompleted {
                name: level.name.clone(),
            });
        }
        self.events.send(WaveEvent::Statistics(self.statistics()));
    }

    fn set_state(&mut self, state: WaveSystemState) {
        if state == self.state {
            return;
        }
        log::debug!("Wave system: {:?} -> {:?}", self.state, state);
        self.events.send(WaveEvent::SystemStateChanged {
            from: self.state,
            to: state,
        });
        self.state = state;
    }

    pub fn statistics(&self) -> WaveStatistics {
        WaveStatistics {
            current_wave_index: self.wave_index,
            total_waves: self.waves.len(),
            entities_spawned: self.entities_spawned,
            entities_alive: self.alive.len() as u32,
            entities_killed: self.entities_killed,
            time_elapsed: self.elapsed,
            system_state: self.state,
        }
    }

    pub fn state(&self) -> WaveSystemState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn policy(&self) -> &WavePolicy {
        &self.policy
    }

    pub fn level(&self) -> Option<&LevelConfig> {
        self.level.as_deref()
    }

    pub fn current_wave(&self) -> Option<&WaveState> {
        self.current.as_ref()
    }

    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    /// Take every pending event in emission order
    pub fn drain_events(&self) -> Vec<WaveEvent> {
        self.events.drain()
    }
}

impl Default for LevelRunner {
    fn default() -> Self {
        Self::new(WavePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnGroupConfig;
    use horde_core::IdAllocator;
    use SpawnDirection::*;

    /// Spawner that records every call
    #[derive(Default)]
    struct Recorder {
        ids: IdAllocator,
        calls: Vec<(u8, SpawnDirection, u32)>,
        spawned: Vec<EntityId>,
    }

    impl EntitySpawner for Recorder {
        fn spawn_batch(&mut self, kind: u8, direction: SpawnDirection, count: u32) -> Vec<EntityId> {
            self.calls.push((kind, direction, count));
            let ids: Vec<EntityId> = (0..count).map(|_| self.ids.allocate()).collect();
            self.spawned.extend(&ids);
            ids
        }
    }

    fn policy() -> WavePolicy {
        WavePolicy {
            advance_on_spawn_complete: false,
            start_delay: 1.0,
            stats_interval: 0.0,
        }
    }

    fn two_wave_level() -> LevelConfig {
        LevelConfig::new("Test")
            .with_interval(2.0)
            .with_wave(WaveConfig::new("A").with_group(SpawnGroupConfig::new(0, 2, 2, 0.0)))
            .with_wave(WaveConfig::new("B").with_group(SpawnGroupConfig::new(1, 3, 3, 0.0)))
    }

    fn kill_all(runner: &mut LevelRunner, spawner: &mut Recorder) {
        for id in std::mem::take(&mut spawner.spawned) {
            runner.notify_entity_died(id);
        }
    }

    #[test]
    fn test_level_plays_waves_in_order() {
        let mut runner = LevelRunner::new(policy());
        let mut spawner = Recorder::default();
        runner.start_level(two_wave_level(), SpawnDirections::all()).unwrap();
        assert_eq!(runner.state(), WaveSystemState::PreparingLevel);

        runner.tick(0.5, &mut spawner);
        assert_eq!(runner.state(), WaveSystemState::PreparingLevel);
        runner.tick(0.5, &mut spawner);
        assert_eq!(runner.state(), WaveSystemState::WaveInProgress);
        assert!(spawner.calls.is_empty());

        runner.tick(0.5, &mut spawner);
        assert_eq!(spawner.calls, vec![(0, North, 1), (0, South, 1)]);
        assert_eq!(runner.current_wave().map(WaveState::status), Some(WaveStatus::SpawnComplete));

        kill_all(&mut runner, &mut spawner);
        assert_eq!(runner.state(), WaveSystemState::WaitingBetweenWaves);

        runner.tick(1.0, &mut spawner);
        assert_eq!(runner.state(), WaveSystemState::WaitingBetweenWaves);
        runner.tick(1.0, &mut spawner);
        assert_eq!(runner.state(), WaveSystemState::WaveInProgress);
        assert_eq!(runner.current_wave().map(WaveState::index), Some(1));

        runner.tick(0.1, &mut spawner);
        assert_eq!(&spawner.calls[2..], &[(1, North, 2), (1, South, 1)]);
        kill_all(&mut runner, &mut spawner);
        assert_eq!(runner.state(), WaveSystemState::LevelComplete);

        let stats = runner.statistics();
        assert_eq!(stats.entities_spawned, 5);
        assert_eq!(stats.entities_killed, 5);
        assert_eq!(stats.entities_alive, 0);

        let events = runner.drain_events();
        let order: Vec<&WaveEvent> = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    WaveEvent::WaveStarted { .. } | WaveEvent::WaveCompleted { .. } | WaveEvent::LevelCompleted { .. }
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![
                &WaveEvent::WaveStarted { index: 0, name: "A".into() },
                &WaveEvent::WaveCompleted { wave: 0 },
                &WaveEvent::WaveStarted { index: 1, name: "B".into() },
                &WaveEvent::WaveCompleted { wave: 1 },
                &WaveEvent::LevelCompleted { name: "Test".into() },
            ]
        );
        assert_eq!(events.iter().filter(|e| matches!(e, WaveEvent::EntityDied { .. })).count(), 5);
    }

    #[test]
    fn test_force_complete_policy() {
        let mut runner = LevelRunner::new(WavePolicy {
            advance_on_spawn_complete: true,
            start_delay: 0.0,
            ..policy()
        });
        let mut spawner = Recorder::default();
        runner
            .start_level(two_wave_level().with_interval(0.0), SpawnDirections::all())
            .unwrap();

        runner.tick(0.1, &mut spawner);
        runner.tick(0.1, &mut spawner);
        assert_eq!(runner.state(), WaveSystemState::WaitingBetweenWaves);
        runner.tick(0.1, &mut spawner);
        runner.tick(0.1, &mut spawner);
        assert_eq!(runner.state(), WaveSystemState::LevelComplete);

        // Survivors of force-completed waves are still tracked
        assert_eq!(runner.statistics().entities_alive, 5);
        assert!(runner.notify_entity_died(spawner.spawned[0]));
        assert_eq!(runner.statistics().entities_killed, 1);
    }

    #[test]
    fn test_start_refusals() {
        let mut runner = LevelRunner::new(policy());

        assert!(matches!(
            runner.start_level(LevelConfig::new("Empty"), SpawnDirections::all()),
            Err(WaveError::NoWaves)
        ));
        assert_eq!(runner.state(), WaveSystemState::Idle);

        let only_north = SpawnDirections::NONE.with(North);
        assert!(matches!(
            runner.start_level(two_wave_level(), only_north),
            Err(WaveError::MissingSpawnPoint(South))
        ));
        assert!(runner.drain_events().is_empty());

        runner.start_level(two_wave_level(), SpawnDirections::all()).unwrap();
        assert!(matches!(
            runner.start_level(two_wave_level(), SpawnDirections::all()),
            Err(WaveError::LevelActive)
        ));
    }

    #[test]
    fn test_stop_releases_and_silences() {
        let mut runner = LevelRunner::new(WavePolicy {
            start_delay: 0.0,
            ..policy()
        });
        let mut spawner = Recorder::default();
        runner.start_level(two_wave_level(), SpawnDirections::all()).unwrap();
        runner.tick(0.1, &mut spawner);
        runner.tick(0.1, &mut spawner);
        runner.drain_events();

        let released = runner.stop();
        assert_eq!(released.len(), 2);
        assert_eq!(runner.state(), WaveSystemState::Idle);

        runner.tick(5.0, &mut spawner);
        assert!(!runner.notify_entity_died(released[0]));
        assert!(runner.drain_events().is_empty());
        assert_eq!(spawner.calls.len(), 2);
    }

    #[test]
    fn test_statistics_interval() {
        let mut runner = LevelRunner::new(WavePolicy {
            stats_interval: 1.0,
            ..policy()
        });
        let mut spawner = |_: u8, _: SpawnDirection, _: u32| -> Vec<EntityId> { Vec::new() };
        runner.start_level(two_wave_level(), SpawnDirections::all()).unwrap();

        for _ in 0..10 {
            runner.tick(0.25, &mut spawner);
        }
        let stats: Vec<WaveStatistics> = runner
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                WaveEvent::Statistics(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].total_waves, 2);
        assert_eq!(stats[1].time_elapsed, 2.0);
        assert_eq!(stats[1].system_state, WaveSystemState::WaveInProgress);
    }
}
