//! Simulation World
//!
//! `SimWorld` owns every agent together with the flock coordinator, the level
//! runner and the render grouping, and mediates between them. Agents,
//! coordinator and runner never reference each other; the world drains their
//! events once per frame and forwards the consequences.
//!
//! Frame order:
//!
//! 1. Level runner (spawns new batches)
//! 2. Flock coordinator (fixed cadence)
//! 3. Agent state machines
//! 4. Melee hit resolution
//! 5. Health, agent and wave event mediation
//! 6. Removal of dead agents

use crate::config::{CombatConfig, SimConfig};
use crate::effects::RagdollPool;
use glam::Vec3;
use horde_ai::{
    Agent, AgentCapabilities, AgentConfig, AgentEvent, AgentSpawn, AgentState, DirectNavigator, EffectPool,
    FlockConfig, FlockCoordinator, FlockHost, FlockInputs, FlockSample, MovingTarget, StaticTarget, TargetHandle,
    TargetProvider, TickContext,
};
use horde_combat::{
    DamageInfo, Damageable, Health, HealthEvent, HitDetector, MeleeHitTrigger, SharedDamageable, SharedHitDetector,
};
use horde_core::{Aabb, EntityId, IdAllocator, Pose, SimClock};
use horde_event::{EventChannel, EventSender, Observers, SubscriberId};
use horde_render::{DrawBatch, RenderGrouper, RenderInput, RenderStats};
use horde_waves::{
    EntitySpawner, LevelConfig, LevelRunner, SpawnDirection, SpawnPlacer, WaveError, WaveEvent, WaveStatistics,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Player entity index
const PLAYER_INDEX: u32 = u32::MAX;
/// Facility entity index
const FACILITY_INDEX: u32 = u32::MAX - 1;

/// Notifications published to world subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Wave(WaveEvent),
    Agent(AgentEvent),
    /// The player's health ran out
    PlayerDied,
    /// The last level of the campaign completed
    CampaignCompleted,
}

/// Snapshot of the whole world
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimStats {
    pub frame: u64,
    pub time: f64,
    pub agents: usize,
    pub chasing: usize,
    pub attacking: usize,
    pub flock_members: usize,
    pub flock_batches: u64,
    pub ragdolls: usize,
    pub player_health: f32,
    /// Index of the running campaign level
    pub level_index: usize,
    pub waves: WaveStatistics,
    pub render: RenderStats,
}

/// One live agent and the capabilities the world keeps strong handles to
struct AgentSlot {
    agent: Agent,
    health: Arc<Mutex<Health>>,
    hit: Arc<Mutex<MeleeHitTrigger>>,
}

impl AgentSlot {
    fn render_input(&self) -> RenderInput {
        RenderInput::new(
            self.agent.id(),
            self.agent.kind(),
            self.agent.current_state(),
            *self.agent.pose(),
        )
    }
}

/// Shared pieces every new agent is built from
struct AgentKit {
    agent_config: Arc<AgentConfig>,
    flock_config: Arc<FlockConfig>,
    combat: CombatConfig,
    walkable: Aabb,
    player: TargetHandle,
    facility: TargetHandle,
    effects: Arc<RagdollPool>,
    health_events: EventSender<HealthEvent>,
    spawn_areas: BTreeMap<SpawnDirection, Aabb>,
}

/// Borrowed view of the world used by the level runner to spawn batches
struct BatchSpawner<'a> {
    kit: &'a AgentKit,
    ids: &'a mut IdAllocator,
    agents: &'a mut BTreeMap<EntityId, AgentSlot>,
    placer: &'a mut SpawnPlacer,
    render: &'a mut RenderGrouper,
    now: f64,
}

impl BatchSpawner<'_> {
    fn spawn_agent(&mut self, kind: u8, position: Vec3) -> EntityId {
        let kit = self.kit;
        let id = self.ids.allocate();

        let health = Arc::new(Mutex::new(
            Health::new(id, kit.combat.agent_health)
                .with_absorption(kit.combat.agent_absorption)
                .with_events(kit.health_events.clone()),
        ));
        let hit = Arc::new(Mutex::new(MeleeHitTrigger::new(id).with_damage(kit.combat.melee_damage)));
        let shared_health: SharedDamageable = health.clone();
        let shared_hit: SharedHitDetector = hit.clone();
        let effects: Arc<dyn EffectPool> = kit.effects.clone();

        let mut pose = Pose::from_position(position);
        pose.face_towards(kit.player.position());

        let agent = Agent::new(
            AgentSpawn {
                id,
                kind,
                pose,
                target: Arc::downgrade(&kit.player),
                facility: Arc::downgrade(&kit.facility),
                config: kit.agent_config.clone(),
                flock_config: kit.flock_config.clone(),
                now: self.now,
            },
            AgentCapabilities {
                navigator: Box::new(DirectNavigator::new(kit.agent_config.move_speed).with_walkable(kit.walkable)),
                hit_detector: shared_hit,
                health: Arc::downgrade(&shared_health),
                effects,
            },
        );

        self.agents.insert(id, AgentSlot { agent, health, hit });
        id
    }
}

impl EntitySpawner for BatchSpawner<'_> {
    fn spawn_batch(&mut self, kind: u8, direction: SpawnDirection, count: u32) -> Vec<EntityId> {
        let Some(area) = self.kit.spawn_areas.get(&direction).copied() else {
            log::warn!("No spawn area for {}, batch of {} dropped", direction, count);
            return Vec::new();
        };

        let spawned: Vec<EntityId> = self
            .placer
            .positions(&area, count)
            .into_iter()
            .map(|position| self.spawn_agent(kind, position))
            .collect();
        if !spawned.is_empty() {
            self.render.mark_dirty();
        }
        spawned
    }
}

/// Flock host over the world's agents
struct AgentHost<'a>(&'a mut BTreeMap<EntityId, AgentSlot>);

impl FlockHost for AgentHost<'_> {
    fn sample(&self, id: EntityId) -> Option<FlockSample> {
        self.0
            .get(&id)
            .filter(|slot| !slot.agent.is_dead())
            .map(|slot| slot.agent.flock_sample())
    }

    fn apply(&mut self, id: EntityId, inputs: FlockInputs) -> bool {
        match self.0.get_mut(&id) {
            Some(slot) => {
                slot.agent.apply_flock(inputs);
                true
            }
            None => false,
        }
    }
}

/// Ordered list of levels played back to back
#[derive(Debug, Default)]
struct Campaign {
    levels: Vec<LevelConfig>,
    current: usize,
    running: bool,
    completed: bool,
}

/// The simulation world
pub struct SimWorld {
    config: SimConfig,
    kit: AgentKit,
    clock: SimClock,
    ids: IdAllocator,
    agents: BTreeMap<EntityId, AgentSlot>,
    flock: FlockCoordinator,
    flock_batches: u64,
    runner: LevelRunner,
    campaign: Campaign,
    placer: SpawnPlacer,
    render: RenderGrouper,

    player: Arc<MovingTarget>,
    player_health: Arc<Mutex<Health>>,
    player_dead: bool,
    facility: Arc<StaticTarget>,
    effects: Arc<RagdollPool>,

    health_events: EventChannel<HealthEvent>,
    observers: Observers<SimEvent>,
}

impl SimWorld {
    /// Build a world from configuration. No level runs until
    /// [`start_campaign`](Self::start_campaign) is called.
    pub fn new(config: SimConfig) -> Self {
        let agent_config = Arc::new(config.agent.clone().normalized());
        let flock_config = Arc::new(config.flock.clone().normalized());
        let health_events = EventChannel::new();

        let player_id = EntityId::new(PLAYER_INDEX, 0);
        let player_health = Arc::new(Mutex::new(
            Health::new(player_id, config.combat.player_health).with_events(health_events.sender()),
        ));
        let shared_player_health: SharedDamageable = player_health.clone();
        let player = Arc::new(
            MovingTarget::new(player_id, config.arena.player_position)
                .with_half_extents(config.arena.player_half_extents)
                .with_health(&shared_player_health),
        );
        let facility = Arc::new(StaticTarget::new(
            EntityId::new(FACILITY_INDEX, 0),
            config.arena.facility,
        ));
        let effects = Arc::new(RagdollPool::new(config.combat.max_ragdolls));

        let player_handle: TargetHandle = player.clone();
        let facility_handle: TargetHandle = facility.clone();
        let kit = AgentKit {
            agent_config,
            flock_config: flock_config.clone(),
            combat: config.combat.clone(),
            walkable: config.arena.walkable,
            player: player_handle,
            facility: facility_handle,
            effects: effects.clone(),
            health_events: health_events.sender(),
            spawn_areas: config.spawn_points.iter().map(|p| (p.direction, p.area)).collect(),
        };

        Self {
            kit,
            clock: SimClock::new(),
            ids: IdAllocator::new(),
            agents: BTreeMap::new(),
            flock: FlockCoordinator::new(&flock_config),
            flock_batches: 0,
            runner: LevelRunner::new(config.waves.clone()),
            campaign: Campaign {
                levels: config.levels.clone(),
                ..Default::default()
            },
            placer: SpawnPlacer::new(config.spawn.clone()),
            render: RenderGrouper::new(),
            player,
            player_health,
            player_dead: false,
            facility,
            effects,
            health_events,
            observers: Observers::new(),
            config,
        }
    }

    /// Start the first level of the campaign
    pub fn start_campaign(&mut self) -> Result<(), WaveError> {
        if self.runner.is_active() {
            return Err(WaveError::LevelActive);
        }
        self.config.validate()?;
        let Some(first) = self.campaign.levels.first().cloned() else {
            log::warn!("Campaign has no levels");
            return Err(WaveError::NoWaves);
        };

        self.runner.start_level(first, self.config.available_directions())?;
        self.campaign.current = 0;
        self.campaign.running = true;
        self.campaign.completed = false;
        self.forward_wave_events();
        Ok(())
    }

    /// Stop the campaign and remove every agent
    pub fn stop(&mut self) {
        let tracked = self.runner.stop();
        log::info!(
            "Stopping world: {} agents removed, {} still tracked by waves",
            self.agents.len(),
            tracked.len()
        );

        for id in std::mem::take(&mut self.agents).into_keys() {
            self.flock.unregister(id);
            self.ids.release(id);
        }
        self.health_events.clear();
        self.render.mark_dirty();
        self.campaign.running = false;
    }

    /// Advance the world by one frame
    pub fn tick(&mut self, dt: f32) {
        self.clock.advance(dt);
        let now = self.clock.now();

        let mut spawner = BatchSpawner {
            kit: &self.kit,
            ids: &mut self.ids,
            agents: &mut self.agents,
            placer: &mut self.placer,
            render: &mut self.render,
            now,
        };
        self.runner.tick(dt, &mut spawner);

        if let Some(report) = self.flock.tick(dt, &mut AgentHost(&mut self.agents)) {
            self.flock_batches += 1;
            if report.skipped > 0 {
                log::debug!(
                    "Flock batch {}: {} delivered, {} skipped",
                    report.sequence,
                    report.delivered,
                    report.skipped
                );
            }
        }

        let ctx = TickContext { dt, now };
        for slot in self.agents.values_mut() {
            slot.agent.tick(&ctx);
        }

        self.resolve_hits();
        self.settle();
    }

    /// Damage an agent from outside the swarm (turrets, player weapons).
    ///
    /// Returns false if the agent does not exist or is already dead.
    pub fn damage_agent(&mut self, id: EntityId, amount: f32, source: Option<EntityId>) -> bool {
        let Some(slot) = self.agents.get(&id) else {
            return false;
        };

        let mut info = DamageInfo::new(amount);
        if let Some(source) = source {
            info = info.with_source(source);
        }
        let applied = slot.health.lock().damage(&info);
        if applied {
            self.settle();
        }
        applied
    }

    /// Move the player
    pub fn set_player_position(&self, position: Vec3) {
        self.player.set_position(position);
    }

    /// Register a handler for world notifications
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&SimEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Draw calls for the current frame
    pub fn render_batches(&mut self) -> Vec<DrawBatch> {
        if self.render.is_dirty() {
            self.render.rebuild(self.agents.values().map(AgentSlot::render_input));
        }
        let agents = &self.agents;
        self.render
            .batches(|id| agents.get(&id).map(AgentSlot::render_input))
    }

    pub fn statistics(&self) -> SimStats {
        let count = |state: AgentState| {
            self.agents
                .values()
                .filter(|slot| slot.agent.current_state() == state)
                .count()
        };
        SimStats {
            frame: self.clock.frame(),
            time: self.clock.now(),
            agents: self.agents.len(),
            chasing: count(AgentState::Chase),
            attacking: count(AgentState::Attack),
            flock_members: self.flock.len(),
            flock_batches: self.flock_batches,
            ragdolls: self.effects.live_count(),
            player_health: self.player_health.lock().current,
            level_index: self.campaign.current,
            waves: self.runner.statistics(),
            render: *self.render.stats(),
        }
    }

    /// Live agents in id order
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().map(|slot| &slot.agent)
    }

    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agents.get(&id).map(|slot| &slot.agent)
    }

    /// Remaining health of an agent
    pub fn agent_health(&self, id: EntityId) -> Option<f32> {
        self.agents.get(&id).map(|slot| slot.health.lock().current)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn player(&self) -> &Arc<MovingTarget> {
        &self.player
    }

    pub fn player_health(&self) -> f32 {
        self.player_health.lock().current
    }

    pub fn facility(&self) -> &Arc<StaticTarget> {
        &self.facility
    }

    pub fn flock(&self) -> &FlockCoordinator {
        &self.flock
    }

    pub fn runner(&self) -> &LevelRunner {
        &self.runner
    }

    pub fn effects(&self) -> &RagdollPool {
        &self.effects
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Virtual time in seconds
    pub fn time(&self) -> f64 {
        self.clock.now()
    }

    pub fn campaign_complete(&self) -> bool {
        self.campaign.completed
    }

    /// Apply armed melee hits to the targets they overlap
    fn resolve_hits(&mut self) {
        let reach = self.kit.agent_config.attack_exit_radius;
        for slot in self.agents.values() {
            if slot.agent.current_state() != AgentState::Attack {
                continue;
            }
            let mut hit = slot.hit.lock();
            if !hit.is_active() || hit.has_applied() {
                continue;
            }
            let Some(target) = slot.agent.target() else {
                continue;
            };
            let Some(victim) = target.damageable() else {
                continue;
            };

            let position = slot.agent.position();
            let closest = target.closest_point(position);
            if position.distance_squared(closest) > reach * reach {
                continue;
            }
            let normal = (position - closest).normalize_or_zero();
            let mut body = victim.lock();
            hit.try_apply(&mut *body, closest, normal);
        }
    }

    /// Mediate everything the last changes produced
    fn settle(&mut self) {
        self.process_health_events();
        let dead = self.process_agent_events();
        for id in dead {
            if self.agents.remove(&id).is_some() {
                self.ids.release(id);
            }
        }
        self.forward_wave_events();
    }

    fn process_health_events(&mut self) {
        let player_id = self.player.id();
        for event in self.health_events.drain() {
            match event {
                HealthEvent::Damaged { entity, source, .. } if entity == player_id => {
                    log::debug!("Player hit by {:?}, {} left", source, self.player_health.lock().current);
                }
                HealthEvent::Died { entity, .. } if entity == player_id => {
                    if !self.player_dead {
                        self.player_dead = true;
                        log::info!("Player died");
                        self.observers.notify(&SimEvent::PlayerDied);
                    }
                }
                HealthEvent::Damaged { entity, source, .. } => {
                    let attacker = source.and_then(|id| self.target_for(id));
                    if let Some(slot) = self.agents.get_mut(&entity) {
                        slot.agent.notify_damaged(attacker.as_ref());
                    }
                }
                HealthEvent::Died { entity, .. } => {
                    if let Some(slot) = self.agents.get_mut(&entity) {
                        slot.agent.notify_death();
                    }
                }
            }
        }
    }

    /// Returns the agents that died
    fn process_agent_events(&mut self) -> Vec<EntityId> {
        let mut events = Vec::new();
        for slot in self.agents.values_mut() {
            events.extend(slot.agent.drain_events());
        }

        let mut dead = Vec::new();
        for event in events {
            match &event {
                AgentEvent::JoinedFlock(id) => self.flock.register(*id),
                AgentEvent::LeftFlock(id) => self.flock.unregister(*id),
                AgentEvent::StateChanged { .. } => self.render.mark_dirty(),
                AgentEvent::Died(id) => {
                    self.runner.notify_entity_died(*id);
                    self.render.mark_dirty();
                    dead.push(*id);
                }
                AgentEvent::Animation { .. } | AgentEvent::EffectSpawned { .. } => {}
            }
            self.observers.notify(&SimEvent::Agent(event));
        }
        dead
    }

    fn forward_wave_events(&mut self) {
        let mut level_done = false;
        for event in self.runner.drain_events() {
            if matches!(event, WaveEvent::LevelCompleted { .. }) {
                level_done = true;
            }
            self.observers.notify(&SimEvent::Wave(event));
        }
        if level_done && self.campaign.running {
            self.advance_campaign();
        }
    }

    fn advance_campaign(&mut self) {
        let next = self.campaign.current + 1;
        let Some(level) = self.campaign.levels.get(next).cloned() else {
            log::info!("Campaign complete after {} levels", self.campaign.levels.len());
            self.campaign.running = false;
            self.campaign.completed = true;
            self.observers.notify(&SimEvent::CampaignCompleted);
            return;
        };

        let survivors = self.runner.statistics().entities_alive;
        if survivors > 0 {
            log::debug!("{} survivors carried into the next level untracked", survivors);
        }
        match self.runner.start_level(level, self.config.available_directions()) {
            Ok(()) => {
                self.campaign.current = next;
                self.forward_wave_events();
            }
            Err(e) => {
                log::error!("Could not start level {}: {}", next, e);
                self.campaign.running = false;
            }
        }
    }

    /// Pursuit handle for an entity that dealt damage
    fn target_for(&self, id: EntityId) -> Option<TargetHandle> {
        (id == self.player.id()).then(|| self.kit.player.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_waves::{SpawnConfig, SpawnGroupConfig, WaveConfig};

    fn small_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.spawn = SpawnConfig {
            seed: Some(7),
            ..Default::default()
        };
        config.flock.parallel = false;
        config.levels = vec![LevelConfig::new("Test")
            .with_interval(0.5)
            .with_wave(WaveConfig::new("Only").with_group(SpawnGroupConfig::new(0, 4, 2, 0.5)))];
        config
    }

    #[test]
    fn test_spawns_into_areas() {
        let mut world = SimWorld::new(small_config());
        world.start_campaign().unwrap();
        for _ in 0..120 {
            world.tick(1.0 / 60.0);
        }

        assert!(world.agent_count() > 0);
        assert_eq!(world.agent_count(), world.runner().statistics().entities_alive as usize);
        for agent in world.agents() {
            assert_eq!(agent.current_state(), AgentState::Chase);
        }
    }

    #[test]
    fn test_second_start_refused() {
        let mut world = SimWorld::new(small_config());
        world.start_campaign().unwrap();
        assert!(matches!(world.start_campaign(), Err(WaveError::LevelActive)));
    }

    #[test]
    fn test_empty_campaign() {
        let mut config = small_config();
        config.levels.clear();
        let mut world = SimWorld::new(config);
        assert!(world.start_campaign().is_err());
    }

    #[test]
    fn test_unbounded_spawn_area_refuses_start() {
        let mut config = small_config();
        for point in &mut config.spawn_points {
            point.area.max.x = f32::INFINITY;
        }
        let mut world = SimWorld::new(config);
        assert!(matches!(world.start_campaign(), Err(WaveError::InvalidSpawnArea(_))));
        assert!(!world.runner().is_active());

        world.tick(1.0 / 60.0);
        assert_eq!(world.agent_count(), 0);
    }

    #[test]
    fn test_damage_unknown_agent() {
        let mut world = SimWorld::new(small_config());
        assert!(!world.damage_agent(EntityId::new(3, 0), 10.0, None));
    }
}
