//! Swarm agent state machine
//!
//! An agent chases its target with the flock, attacks once in reach and dies
//! when its health runs out. States are a closed enum; every transition goes
//! through [`Agent::transition`], which runs the exit actions of the old
//! state and the enter actions of the new one.
//!
//! Agents never touch the flock coordinator or the population tracker.
//! Membership and death are reported as [`AgentEvent`]s that the owning
//! world drains after each tick.

use crate::capability::{AnimationCue, EffectHandle, EffectPool, Navigator, PrefabKind};
use crate::config::{AgentConfig, FlockConfig};
use crate::flock::FlockSample;
use crate::state::AgentState;
use crate::steering::{steer, FlockInputs, SteeringMemory, StuckDetector};
use crate::target::{TargetHandle, WeakTarget};
use glam::Vec3;
use horde_combat::{SharedHitDetector, WeakDamageable};
use horde_core::{EntityId, Pose};
use std::sync::{Arc, Weak};

/// Timing for one agent tick
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    /// Frame time in seconds
    pub dt: f32,
    /// Virtual time at the end of this frame
    pub now: f64,
}

/// Notifications produced by an agent
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StateChanged {
        agent: EntityId,
        from: AgentState,
        to: AgentState,
    },
    /// The agent wants to be a flock member
    JoinedFlock(EntityId),
    /// The agent no longer flocks
    LeftFlock(EntityId),
    Animation {
        agent: EntityId,
        cue: AnimationCue,
    },
    /// A pooled effect was spawned for the agent
    EffectSpawned {
        agent: EntityId,
        handle: EffectHandle,
    },
    /// The agent died. Emitted once.
    Died(EntityId),
}

/// Capability handles injected at construction
pub struct AgentCapabilities {
    pub navigator: Box<dyn Navigator>,
    pub hit_detector: SharedHitDetector,
    pub health: WeakDamageable,
    pub effects: Arc<dyn EffectPool>,
}

/// Everything needed to bring an agent to life
pub struct AgentSpawn {
    pub id: EntityId,
    pub kind: u8,
    pub pose: Pose,
    /// Entity to pursue
    pub target: WeakTarget,
    /// Fallback when the target dies or disappears
    pub facility: WeakTarget,
    pub config: Arc<AgentConfig>,
    pub flock_config: Arc<FlockConfig>,
    /// Virtual time of the spawn
    pub now: f64,
}

/// A swarm agent
pub struct Agent {
    id: EntityId,
    kind: u8,
    pose: Pose,

    state: AgentState,
    state_entered_at: f64,
    now: f64,
    attack_timer: f32,
    nav_timer: f32,
    /// Hit detector already armed during the current attack cycle
    swing_armed: bool,
    seek_pending: bool,
    attack_cycles: u32,

    flock: FlockInputs,
    flock_fresh: bool,
    steering: SteeringMemory,
    stuck: StuckDetector,

    target: WeakTarget,
    facility: WeakTarget,
    last_known_target: Option<Vec3>,

    caps: AgentCapabilities,
    config: Arc<AgentConfig>,
    flock_config: Arc<FlockConfig>,
    events: Vec<AgentEvent>,
}

impl Agent {
    /// Create an agent. It starts chasing immediately.
    pub fn new(spawn: AgentSpawn, caps: AgentCapabilities) -> Self {
        let mut agent = Self {
            id: spawn.id,
            kind: spawn.kind,
            pose: spawn.pose,
            state: AgentState::Chase,
            state_entered_at: spawn.now,
            now: spawn.now,
            attack_timer: 0.0,
            nav_timer: 0.0,
            swing_armed: false,
            seek_pending: false,
            attack_cycles: 0,
            flock: FlockInputs::default(),
            flock_fresh: false,
            steering: SteeringMemory::default(),
            stuck: StuckDetector::default(),
            target: spawn.target,
            facility: spawn.facility,
            last_known_target: None,
            caps,
            config: spawn.config,
            flock_config: spawn.flock_config,
            events: Vec::new(),
        };
        agent.enter_state(AgentState::Chase);
        agent
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Visual kind
    pub fn kind(&self) -> u8 {
        self.kind
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn current_state(&self) -> AgentState {
        self.state
    }

    /// Virtual time the current state was entered
    pub fn state_entered_at(&self) -> f64 {
        self.state_entered_at
    }

    /// Latest flock influences
    pub fn flock_inputs(&self) -> &FlockInputs {
        &self.flock
    }

    /// Attack cycles completed since spawning
    pub fn attack_cycles(&self) -> u32 {
        self.attack_cycles
    }

    /// Currently pursued target, if it still exists
    pub fn target(&self) -> Option<TargetHandle> {
        self.target.upgrade()
    }

    pub fn hit_detector(&self) -> &SharedHitDetector {
        &self.caps.hit_detector
    }

    pub fn is_dead(&self) -> bool {
        self.state == AgentState::Death
    }

    /// Snapshot for the flock kernel
    pub fn flock_sample(&self) -> FlockSample {
        FlockSample {
            position: self.pose.position,
            velocity: self.caps.navigator.velocity(),
        }
    }

    /// Take queued notifications
    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.events)
    }

    /// Store flock results. Ignored outside the flocking state.
    pub fn apply_flock(&mut self, inputs: FlockInputs) {
        if self.state.is_flocking() {
            self.flock = inputs;
            self.flock_fresh = true;
        }
    }

    /// Advance the state machine by one frame
    pub fn tick(&mut self, ctx: &TickContext) {
        if self.state.is_terminal() {
            return;
        }
        self.now = ctx.now;

        if self.health_depleted() {
            self.transition(AgentState::Death);
            return;
        }

        match self.state {
            AgentState::Chase => self.tick_chase(ctx.dt),
            AgentState::Attack => self.tick_attack(ctx.dt),
            AgentState::Death => {}
        }
    }

    /// React to taking damage from `source`.
    ///
    /// A living agent switches to a new attacker and chases it. Damage from
    /// the current target changes nothing.
    pub fn notify_damaged(&mut self, source: Option<&TargetHandle>) {
        if self.state.is_terminal() {
            return;
        }
        if self.health_depleted() {
            self.transition(AgentState::Death);
            return;
        }
        let Some(source) = source else {
            return;
        };
        if self.target.upgrade().is_some_and(|t| Arc::ptr_eq(&t, source)) {
            return;
        }

        log::debug!("{} retargets to {}", self.id, source.id());
        self.target = Arc::downgrade(source);
        match self.state {
            AgentState::Chase => self.seek_pending = true,
            AgentState::Attack => self.transition(AgentState::Chase),
            AgentState::Death => {}
        }
    }

    /// Health ran out. Returns true if this call killed the agent.
    pub fn notify_death(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.transition(AgentState::Death);
        true
    }

    fn health_depleted(&self) -> bool {
        self.caps
            .health
            .upgrade()
            .is_some_and(|health| health.lock().is_dead())
    }

    /// Resolve the pursued target, falling back to the facility.
    fn resolve_target(&mut self) -> Option<TargetHandle> {
        if let Some(target) = self.target.upgrade() {
            if !target.is_dead() {
                self.last_known_target = Some(target.position());
                return Some(target);
            }
        }

        let facility = self.facility.upgrade().filter(|f| !f.is_dead())?;
        if !Weak::ptr_eq(&self.target, &self.facility) {
            log::debug!("{} lost its target, heading for {}", self.id, facility.id());
            self.target = self.facility.clone();
            self.seek_pending = true;
        }
        self.last_known_target = Some(facility.position());
        Some(facility)
    }

    fn tick_chase(&mut self, dt: f32) {
        let target = self.resolve_target();
        let Some(goal) = target.as_ref().map(|t| t.position()).or(self.last_known_target) else {
            self.flock_fresh = false;
            self.move_agent(dt);
            return;
        };

        self.nav_timer += dt;
        if self.seek_pending {
            self.seek(goal);
        } else if self.flock_fresh {
            let decision = steer(
                self.pose.position,
                goal,
                &self.flock,
                &self.flock_config,
                &mut self.steering,
            );
            if let Some(destination) = decision.destination {
                self.seek(destination);
            }
        }
        if self.nav_timer >= self.config.nav_repath_interval {
            self.seek(goal);
        }
        self.flock_fresh = false;

        let flat_distance = Vec3::new(goal.x - self.pose.position.x, 0.0, goal.z - self.pose.position.z).length();
        let speed = self.caps.navigator.velocity().length();
        let remaining = self.caps.navigator.remaining_distance();
        if self.stuck.update(dt, speed, remaining, flat_distance, &self.flock_config) {
            log::debug!("{} is stuck, re-seeking its target", self.id);
            self.steering.reset();
            self.seek(goal);
        }

        self.move_agent(dt);

        if let Some(target) = target {
            let closest = target.closest_point(self.pose.position);
            let reach = self.config.attack_enter_radius;
            if self.pose.position.distance_squared(closest) <= reach * reach {
                self.transition(AgentState::Attack);
            }
        }
    }

    fn tick_attack(&mut self, dt: f32) {
        let before = self.target.clone();
        let Some(target) = self.resolve_target() else {
            self.transition(AgentState::Chase);
            return;
        };
        if !Weak::ptr_eq(&before, &self.target) {
            // The victim died; go after the fallback
            self.transition(AgentState::Chase);
            return;
        }

        let closest = target.closest_point(self.pose.position);
        let reach = self.config.attack_exit_radius;
        if self.pose.position.distance_squared(closest) > reach * reach {
            self.transition(AgentState::Chase);
            return;
        }

        self.advance_attack_timer(dt);
    }

    /// Run the attack cycle clock. Overshoot carries into the next cycle, so
    /// many small steps arm the detector exactly as often as one large step.
    fn advance_attack_timer(&mut self, dt: f32) {
        let arm = self.config.attack_arm_time;
        let recover = self.config.attack_recover_time;
        self.attack_timer += dt;

        loop {
            if !self.swing_armed && self.attack_timer >= arm {
                self.swing_armed = true;
                let mut hit = self.caps.hit_detector.lock();
                if !hit.is_active() && !hit.has_applied() {
                    hit.activate();
                }
            }
            if recover <= 0.0 || self.attack_timer < recover {
                break;
            }

            self.attack_timer -= recover;
            self.swing_armed = false;
            self.attack_cycles += 1;
            let mut hit = self.caps.hit_detector.lock();
            hit.reset_applied();
            hit.deactivate();
        }
    }

    fn seek(&mut self, destination: Vec3) {
        self.nav_timer = 0.0;
        self.seek_pending = false;
        if !self.caps.navigator.request_seek(destination) {
            log::debug!("{} could not seek {:?}, retrying later", self.id, destination);
        }
    }

    fn move_agent(&mut self, dt: f32) {
        let position = self.caps.navigator.step(self.pose.position, dt);
        let velocity = self.caps.navigator.velocity();
        self.pose.position = position;
        self.pose.face_direction(velocity);
    }

    fn cue(&mut self, cue: AnimationCue) {
        self.events.push(AgentEvent::Animation { agent: self.id, cue });
    }

    fn transition(&mut self, to: AgentState) {
        if self.state.is_terminal() || self.state == to {
            return;
        }
        let from = self.state;
        self.exit_state(from);
        self.state = to;
        self.state_entered_at = self.now;
        log::debug!("{} {} -> {}", self.id, from, to);
        self.events.push(AgentEvent::StateChanged {
            agent: self.id,
            from,
            to,
        });
        self.enter_state(to);
    }

    fn enter_state(&mut self, state: AgentState) {
        match state {
            AgentState::Chase => {
                self.events.push(AgentEvent::JoinedFlock(self.id));
                self.caps.navigator.set_stopped(false);
                self.cue(AnimationCue::Walk(true));
                self.seek_pending = true;
                self.nav_timer = 0.0;
            }
            AgentState::Attack => {
                self.caps.navigator.set_stopped(true);
                self.cue(AnimationCue::Walk(false));
                if let Some(target) = self.target.upgrade() {
                    self.pose.face_towards(target.closest_point(self.pose.position));
                }
                self.attack_timer = 0.0;
                self.swing_armed = false;
                {
                    let mut hit = self.caps.hit_detector.lock();
                    hit.reset_applied();
                    hit.deactivate();
                }
                self.cue(AnimationCue::Attack(true));
            }
            AgentState::Death => {
                self.caps.navigator.set_stopped(true);
                self.cue(AnimationCue::Disabled);
                let handle = self.caps.effects.spawn(
                    PrefabKind::Ragdoll {
                        agent_kind: self.kind,
                    },
                    self.pose.position,
                    self.pose.rotation,
                );
                self.caps
                    .effects
                    .apply_impulse(handle, -self.pose.forward() * self.config.ragdoll_impulse);
                self.events.push(AgentEvent::EffectSpawned {
                    agent: self.id,
                    handle,
                });
                self.events.push(AgentEvent::Died(self.id));
            }
        }
    }

    fn exit_state(&mut self, state: AgentState) {
        match state {
            AgentState::Chase => {
                self.events.push(AgentEvent::LeftFlock(self.id));
                self.flock = FlockInputs::default();
                self.flock_fresh = false;
                self.steering.reset();
                self.stuck.reset();
            }
            AgentState::Attack => {
                self.cue(AnimationCue::Attack(false));
                self.caps.hit_detector.lock().deactivate();
            }
            AgentState::Death => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::DirectNavigator;
    use crate::target::{MovingTarget, StaticTarget, TargetProvider};
    use horde_combat::{DamageInfo, Damageable, Health, HitDetector, SharedDamageable};
    use horde_core::Aabb;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct CountingHit {
        active: bool,
        applied: bool,
        activations: u32,
    }

    impl HitDetector for CountingHit {
        fn activate(&mut self) {
            self.active = true;
            self.activations += 1;
        }
        fn deactivate(&mut self) {
            self.active = false;
        }
        fn reset_applied(&mut self) {
            self.applied = false;
        }
        fn has_applied(&self) -> bool {
            self.applied
        }
        fn is_active(&self) -> bool {
            self.active
        }
    }

    #[derive(Default)]
    struct Pool {
        spawned: AtomicU64,
    }

    impl EffectPool for Pool {
        fn spawn(&self, _prefab: PrefabKind, _position: Vec3, _rotation: glam::Quat) -> EffectHandle {
            EffectHandle(self.spawned.fetch_add(1, Ordering::SeqCst))
        }
        fn recycle(&self, _handle: EffectHandle) {}
    }

    struct Rig {
        agent: Agent,
        hit: Arc<Mutex<CountingHit>>,
        health: SharedDamageable,
        pool: Arc<Pool>,
    }

    /// Navigator that never moves and records every seek request
    struct RecordingNavigator {
        seeks: Arc<Mutex<Vec<Vec3>>>,
        remaining: f32,
        stopped: bool,
    }

    impl Navigator for RecordingNavigator {
        fn request_seek(&mut self, destination: Vec3) -> bool {
            self.seeks.lock().push(destination);
            true
        }
        fn velocity(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn remaining_distance(&self) -> f32 {
            self.remaining
        }
        fn set_stopped(&mut self, stopped: bool) {
            self.stopped = stopped;
        }
        fn is_stopped(&self) -> bool {
            self.stopped
        }
        fn step(&mut self, position: Vec3, _dt: f32) -> Vec3 {
            position
        }
    }

    fn recording(remaining: f32) -> (Box<dyn Navigator>, Arc<Mutex<Vec<Vec3>>>) {
        let seeks = Arc::new(Mutex::new(Vec::new()));
        let navigator = RecordingNavigator {
            seeks: seeks.clone(),
            remaining,
            stopped: false,
        };
        (Box::new(navigator), seeks)
    }

    fn rig(position: Vec3, target: &TargetHandle, facility: Option<&TargetHandle>, config: AgentConfig) -> Rig {
        rig_with(position, target, facility, config, Box::new(DirectNavigator::new(2.0)))
    }

    fn rig_with(
        position: Vec3,
        target: &TargetHandle,
        facility: Option<&TargetHandle>,
        config: AgentConfig,
        navigator: Box<dyn Navigator>,
    ) -> Rig {
        let id = EntityId::new(1, 0);
        let hit = Arc::new(Mutex::new(CountingHit::default()));
        let health: SharedDamageable = Arc::new(Mutex::new(Health::new(id, 10.0)));
        let pool = Arc::new(Pool::default());
        let shared_hit: SharedHitDetector = hit.clone();
        let effects: Arc<dyn EffectPool> = pool.clone();
        let facility: WeakTarget = match facility {
            Some(f) => Arc::downgrade(f),
            None => Weak::<StaticTarget>::new(),
        };
        let agent = Agent::new(
            AgentSpawn {
                id,
                kind: 1,
                pose: Pose::from_position(position),
                target: Arc::downgrade(target),
                facility,
                config: Arc::new(config),
                flock_config: Arc::new(FlockConfig::default()),
                now: 0.0,
            },
            AgentCapabilities {
                navigator,
                hit_detector: shared_hit,
                health: Arc::downgrade(&health),
                effects,
            },
        );
        Rig {
            agent,
            hit,
            health,
            pool,
        }
    }

    fn point(n: u32, position: Vec3) -> TargetHandle {
        Arc::new(MovingTarget::new(EntityId::new(n, 0), position))
    }

    fn tick(agent: &mut Agent, dt: f32, now: &mut f64) {
        *now += dt as f64;
        agent.tick(&TickContext { dt, now: *now });
    }

    fn count_deaths(events: &[AgentEvent]) -> usize {
        events.iter().filter(|e| matches!(e, AgentEvent::Died(_))).count()
    }

    #[test]
    fn test_spawns_chasing_and_joins_flock() {
        let target = point(9, Vec3::new(20.0, 0.0, 0.0));
        let mut rig = rig(Vec3::ZERO, &target, None, AgentConfig::default());
        assert_eq!(rig.agent.current_state(), AgentState::Chase);

        let events = rig.agent.drain_events();
        assert!(events.contains(&AgentEvent::JoinedFlock(rig.agent.id())));

        let mut now = 0.0;
        tick(&mut rig.agent, 0.5, &mut now);
        assert_eq!(rig.agent.position(), Vec3::new(1.0, 0.0, 0.0));
        assert!(rig.agent.pose().forward().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn test_chase_to_attack_with_hysteresis() {
        let player = Arc::new(MovingTarget::new(EntityId::new(9, 0), Vec3::new(3.0, 0.0, 0.0)));
        let target: TargetHandle = player.clone();
        let mut rig = rig(Vec3::ZERO, &target, None, AgentConfig::default());
        let mut now = 0.0;

        // Walks 2 units/s toward x=3, attack starts within 1 unit
        for _ in 0..10 {
            tick(&mut rig.agent, 0.25, &mut now);
        }
        assert_eq!(rig.agent.current_state(), AgentState::Attack);
        let events = rig.agent.drain_events();
        assert!(events.contains(&AgentEvent::LeftFlock(rig.agent.id())));
        assert!(events.contains(&AgentEvent::Animation {
            agent: rig.agent.id(),
            cue: AnimationCue::Attack(true),
        }));

        // Target steps back a little: still inside the exit radius
        player.set_position(rig.agent.position() + Vec3::new(1.2, 0.0, 0.0));
        tick(&mut rig.agent, 0.1, &mut now);
        assert_eq!(rig.agent.current_state(), AgentState::Attack);

        player.set_position(rig.agent.position() + Vec3::new(1.3, 0.0, 0.0));
        tick(&mut rig.agent, 0.1, &mut now);
        assert_eq!(rig.agent.current_state(), AgentState::Chase);
        assert!(!rig.hit.lock().is_active());
    }

    #[test]
    fn test_hit_arms_once_per_cycle_under_irregular_steps() {
        let config = AgentConfig {
            attack_arm_time: 0.4,
            attack_recover_time: 1.0,
            ..Default::default()
        };
        let target = point(9, Vec3::new(0.5, 0.0, 0.0));
        let steps = [0.3, 0.05, 0.7, 0.15, 0.35, 0.2, 0.6, 0.05, 0.3, 0.3, 0.5];
        let total: f32 = steps.iter().sum();
        assert!((total - 3.5).abs() < 1e-4);

        let mut irregular = rig(Vec3::ZERO, &target, None, config.clone());
        let mut now = 0.0;
        tick(&mut irregular.agent, 0.0, &mut now);
        assert_eq!(irregular.agent.current_state(), AgentState::Attack);
        for dt in steps {
            tick(&mut irregular.agent, dt, &mut now);
        }

        let mut single = rig(Vec3::ZERO, &target, None, config);
        let mut now = 0.0;
        tick(&mut single.agent, 0.0, &mut now);
        tick(&mut single.agent, 3.5, &mut now);

        // Cycles start at 0, 1, 2 and 3 seconds; each arms at +0.4
        assert_eq!(irregular.hit.lock().activations, 4);
        assert_eq!(single.hit.lock().activations, 4);
        assert_eq!(irregular.agent.attack_cycles(), 3);
        assert_eq!(single.agent.attack_cycles(), 3);
    }

    #[test]
    fn test_applied_hit_is_not_rearmed_in_same_cycle() {
        let config = AgentConfig {
            attack_arm_time: 0.0,
            attack_recover_time: 2.0,
            ..Default::default()
        };
        let target = point(9, Vec3::new(0.5, 0.0, 0.0));
        let mut rig = rig(Vec3::ZERO, &target, None, config);
        let mut now = 0.0;
        tick(&mut rig.agent, 0.0, &mut now);
        tick(&mut rig.agent, 0.1, &mut now);
        assert_eq!(rig.hit.lock().activations, 1);

        // The detector lands its hit and switches itself off
        {
            let mut hit = rig.hit.lock();
            hit.applied = true;
            hit.active = false;
        }
        tick(&mut rig.agent, 0.5, &mut now);
        tick(&mut rig.agent, 0.5, &mut now);
        assert_eq!(rig.hit.lock().activations, 1);

        // New cycle clears the flag and arms again
        tick(&mut rig.agent, 1.0, &mut now);
        assert_eq!(rig.hit.lock().activations, 2);
        assert!(!rig.hit.lock().has_applied());
    }

    #[test]
    fn test_chase_repaths_on_interval() {
        let goal = Vec3::new(20.0, 0.0, 0.0);
        let target = point(9, goal);
        let (navigator, seeks) = recording(100.0);
        let config = AgentConfig {
            nav_repath_interval: 0.5,
            ..Default::default()
        };
        let mut rig = rig_with(Vec3::ZERO, &target, None, config, navigator);
        let mut now = 0.0;
        assert!(seeks.lock().is_empty());

        // Seek on entering Chase, then one every half second
        for _ in 0..16 {
            tick(&mut rig.agent, 0.125, &mut now);
        }
        let seeks = seeks.lock();
        assert_eq!(seeks.len(), 4);
        assert!(seeks.iter().all(|s| *s == goal));
    }

    #[test]
    fn test_stuck_agent_reseeks_goal_and_forgets_steering() {
        let goal = Vec3::new(20.0, 0.0, 0.0);
        let target = point(9, goal);
        let (navigator, seeks) = recording(0.1);
        let config = AgentConfig {
            nav_repath_interval: 100.0,
            ..Default::default()
        };
        let mut rig = rig_with(Vec3::ZERO, &target, None, config, navigator);
        let mut now = 0.0;
        let step_to = |rig: &mut Rig, now: &mut f64| {
            rig.agent.apply_flock(FlockInputs::default());
            tick(&mut rig.agent, 0.125, now);
        };

        // Initial seek, then one steering destination that is never resent
        for _ in 0..11 {
            step_to(&mut rig, &mut now);
        }
        let ahead = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(*seeks.lock(), vec![goal, ahead]);

        // Stalled for the full stuck duration: hard seek to the goal
        step_to(&mut rig, &mut now);
        assert_eq!(*seeks.lock(), vec![goal, ahead, goal]);

        // Steering memory was cleared, so the same destination goes out again
        step_to(&mut rig, &mut now);
        assert_eq!(*seeks.lock(), vec![goal, ahead, goal, ahead]);
    }

    #[test]
    fn test_death_happens_once() {
        let target = point(9, Vec3::new(20.0, 0.0, 0.0));
        let mut rig = rig(Vec3::ZERO, &target, None, AgentConfig::default());
        let mut now = 0.0;
        rig.agent.drain_events();

        for _ in 0..3 {
            rig.health.lock().damage(&DamageInfo::new(50.0));
            rig.agent.notify_damaged(None);
            rig.agent.notify_death();
            tick(&mut rig.agent, 0.1, &mut now);
        }

        let events = rig.agent.drain_events();
        assert_eq!(count_deaths(&events), 1);
        assert!(events.contains(&AgentEvent::LeftFlock(rig.agent.id())));
        assert!(events.contains(&AgentEvent::Animation {
            agent: rig.agent.id(),
            cue: AnimationCue::Disabled,
        }));
        assert_eq!(rig.pool.spawned.load(Ordering::SeqCst), 1);
        assert_eq!(rig.agent.current_state(), AgentState::Death);
        assert!(!rig.agent.notify_death());
    }

    #[test]
    fn test_tick_notices_depleted_health() {
        let target = point(9, Vec3::new(20.0, 0.0, 0.0));
        let mut rig = rig(Vec3::ZERO, &target, None, AgentConfig::default());
        let mut now = 0.0;

        rig.health.lock().damage(&DamageInfo::new(10.0));
        tick(&mut rig.agent, 0.1, &mut now);
        assert!(rig.agent.is_dead());
        let position = rig.agent.position();
        tick(&mut rig.agent, 1.0, &mut now);
        assert_eq!(rig.agent.position(), position);
    }

    #[test]
    fn test_damage_retargets_to_attacker() {
        let target = point(9, Vec3::new(20.0, 0.0, 0.0));
        let shooter = point(5, Vec3::new(-20.0, 0.0, 0.0));
        let mut rig = rig(Vec3::ZERO, &target, None, AgentConfig::default());
        let mut now = 0.0;

        rig.health.lock().damage(&DamageInfo::new(1.0));
        rig.agent.notify_damaged(Some(&shooter));
        assert_eq!(rig.agent.target().map(|t| t.id()), Some(EntityId::new(5, 0)));

        tick(&mut rig.agent, 0.5, &mut now);
        assert_eq!(rig.agent.position(), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_dead_target_falls_back_to_facility() {
        let health: SharedDamageable = Arc::new(Mutex::new(Health::new(EntityId::new(9, 0), 1.0)));
        let player: TargetHandle = Arc::new(
            MovingTarget::new(EntityId::new(9, 0), Vec3::new(0.5, 0.0, 0.0)).with_health(&health),
        );
        let facility: TargetHandle = Arc::new(StaticTarget::new(
            EntityId::new(8, 0),
            Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 30.0), Vec3::splat(1.0)),
        ));
        let mut rig = rig(Vec3::ZERO, &player, Some(&facility), AgentConfig::default());
        let mut now = 0.0;
        tick(&mut rig.agent, 0.0, &mut now);
        assert_eq!(rig.agent.current_state(), AgentState::Attack);

        health.lock().damage(&DamageInfo::new(5.0));
        tick(&mut rig.agent, 0.1, &mut now);
        assert_eq!(rig.agent.current_state(), AgentState::Chase);
        assert_eq!(rig.agent.target().map(|t| t.id()), Some(EntityId::new(8, 0)));

        tick(&mut rig.agent, 0.5, &mut now);
        assert!(rig.agent.position().z > 0.0);
    }

    #[test]
    fn test_lost_target_without_facility_keeps_last_point() {
        let target = point(9, Vec3::new(4.0, 0.0, 0.0));
        let mut rig = rig(Vec3::ZERO, &target, None, AgentConfig::default());
        let mut now = 0.0;
        tick(&mut rig.agent, 0.5, &mut now);

        drop(target);
        tick(&mut rig.agent, 0.5, &mut now);
        assert!(rig.agent.target().is_none());
        assert_eq!(rig.agent.current_state(), AgentState::Chase);
        assert_eq!(rig.agent.position(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_flock_inputs_only_while_chasing() {
        let target = point(9, Vec3::new(0.5, 0.0, 0.0));
        let mut rig = rig(Vec3::ZERO, &target, None, AgentConfig::default());
        let mut now = 0.0;
        let inputs = FlockInputs {
            neighbors: 2,
            ..Default::default()
        };

        rig.agent.apply_flock(inputs);
        assert_eq!(rig.agent.flock_inputs().neighbors, 2);

        tick(&mut rig.agent, 0.0, &mut now);
        assert_eq!(rig.agent.current_state(), AgentState::Attack);
        assert_eq!(rig.agent.flock_inputs().neighbors, 0);
        rig.agent.apply_flock(inputs);
        assert_eq!(rig.agent.flock_inputs().neighbors, 0);
    }
}
