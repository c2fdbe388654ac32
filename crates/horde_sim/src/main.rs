//! Horde headless harness
//!
//! Plays the configured campaign at a fixed step with no renderer attached.
//! The player stands still behind an automatic turret that shoots the
//! nearest agent in range; draw batches are built every frame as a renderer
//! would request them.
//!
//! Run with: cargo run -p horde_sim
//!       or: HORDE_CONFIG=campaign.toml RUST_LOG=debug cargo run --bin horde

use horde_ai::TargetProvider;
use horde_core::EntityId;
use horde_sim::config::{debug_flag, log_filter};
use horde_sim::{SimConfig, SimEvent, SimWorld};
use horde_waves::WaveEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() {
    // Initialize logging
    let debug = std::env::var("HORDE_DEBUG").is_ok_and(|value| debug_flag(&value));
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(debug))).init();

    let config = SimConfig::load();
    if config.debug && !debug {
        log::info!("Config enables debug; run with HORDE_DEBUG=1 or RUST_LOG=debug for debug output");
    }
    config.print_summary();

    let harness = config.harness.clone();
    let mut world = SimWorld::new(config);

    let player_dead = Arc::new(AtomicBool::new(false));
    {
        let player_dead = player_dead.clone();
        world.subscribe(move |event| match event {
            SimEvent::Wave(WaveEvent::WaveCompleted { wave }) => log::info!("Wave {} cleared", wave),
            SimEvent::Wave(WaveEvent::Statistics(stats)) => log::debug!(
                "wave {}/{}: {} alive, {} killed",
                stats.current_wave_index + 1,
                stats.total_waves,
                stats.entities_alive,
                stats.entities_killed
            ),
            SimEvent::PlayerDied => player_dead.store(true, Ordering::SeqCst),
            _ => {}
        });
    }

    if let Err(e) = world.start_campaign() {
        log::error!("Failed to start campaign: {}", e);
        std::process::exit(1);
    }

    let dt = harness.fixed_dt.max(1e-4);
    let mut turret_cooldown = 0.0f32;
    let mut shots = 0u64;
    let mut draws = 0usize;

    while world.time() < harness.duration as f64 && !world.campaign_complete() {
        world.tick(dt);

        turret_cooldown -= dt;
        if turret_cooldown <= 0.0 && !player_dead.load(Ordering::SeqCst) {
            if let Some(target) = nearest_agent(&world, harness.turret_range) {
                let source = world.player().id();
                world.damage_agent(target, harness.turret_damage, Some(source));
                shots += 1;
            }
            turret_cooldown = harness.turret_interval;
        }

        draws += world.render_batches().len();
    }

    let stats = world.statistics();
    log::info!(
        "Finished at {:.1}s: campaign {}, {} turret shots, {} draw calls",
        world.time(),
        if world.campaign_complete() { "complete" } else { "incomplete" },
        shots,
        draws
    );
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => log::info!("Final statistics:\n{}", json),
        Err(e) => log::warn!("Could not serialize statistics: {}", e),
    }

    world.stop();
}

/// Closest living agent within `range` of the player
fn nearest_agent(world: &SimWorld, range: f32) -> Option<EntityId> {
    let origin = world.player().position();
    world
        .agents()
        .filter(|agent| !agent.is_dead())
        .map(|agent| (agent.id(), agent.position().distance_squared(origin)))
        .filter(|(_, distance)| *distance <= range * range)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}
