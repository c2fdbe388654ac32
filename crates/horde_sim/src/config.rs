//! Simulation Configuration
//!
//! Everything the world needs is plain serde data, so a whole campaign can be
//! written as TOML.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `HORDE_DEBUG`, `HORDE_SEED`, `HORDE_SERIAL_FLOCK`
//! 2. Config file: `$HORDE_CONFIG`, then `horde.toml` in the working directory
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! debug = false
//!
//! [flock]
//! radius_of_influence = 6.0
//! parallel = true
//!
//! [[spawn_points]]
//! direction = "north"
//! area = { min = [-20.0, 0.0, 28.0], max = [20.0, 0.0, 32.0] }
//!
//! [[levels]]
//! name = "Outskirts"
//! directions = ["north", "south"]
//! interval_between_waves = 10.0
//!
//! [[levels.waves]]
//! name = "First contact"
//! sequential = false
//! groups = [{ kind = 0, max_amount = 10, per_spawn = 2, interval = 3.0 }]
//! ```

use glam::Vec3;
use horde_ai::{AgentConfig, FlockConfig};
use horde_core::Aabb;
use horde_waves::{
    LevelConfig, SpawnConfig, SpawnDirection, SpawnDirections, SpawnGroupConfig, SpawnPlacer, WaveConfig, WaveError,
    WavePolicy,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid level configuration: {0}")]
    Validation(#[from] WaveError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Spawn area for one direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPointConfig {
    pub direction: SpawnDirection,
    pub area: Aabb,
}

/// Health and damage tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub agent_health: f32,
    /// Fraction of damage agents ignore
    pub agent_absorption: f32,
    /// Damage of one melee swing
    pub melee_damage: f32,
    pub player_health: f32,
    /// Ragdolls kept alive before the oldest is recycled
    pub max_ragdolls: usize,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            agent_health: 100.0,
            agent_absorption: 0.0,
            melee_damage: 5.0,
            player_health: 100.0,
            max_ragdolls: 64,
        }
    }
}

/// Play area layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Ground area agents may walk on
    pub walkable: Aabb,
    pub player_position: Vec3,
    pub player_half_extents: Vec3,
    /// Body of the defended facility
    pub facility: Aabb,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            walkable: Aabb::new(Vec3::new(-40.0, -1.0, -40.0), Vec3::new(40.0, 5.0, 40.0)),
            player_position: Vec3::new(0.0, 0.0, 4.0),
            player_half_extents: Vec3::new(0.4, 1.0, 0.4),
            facility: Aabb::new(Vec3::new(-3.0, 0.0, -3.0), Vec3::new(3.0, 3.0, 3.0)),
        }
    }
}

/// Settings of the headless harness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Frame time in seconds
    pub fixed_dt: f32,
    /// Seconds to simulate before giving up
    pub duration: f32,
    /// Turret damage per shot
    pub turret_damage: f32,
    /// Seconds between turret shots
    pub turret_interval: f32,
    pub turret_range: f32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            duration: 300.0,
            turret_damage: 50.0,
            turret_interval: 0.25,
            turret_range: 25.0,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Enable debug logging
    pub debug: bool,
    pub agent: AgentConfig,
    pub flock: FlockConfig,
    pub waves: WavePolicy,
    pub spawn: SpawnConfig,
    pub combat: CombatConfig,
    pub arena: ArenaConfig,
    pub harness: HarnessConfig,
    pub spawn_points: Vec<SpawnPointConfig>,
    /// Levels of the campaign, played in order
    pub levels: Vec<LevelConfig>,
    /// File this config was loaded from
    #[serde(skip)]
    pub config_path: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            debug: false,
            agent: AgentConfig::default(),
            flock: FlockConfig::default(),
            waves: WavePolicy::default(),
            spawn: SpawnConfig::default(),
            combat: CombatConfig::default(),
            arena: ArenaConfig::default(),
            harness: HarnessConfig::default(),
            spawn_points: default_spawn_points(),
            levels: vec![default_level()],
            config_path: None,
        }
    }
}

fn default_spawn_points() -> Vec<SpawnPointConfig> {
    let strip = |center: Vec3, half: Vec3| Aabb::from_center_half_extents(center, half);
    let across = Vec3::new(20.0, 0.0, 2.0);
    let along = Vec3::new(2.0, 0.0, 20.0);
    vec![
        SpawnPointConfig {
            direction: SpawnDirection::North,
            area: strip(Vec3::new(0.0, 0.0, 30.0), across),
        },
        SpawnPointConfig {
            direction: SpawnDirection::West,
            area: strip(Vec3::new(-30.0, 0.0, 0.0), along),
        },
        SpawnPointConfig {
            direction: SpawnDirection::South,
            area: strip(Vec3::new(0.0, 0.0, -30.0), across),
        },
        SpawnPointConfig {
            direction: SpawnDirection::East,
            area: strip(Vec3::new(30.0, 0.0, 0.0), along),
        },
    ]
}

fn default_level() -> LevelConfig {
    LevelConfig::new("Outskirts")
        .with_interval(10.0)
        .with_wave(WaveConfig::new("First contact").with_group(SpawnGroupConfig::new(0, 10, 2, 3.0)))
        .with_wave(
            WaveConfig::new("Pincer")
                .with_group(SpawnGroupConfig::new(0, 12, 4, 2.0))
                .with_group(SpawnGroupConfig::new(1, 6, 2, 4.0)),
        )
        .with_wave(
            WaveConfig::new("Brutes")
                .sequential(true)
                .with_group(SpawnGroupConfig::new(1, 8, 4, 2.0))
                .with_group(SpawnGroupConfig::new(2, 2, 1, 5.0)),
        )
}

/// Interpret a `HORDE_DEBUG` value
pub fn debug_flag(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Default log filter for a debug switch
pub fn log_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

impl SimConfig {
    /// Load configuration from all sources. Unusable files are logged and skipped.
    pub fn load() -> Self {
        let mut config = Self::default();

        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var("HORDE_CONFIG") {
            candidates.push(path);
        }
        candidates.push("horde.toml".to_string());

        for path in candidates {
            if !Path::new(&path).exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(loaded) => {
                    config = loaded;
                    log::info!("Loaded config from {}", path);
                    break;
                }
                Err(e) => log::warn!("Ignoring {}: {}", path, e),
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load and validate a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.display().to_string());
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate spawn areas and every level
    pub fn validate(&self) -> std::result::Result<(), WaveError> {
        for point in &self.spawn_points {
            if !SpawnPlacer::is_placeable(&point.area) {
                log::error!("Spawn area for {} is not finite: {:?}", point.direction, point.area);
                return Err(WaveError::InvalidSpawnArea(point.direction));
            }
        }
        for level in &self.levels {
            level.validate()?;
        }
        Ok(())
    }

    /// Apply environment-style overrides looked up through `var`
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = var("HORDE_DEBUG") {
            self.debug = debug_flag(&value);
        }

        if let Some(value) = var("HORDE_SEED") {
            match value.trim().parse() {
                Ok(seed) => {
                    self.spawn.seed = Some(seed);
                    log::info!("Spawn seed from env: {}", seed);
                }
                Err(_) => log::warn!("Ignoring HORDE_SEED={:?}: not a number", value),
            }
        }

        if var("HORDE_SERIAL_FLOCK").is_some_and(|v| v == "1" || v == "true") {
            self.flock.parallel = false;
        }
    }

    /// Directions that have a spawn area
    pub fn available_directions(&self) -> SpawnDirections {
        self.spawn_points.iter().map(|p| p.direction).collect()
    }

    /// Log a short summary
    pub fn print_summary(&self) {
        log::info!("=== Horde configuration ===");
        if let Some(path) = &self.config_path {
            log::info!("  Source: {}", path);
        }
        log::info!("  Levels: {}", self.levels.len());
        for level in &self.levels {
            log::info!(
                "    {} ({} waves, {} entities)",
                level.name,
                level.total_waves(),
                level.total_entities()
            );
        }
        log::info!("  Spawn directions: {:?}", self.available_directions());
        log::info!(
            "  Flock: step {}s, {}",
            self.flock.step,
            if self.flock.parallel { "parallel" } else { "serial" }
        );
        log::info!("  Debug: {}", self.debug);
    }
}
