//! Spawn position sampling

use glam::Vec3;
use horde_core::Aabb;
use rand::distr::{Distribution, Uniform};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Spawn placement tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Added to the area's center height
    pub height_offset: f32,
    /// Minimum ground distance between entities of one batch
    pub min_distance_between_spawns: f32,
    /// Samples tried per entity before the last one is accepted anyway
    pub max_spawn_attempts: u32,
    /// Fixed seed for reproducible placement
    pub seed: Option<u64>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            height_offset: 0.5,
            min_distance_between_spawns: 1.0,
            max_spawn_attempts: 10,
            seed: None,
        }
    }
}

/// Samples batch positions inside spawn areas
#[derive(Debug)]
pub struct SpawnPlacer {
    config: SpawnConfig,
    rng: SmallRng,
}

impl SpawnPlacer {
    pub fn new(config: SpawnConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// True when positions can be sampled from `area`: every corner and the
    /// span on each axis are finite.
    pub fn is_placeable(area: &Aabb) -> bool {
        area.min.is_finite() && area.max.is_finite() && (area.max - area.min).abs().is_finite()
    }

    /// Positions for `count` entities inside `area`.
    ///
    /// Samples are uniform over the area's ground rectangle. A sample closer
    /// than the minimum distance to an earlier one in the batch is rejected,
    /// up to `max_spawn_attempts` times.
    pub fn positions(&mut self, area: &Aabb, count: u32) -> Vec<Vec3> {
        let y = area.center().y + self.config.height_offset;
        let min_sq = self.config.min_distance_between_spawns.powi(2);
        let attempts = self.config.max_spawn_attempts.max(1);

        let mut placed: Vec<Vec3> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut candidate = self.sample(area, y);
            for _ in 1..attempts {
                let crowded = placed
                    .iter()
                    .any(|p| (p.x - candidate.x).powi(2) + (p.z - candidate.z).powi(2) < min_sq);
                if !crowded {
                    break;
                }
                candidate = self.sample(area, y);
            }
            placed.push(candidate);
        }
        placed
    }

    fn sample(&mut self, area: &Aabb, y: f32) -> Vec3 {
        let (min, max) = (area.min.min(area.max), area.min.max(area.max));
        Vec3::new(
            self.sample_axis(min.x, max.x),
            y,
            self.sample_axis(min.z, max.z),
        )
    }

    /// Uniform sample in `low..=high`, or the midpoint when the range is unusable
    fn sample_axis(&mut self, low: f32, high: f32) -> f32 {
        match Uniform::<f32>::new_inclusive(low, high) {
            Ok(range) => range.sample(&mut self.rng),
            Err(e) => {
                log::debug!("Spawn range {}..={} unusable ({}), using its midpoint", low, high, e);
                low * 0.5 + high * 0.5
            }
        }
    }
}

impl Default for SpawnPlacer {
    fn default() -> Self {
        Self::new(SpawnConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> SpawnPlacer {
        SpawnPlacer::new(SpawnConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    #[test]
    fn test_positions_inside_area() {
        let area = Aabb::new(Vec3::new(-10.0, 0.0, 20.0), Vec3::new(10.0, 2.0, 24.0));
        let positions = seeded(1).positions(&area, 16);

        assert_eq!(positions.len(), 16);
        for p in positions {
            assert!(p.x >= -10.0 && p.x <= 10.0);
            assert!(p.z >= 20.0 && p.z <= 24.0);
            assert_eq!(p.y, 1.5);
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let area = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(5.0, 0.0, 5.0));
        assert_eq!(seeded(42).positions(&area, 8), seeded(42).positions(&area, 8));
    }

    #[test]
    fn test_batch_spacing() {
        let area = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(50.0, 0.0, 50.0));
        let mut placer = SpawnPlacer::new(SpawnConfig {
            min_distance_between_spawns: 1.0,
            max_spawn_attempts: 64,
            seed: Some(3),
            ..Default::default()
        });
        let positions = placer.positions(&area, 10);

        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!(a.distance(*b) >= 1.0);
            }
        }
    }

    #[test]
    fn test_unbounded_area_falls_back_to_center() {
        let area = Aabb::new(Vec3::new(-3.0e38, 0.0, -1.0), Vec3::new(3.0e38, 0.0, 1.0));
        assert!(!SpawnPlacer::is_placeable(&area));

        let positions = seeded(5).positions(&area, 4);
        assert_eq!(positions.len(), 4);
        for p in positions {
            assert_eq!(p.x, 0.0);
            assert!(p.z >= -1.0 && p.z <= 1.0);
        }
    }

    #[test]
    fn test_placeable_areas() {
        let strip = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 30.0), Vec3::new(20.0, 0.0, 2.0));
        assert!(SpawnPlacer::is_placeable(&strip));
        assert!(SpawnPlacer::is_placeable(&Aabb::from_point(Vec3::ONE)));

        let infinite = Aabb::new(Vec3::ZERO, Vec3::new(f32::INFINITY, 0.0, 1.0));
        assert!(!SpawnPlacer::is_placeable(&infinite));
        let nan = Aabb::new(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ONE);
        assert!(!SpawnPlacer::is_placeable(&nan));
    }

    #[test]
    fn test_point_area() {
        let area = Aabb::from_point(Vec3::new(3.0, 1.0, -2.0));
        let positions = seeded(9).positions(&area, 3);
        assert!(positions.iter().all(|p| *p == Vec3::new(3.0, 1.5, -2.0)));
    }
}
