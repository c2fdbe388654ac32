//! Neighbour-influence kernel
//!
//! Every member's influences are a pure function of the whole snapshot, so
//! the parallel and serial backends produce bit-identical results. The
//! parallel backend fans members out over a dedicated rayon pool.

use super::FlockSample;
use crate::config::FlockConfig;
use crate::error::{FlockError, Result};
use crate::steering::FlockInputs;
use glam::Vec3;
use rayon::prelude::*;

/// Radii used by the neighbour scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborParams {
    /// Neighbours strictly closer than this are counted
    pub radius: f32,
    /// Neighbours strictly closer than this repel
    pub avoid_radius: f32,
}

impl NeighborParams {
    pub fn from_config(config: &FlockConfig) -> Self {
        Self {
            radius: config.radius_of_influence,
            avoid_radius: config.avoid_radius,
        }
    }
}

enum Backend {
    Parallel(rayon::ThreadPool),
    Serial,
}

/// Computes cohesion, separation and alignment for a snapshot
pub struct FlockKernel {
    backend: Backend,
}

impl FlockKernel {
    /// Single-threaded kernel
    pub fn serial() -> Self {
        Self {
            backend: Backend::Serial,
        }
    }

    /// Kernel backed by a dedicated thread pool. `threads == 0` uses rayon's default.
    pub fn parallel(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("horde-flock-{i}"))
            .build()
            .map_err(|e| FlockError::ThreadPool(e.to_string()))?;
        Ok(Self {
            backend: Backend::Parallel(pool),
        })
    }

    /// Pick the backend from config, falling back to serial when the pool is unavailable
    pub fn from_config(config: &FlockConfig) -> Self {
        if !config.parallel {
            log::info!("Flock kernel: serial");
            return Self::serial();
        }
        match Self::parallel(config.worker_threads) {
            Ok(kernel) => {
                log::info!("Flock kernel: parallel ({} threads)", kernel.threads());
                kernel
            }
            Err(e) => {
                log::warn!("{e}, using the serial flock kernel");
                Self::serial()
            }
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.backend, Backend::Parallel(_))
    }

    /// Worker threads used by this kernel
    pub fn threads(&self) -> usize {
        match &self.backend {
            Backend::Parallel(pool) => pool.current_num_threads(),
            Backend::Serial => 1,
        }
    }

    /// Compute influences for every sample, index-correlated with the input
    pub fn compute(&self, samples: &[FlockSample], params: NeighborParams) -> Vec<FlockInputs> {
        match &self.backend {
            Backend::Parallel(pool) => pool.install(|| {
                (0..samples.len())
                    .into_par_iter()
                    .map(|i| neighbor_influence(i, samples, params))
                    .collect()
            }),
            Backend::Serial => (0..samples.len())
                .map(|i| neighbor_influence(i, samples, params))
                .collect(),
        }
    }
}

impl std::fmt::Debug for FlockKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlockKernel")
            .field("parallel", &self.is_parallel())
            .field("threads", &self.threads())
            .finish()
    }
}

/// Influences on member `index` from every other member of the snapshot
pub fn neighbor_influence(index: usize, samples: &[FlockSample], params: NeighborParams) -> FlockInputs {
    let me = samples[index];
    let radius_sq = params.radius * params.radius;
    let avoid_sq = params.avoid_radius * params.avoid_radius;

    let mut position_sum = Vec3::ZERO;
    let mut velocity_sum = Vec3::ZERO;
    let mut separation = Vec3::ZERO;
    let mut neighbors = 0u32;

    for (j, other) in samples.iter().enumerate() {
        if j == index {
            continue;
        }
        let offset = other.position - me.position;
        let dist_sq = offset.length_squared();
        if dist_sq >= radius_sq {
            continue;
        }

        neighbors += 1;
        position_sum += other.position;
        velocity_sum += other.velocity;

        // Coincident members have no direction to push along
        if dist_sq < avoid_sq && dist_sq > f32::EPSILON {
            separation -= offset / dist_sq;
        }
    }

    if neighbors == 0 {
        return FlockInputs::default();
    }

    let count = neighbors as f32;
    FlockInputs {
        cohesion: position_sum / count - me.position,
        separation,
        alignment: velocity_sum / count,
        neighbors,
    }
}
