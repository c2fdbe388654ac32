//! Flock coordination
//!
//! The coordinator owns the membership list. Each batch snapshots every
//! member's position and velocity, runs the neighbour kernel and hands each
//! member exactly one result. Membership changes that arrive while a batch
//! is in flight are queued and applied after the batch's results have been
//! distributed, before the next snapshot.
//!
//! The coordinator never touches an agent directly; a [`FlockHost`] supplies
//! snapshots and receives results.

mod kernel;

pub use kernel::{neighbor_influence, FlockKernel, NeighborParams};

use crate::config::FlockConfig;
use crate::steering::FlockInputs;
use glam::Vec3;
use horde_core::{EntityId, FixedStep};
use std::collections::HashSet;

/// Position and velocity of one member at snapshot time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlockSample {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Supplies member snapshots and receives flock results
pub trait FlockHost {
    /// Snapshot of a member, `None` if it no longer exists
    fn sample(&self, id: EntityId) -> Option<FlockSample>;

    /// Deliver a result. Returns false if the member no longer exists.
    fn apply(&mut self, id: EntityId, inputs: FlockInputs) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MembershipChange {
    Register(EntityId),
    Unregister(EntityId),
}

/// One snapshot and its results. Lives for a single batch.
#[derive(Debug)]
pub struct FlockBatch {
    sequence: u64,
    members: Vec<EntityId>,
    samples: Vec<FlockSample>,
    results: Vec<FlockInputs>,
}

impl FlockBatch {
    /// Batch sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Members in snapshot order
    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    pub fn samples(&self) -> &[FlockSample] {
        &self.samples
    }

    /// Results, index-correlated with `members` once computed
    pub fn results(&self) -> &[FlockInputs] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn is_computed(&self) -> bool {
        self.results.len() == self.samples.len()
    }
}

/// Outcome of distributing one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionReport {
    pub sequence: u64,
    /// Members in the snapshot
    pub snapshot: usize,
    /// Results accepted by their member
    pub delivered: usize,
    /// Results whose member vanished before distribution
    pub skipped: usize,
}

/// Maintains flock membership and runs batches at a fixed cadence
#[derive(Debug)]
pub struct FlockCoordinator {
    members: Vec<EntityId>,
    lookup: HashSet<EntityId>,
    pending: Vec<MembershipChange>,
    in_flight: Option<u64>,
    next_sequence: u64,
    cadence: FixedStep,
    kernel: FlockKernel,
    params: NeighborParams,
}

impl FlockCoordinator {
    /// Create a coordinator with the kernel backend chosen by `config`
    pub fn new(config: &FlockConfig) -> Self {
        Self {
            members: Vec::new(),
            lookup: HashSet::new(),
            pending: Vec::new(),
            in_flight: None,
            next_sequence: 0,
            cadence: FixedStep::new(config.step),
            kernel: FlockKernel::from_config(config),
            params: NeighborParams::from_config(config),
        }
    }

    /// Replace the kernel
    pub fn with_kernel(mut self, kernel: FlockKernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn kernel(&self) -> &FlockKernel {
        &self.kernel
    }

    /// Add a member. Deferred while a batch is in flight.
    pub fn register(&mut self, id: EntityId) {
        self.request(MembershipChange::Register(id));
    }

    /// Remove a member. Deferred while a batch is in flight.
    pub fn unregister(&mut self, id: EntityId) {
        self.request(MembershipChange::Unregister(id));
    }

    fn request(&mut self, change: MembershipChange) {
        if self.in_flight.is_some() {
            self.pending.push(change);
        } else {
            self.apply_change(change);
        }
    }

    fn apply_change(&mut self, change: MembershipChange) {
        match change {
            MembershipChange::Register(id) => {
                if self.lookup.insert(id) {
                    self.members.push(id);
                }
            }
            MembershipChange::Unregister(id) => {
                if self.lookup.remove(&id) {
                    self.members.retain(|m| *m != id);
                }
            }
        }
    }

    fn drain_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        log::debug!("Applying {} deferred flock membership changes", self.pending.len());
        let pending = std::mem::take(&mut self.pending);
        for change in pending {
            self.apply_change(change);
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.lookup.contains(&id)
    }

    /// Current members in registration order
    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Membership changes waiting for the in-flight batch to finish
    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    pub fn is_batch_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Snapshot current members.
    ///
    /// Returns `None` when there is nothing to compute or another batch is
    /// still in flight. Members without a sample are left out of the snapshot.
    pub fn begin_batch<S>(&mut self, mut sample: S) -> Option<FlockBatch>
    where
        S: FnMut(EntityId) -> Option<FlockSample>,
    {
        if self.in_flight.is_some() {
            log::warn!("Flock batch requested while another is in flight");
            return None;
        }
        if self.members.is_empty() {
            return None;
        }

        let mut members = Vec::with_capacity(self.members.len());
        let mut samples = Vec::with_capacity(self.members.len());
        for &id in &self.members {
            if let Some(s) = sample(id) {
                members.push(id);
                samples.push(s);
            }
        }
        if members.is_empty() {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.in_flight = Some(sequence);
        Some(FlockBatch {
            sequence,
            members,
            samples,
            results: Vec::new(),
        })
    }

    /// Run the neighbour kernel over a snapshot
    pub fn compute(&self, batch: &mut FlockBatch) {
        batch.results = self.kernel.compute(&batch.samples, self.params);
    }

    /// Hand each snapshot member its result, then apply queued membership changes.
    pub fn finish_batch<A>(&mut self, mut batch: FlockBatch, mut apply: A) -> DistributionReport
    where
        A: FnMut(EntityId, FlockInputs) -> bool,
    {
        debug_assert_eq!(self.in_flight, Some(batch.sequence));
        if !batch.is_computed() {
            self.compute(&mut batch);
        }

        let mut report = DistributionReport {
            sequence: batch.sequence,
            snapshot: batch.members.len(),
            ..Default::default()
        };
        for (&id, &inputs) in batch.members.iter().zip(batch.results.iter()) {
            if apply(id, inputs) {
                report.delivered += 1;
            } else {
                report.skipped += 1;
            }
        }

        self.in_flight = None;
        self.drain_pending();
        report
    }

    /// Snapshot, compute and distribute in one call
    pub fn run_batch<H: FlockHost + ?Sized>(&mut self, host: &mut H) -> Option<DistributionReport> {
        let mut batch = self.begin_batch(|id| host.sample(id))?;
        self.compute(&mut batch);
        Some(self.finish_batch(batch, |id, inputs| host.apply(id, inputs)))
    }

    /// Advance the fixed cadence and run a batch when a step elapsed.
    ///
    /// Several elapsed steps in one frame still run a single batch, since
    /// member positions have not changed between them.
    pub fn tick<H: FlockHost + ?Sized>(&mut self, dt: f32, host: &mut H) -> Option<DistributionReport> {
        if self.cadence.advance(dt) == 0 {
            return None;
        }
        self.run_batch(host)
    }
}
