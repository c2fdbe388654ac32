//! Per-kind draw grouping
//!
//! Membership of each kind's group only changes when an agent spawns, changes
//! state or dies, so it is rebuilt lazily behind a dirty flag. Instance data
//! is regenerated every frame from the current poses.

use crate::instance::{InstanceData, RenderInput};
use horde_ai::AgentState;
use horde_core::{EntityId, MAX_AGENT_KINDS};
use serde::{Deserialize, Serialize};

/// Instances per draw call
pub const MAX_BATCH: usize = 1023;

/// One instanced draw call
#[derive(Debug, Clone, Default)]
pub struct DrawBatch {
    pub kind: u8,
    pub instances: Vec<InstanceData>,
    /// Entity drawn by each instance, for picking
    pub entity_ids: Vec<EntityId>,
}

impl DrawBatch {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn entity_at(&self, index: usize) -> Option<EntityId> {
        self.entity_ids.get(index).copied()
    }

    /// Instance data as bytes for GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Grouping statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStats {
    pub total_instances: u32,
    pub batch_count: u32,
    pub max_batch_size: u32,
    /// Agents left out of the last rebuild (dead or unknown kind)
    pub skipped: u32,
    pub rebuilds: u64,
}

/// Groups live agents by kind
#[derive(Debug)]
pub struct RenderGrouper {
    groups: Vec<Vec<EntityId>>,
    dirty: bool,
    stats: RenderStats,
}

impl RenderGrouper {
    pub fn new() -> Self {
        Self {
            groups: vec![Vec::new(); MAX_AGENT_KINDS as usize],
            dirty: true,
            stats: RenderStats::default(),
        }
    }

    /// Request a rebuild before the next frame
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute group membership. Dead agents and unknown kinds are left out.
    pub fn rebuild<I>(&mut self, agents: I)
    where
        I: IntoIterator<Item = RenderInput>,
    {
        for group in &mut self.groups {
            group.clear();
        }

        let mut skipped = 0;
        for agent in agents {
            if agent.state == AgentState::Death {
                skipped += 1;
                continue;
            }
            match self.groups.get_mut(agent.kind as usize) {
                Some(group) => group.push(agent.id),
                None => {
                    log::warn!("Agent {} has unknown kind {}, not drawn", agent.id, agent.kind);
                    skipped += 1;
                }
            }
        }

        self.stats.skipped = skipped;
        self.stats.rebuilds += 1;
        self.dirty = false;
    }

    /// Build this frame's draw calls.
    ///
    /// `lookup` returns the current render input of a grouped agent. Agents
    /// that have vanished since the last rebuild are drawn with an identity
    /// transform until the next rebuild.
    pub fn batches<F>(&mut self, mut lookup: F) -> Vec<DrawBatch>
    where
        F: FnMut(EntityId) -> Option<RenderInput>,
    {
        let mut batches = Vec::new();
        for (kind, group) in self.groups.iter().enumerate() {
            for chunk in group.chunks(MAX_BATCH) {
                let instances = chunk
                    .iter()
                    .map(|id| lookup(*id).map(|input| InstanceData::from_input(&input)).unwrap_or_default())
                    .collect();
                batches.push(DrawBatch {
                    kind: kind as u8,
                    instances,
                    entity_ids: chunk.to_vec(),
                });
            }
        }

        self.stats.batch_count = batches.len() as u32;
        self.stats.total_instances = batches.iter().map(|b| b.len() as u32).sum();
        self.stats.max_batch_size = batches.iter().map(|b| b.len() as u32).max().unwrap_or(0);
        batches
    }

    /// Members of one kind's group
    pub fn group(&self, kind: u8) -> &[EntityId] {
        self.groups.get(kind as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }
}

impl Default for RenderGrouper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use horde_core::Pose;
    use std::collections::HashMap;

    fn input(index: u32, kind: u8, state: AgentState) -> RenderInput {
        RenderInput::new(
            EntityId::new(index, 0),
            kind,
            state,
            Pose::from_position(Vec3::new(index as f32, 0.0, 0.0)),
        )
    }

    #[test]
    fn test_rebuild_filters() {
        let mut grouper = RenderGrouper::new();
        assert!(grouper.is_dirty());

        grouper.rebuild(vec![
            input(0, 0, AgentState::Chase),
            input(1, 1, AgentState::Attack),
            input(2, 1, AgentState::Death),
            input(3, 3, AgentState::Chase),
            input(4, 2, AgentState::Chase),
        ]);

        assert!(!grouper.is_dirty());
        assert_eq!(grouper.group(0), &[EntityId::new(0, 0)]);
        assert_eq!(grouper.group(1), &[EntityId::new(1, 0)]);
        assert_eq!(grouper.group(2), &[EntityId::new(4, 0)]);
        assert!(grouper.group(3).is_empty());
        assert_eq!(grouper.stats().skipped, 2);
    }

    #[test]
    fn test_chunking() {
        let agents: Vec<RenderInput> = (0..2500).map(|i| input(i, 0, AgentState::Chase)).collect();
        let by_id: HashMap<EntityId, RenderInput> = agents.iter().map(|a| (a.id, *a)).collect();

        let mut grouper = RenderGrouper::new();
        grouper.rebuild(agents.iter().copied());
        let batches = grouper.batches(|id| by_id.get(&id).copied());

        let sizes: Vec<usize> = batches.iter().map(DrawBatch::len).collect();
        assert_eq!(sizes, vec![1023, 1023, 454]);
        assert_eq!(batches[1].entity_at(0), Some(EntityId::new(1023, 0)));
        assert_eq!(batches[0].as_bytes().len(), 1023 * InstanceData::SIZE);
        assert_eq!(grouper.stats().total_instances, 2500);
        assert_eq!(grouper.stats().max_batch_size, 1023);
    }

    #[test]
    fn test_frame_data_follows_current_pose() {
        let mut grouper = RenderGrouper::new();
        grouper.rebuild(vec![input(0, 1, AgentState::Chase), input(1, 1, AgentState::Chase)]);

        // Agent 0 moved and started attacking without a rebuild; agent 1 vanished
        let mut moved = input(0, 1, AgentState::Attack);
        moved.pose.position = Vec3::new(9.0, 0.0, 9.0);
        let batches = grouper.batches(|id| (id == moved.id).then_some(moved));

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].kind, 1);
        assert_eq!(batches[0].instances[0].model[3], [9.0, 0.0, 9.0, 1.0]);
        assert_eq!(batches[0].instances[0].anim_slice(), 1);
        assert_eq!(batches[0].instances[1], InstanceData::default());
    }
}
