//! Per-instance render data

use horde_ai::AgentState;
use horde_core::{EntityId, Pose};
use serde::{Deserialize, Serialize};

/// What the renderer needs from one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInput {
    pub id: EntityId,
    /// Visual type index
    pub kind: u8,
    pub state: AgentState,
    pub pose: Pose,
}

impl RenderInput {
    pub fn new(id: EntityId, kind: u8, state: AgentState, pose: Pose) -> Self {
        Self { id, kind, state, pose }
    }
}

/// Uniform scale of each agent kind
pub fn kind_scale(kind: u8) -> f32 {
    match kind {
        1 => 1.3,
        2 => 2.0,
        _ => 1.0,
    }
}

/// Animation texture slice for a state
pub fn anim_slice(state: AgentState) -> u32 {
    match state {
        AgentState::Attack => 1,
        AgentState::Death => 2,
        AgentState::Chase => 0,
    }
}

/// Per-instance data uploaded to the GPU
///
/// `custom[0]` holds the animation slice.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    /// Model matrix (4x4 column-major)
    pub model: [[f32; 4]; 4],
    pub custom: [f32; 4],
}

impl InstanceData {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn from_input(input: &RenderInput) -> Self {
        Self {
            model: input.pose.to_matrix(kind_scale(input.kind)).to_cols_array_2d(),
            custom: [anim_slice(input.state) as f32, 0.0, 0.0, 0.0],
        }
    }

    pub fn anim_slice(&self) -> u32 {
        self.custom[0] as u32
    }
}

impl Default for InstanceData {
    fn default() -> Self {
        Self {
            model: glam::Mat4::IDENTITY.to_cols_array_2d(),
            custom: [0.0; 4],
        }
    }
}
