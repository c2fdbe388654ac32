//! Agent pose: world position plus yaw rotation
//!
//! Forward is +Z. Agents walk on the ground plane, so facing helpers only
//! ever rotate around +Y.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position and orientation of an agent in world space
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    /// Create a pose at a position with identity rotation
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Set rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Forward direction (rotated +Z)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Yaw toward a horizontal direction. Zero-length directions are ignored.
    pub fn face_direction(&mut self, direction: Vec3) {
        let flat = Vec3::new(direction.x, 0.0, direction.z);
        if flat.length_squared() <= f32::EPSILON {
            return;
        }
        self.rotation = Quat::from_rotation_y(flat.x.atan2(flat.z));
    }

    /// Yaw toward a world point
    pub fn face_towards(&mut self, point: Vec3) {
        self.face_direction(point - self.position);
    }

    /// Model matrix with a uniform scale
    pub fn to_matrix(&self, scale: f32) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(scale), self.rotation, self.position)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

/// Spherical interpolation between two directions.
///
/// Returns a unit vector. Degenerate inputs fall back to whichever side is
/// usable, and to `Vec3::ZERO` when neither is.
pub fn slerp_direction(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    let from = from.normalize_or_zero();
    let to = to.normalize_or_zero();
    if from == Vec3::ZERO {
        return to;
    }
    if to == Vec3::ZERO {
        return from;
    }
    let arc = Quat::from_rotation_arc(from, to);
    (Quat::IDENTITY.slerp(arc, t.clamp(0.0, 1.0)) * from).normalize_or_zero()
}
