//! Translation, rotation and scale of a model in world space.

use cgmath::{Deg, InnerSpace, One, Quaternion, Rotation3, Vector3};

use crate::math::{self, RotationOrder};

/// World transform of a model: position, rotation (as quaternion), and scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// T * R * S
    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Replace the rotation with `angle` degrees about `axis`.
    ///
    /// A zero axis leaves the rotation untouched.
    pub fn set_rotation_axis_angle(&mut self, angle: f32, axis: Vector3<f32>) {
        if axis.magnitude2() <= f32::EPSILON {
            log::warn!("Ignoring rotation about a zero axis");
            return;
        }
        self.rotation = Quaternion::from_axis_angle(axis.normalize(), Deg(angle));
    }

    pub fn set_rotation_euler(&mut self, pitch: f32, yaw: f32, roll: f32, order: RotationOrder) {
        self.rotation = math::euler_to_quat(pitch, yaw, roll, order);
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}
