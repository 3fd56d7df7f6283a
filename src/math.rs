//! Small rotation and interpolation helpers.

use cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3};

/// Order in which Euler rotations are applied, first axis first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RotationOrder {
    XYZ,
    XZY,
    #[default]
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

/// Build a quaternion from Euler angles in degrees.
///
/// `pitch` rotates about X, `yaw` about Y and `roll` about Z. The first axis
/// named by `order` is applied first, so `XYZ` composes as `qz * qy * qx`.
pub fn euler_to_quat(pitch: f32, yaw: f32, roll: f32, order: RotationOrder) -> Quaternion<f32> {
    let qx = Quaternion::from_axis_angle(Vector3::unit_x(), Deg(pitch));
    let qy = Quaternion::from_axis_angle(Vector3::unit_y(), Deg(yaw));
    let qz = Quaternion::from_axis_angle(Vector3::unit_z(), Deg(roll));

    match order {
        RotationOrder::XYZ => qz * qy * qx,
        RotationOrder::XZY => qy * qz * qx,
        RotationOrder::YXZ => qz * qx * qy,
        RotationOrder::YZX => qx * qz * qy,
        RotationOrder::ZXY => qy * qx * qz,
        RotationOrder::ZYX => qx * qy * qz,
    }
}

/// Spherical interpolation with `t` clamped to `[0, 1]`.
pub fn slerp(a: Quaternion<f32>, b: Quaternion<f32>, t: f32) -> Quaternion<f32> {
    a.slerp(b, clamp01(t)).normalize()
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn clamp01(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Smoothstep easing.
pub fn ease_in_out(t: f32) -> f32 {
    let t = clamp01(t);
    t * t * (3.0 - 2.0 * t)
}
