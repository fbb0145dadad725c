use std::fmt;
use std::str::FromStr;

use bevy::prelude::*;

use crate::error::InvalidEulerOrder;

/// Quaternion pairs whose absolute dot product is within this distance of 1
/// are treated as the same rotation by [`slerp`].
pub const SLERP_EPSILON: f32 = 1e-6;

/// Linear interpolation between two vectors.
#[inline]
pub fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    (1.0 - t) * a + t * b
}

/// Spherical interpolation between two quaternions.
///
/// Both inputs are normalized first. No shortest-path flip is applied, so
/// `t = 0` yields `q0` and `t = 1` yields `q1` exactly as given.
/// Near-identical (or antipodal) pairs have `sin(theta) ~ 0` and return the
/// nearest endpoint instead of dividing.
pub fn slerp(q0: Quat, q1: Quat, t: f32) -> Quat {
    let q0 = q0.normalize();
    let q1 = q1.normalize();

    let dot = q0.dot(q1).clamp(-1.0, 1.0);
    if 1.0 - dot.abs() < SLERP_EPSILON {
        return match t < 0.5 {
            true => q0,
            false => q1,
        };
    }

    let theta = dot.acos();
    let sin_theta = theta.sin();

    q0 * (((1.0 - t) * theta).sin() / sin_theta) + q1 * ((t * theta).sin() / sin_theta)
}

/// Roll (x), pitch (y), yaw (z) in radians to a quaternion,
/// applied as yaw * pitch * roll.
pub fn quat_from_rpy(roll: f32, pitch: f32, yaw: f32) -> Quat {
    let (sy, cy) = (yaw * 0.5).sin_cos();
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sr, cr) = (roll * 0.5).sin_cos();

    Quat::from_xyzw(
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
        cr * cp * cy + sr * sp * sy,
    )
}

/// Flattens a transform onto the ground (XZ) plane.
///
/// The forward (Z) axis is projected onto the plane, up becomes world Y and
/// the translation loses its height. Returns [`None`] when the forward axis
/// points straight up or down and has no planar direction.
pub fn xz_projection(matrix: Mat4) -> Option<Mat4> {
    let forward = Vec3::new(matrix.z_axis.x, 0.0, matrix.z_axis.z);
    if forward.length_squared() <= f32::EPSILON {
        return None;
    }
    let forward = forward.normalize();
    let right = Vec3::Y.cross(forward).normalize();
    let position = Vec3::new(matrix.w_axis.x, 0.0, matrix.w_axis.z);

    Some(Mat4::from_cols(
        right.extend(0.0),
        Vec3::Y.extend(0.0),
        forward.extend(0.0),
        position.extend(1.0),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// Order in which three Euler angles are applied.
///
/// Parsed from 3 letters: uppercase (`"ZYX"`) rotates about the moving
/// (intrinsic) axes, lowercase (`"zyx"`) about the fixed (extrinsic) axes.
/// Adjacent axes must differ, so both Tait-Bryan (`"XYZ"`) and proper Euler
/// (`"ZXZ"`) sequences are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EulerOrder {
    axes: [Axis; 3],
    intrinsic: bool,
}

impl EulerOrder {
    pub fn axes(&self) -> [Axis; 3] {
        self.axes
    }

    pub fn is_intrinsic(&self) -> bool {
        self.intrinsic
    }

    /// Rotation for the given angles in degrees, listed in sequence order.
    pub fn to_quat(&self, degrees: Vec3) -> Quat {
        let [a0, a1, a2] = self.axes;
        let q0 = Quat::from_axis_angle(a0.unit(), degrees.x.to_radians());
        let q1 = Quat::from_axis_angle(a1.unit(), degrees.y.to_radians());
        let q2 = Quat::from_axis_angle(a2.unit(), degrees.z.to_radians());

        match self.intrinsic {
            true => q0 * q1 * q2,
            false => q2 * q1 * q0,
        }
    }
}

impl Default for EulerOrder {
    fn default() -> Self {
        Self {
            axes: [Axis::Z, Axis::Y, Axis::X],
            intrinsic: true,
        }
    }
}

impl FromStr for EulerOrder {
    type Err = InvalidEulerOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidEulerOrder(s.to_string());

        let intrinsic = match s {
            _ if s.chars().all(|c| c.is_ascii_uppercase()) => true,
            _ if s.chars().all(|c| c.is_ascii_lowercase()) => false,
            _ => return Err(invalid()),
        };

        let axes = s
            .chars()
            .map(|c| match c.to_ascii_lowercase() {
                'x' => Ok(Axis::X),
                'y' => Ok(Axis::Y),
                'z' => Ok(Axis::Z),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let [a0, a1, a2] = <[Axis; 3]>::try_from(axes).map_err(|_| invalid())?;
        if a0 == a1 || a1 == a2 {
            return Err(invalid());
        }

        Ok(Self {
            axes: [a0, a1, a2],
            intrinsic,
        })
    }
}

impl fmt::Display for EulerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.axes {
            let c = match axis {
                Axis::X => 'x',
                Axis::Y => 'y',
                Axis::Z => 'z',
            };
            let c = match self.intrinsic {
                true => c.to_ascii_uppercase(),
                false => c,
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
