use bevy::prelude::*;
use bvh_kinematics::prelude::*;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("animations differ in length: output {output}, target {target}")]
    LengthMismatch { output: usize, target: usize },
    #[error("animations differ in joint count: output {output}, target {target}")]
    JointCountMismatch { output: usize, target: usize },
    #[error("world transforms of the {0} animation are missing or stale")]
    MissingWorldTransforms(&'static str),
    #[error("at least 2 frames are required, got {length}")]
    TooShort { length: usize },
}

/// Four error terms of a single joint or group of joints.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorTerms {
    /// Distance between positions.
    pub position: f32,
    /// Angle between local rotations, in degrees.
    pub rotation: f32,
    /// Distance between frame to frame position changes.
    pub linear_velocity: f32,
    /// Angle between frame to frame local rotation changes, in degrees.
    pub angular_velocity: f32,
}

/// Per-joint error of an output animation against a target, averaged over frames.
///
/// Joint 0 is measured on its local translation so the root's global
/// placement is compared even when world transforms pin it to the origin.
/// Every other joint is measured on its world translation.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionError {
    /// Number of compared frames.
    pub length: usize,
    pub position: Vec<f32>,
    pub rotation: Vec<f32>,
    pub linear_velocity: Vec<f32>,
    pub angular_velocity: Vec<f32>,
}

impl MotionError {
    pub fn compare(output: &Animation, target: &Animation) -> Result<Self, MetricsError> {
        if output.length() != target.length() {
            return Err(MetricsError::LengthMismatch {
                output: output.length(),
                target: target.length(),
            });
        }
        if output.joints().len() != target.joints().len() {
            return Err(MetricsError::JointCountMismatch {
                output: output.joints().len(),
                target: target.joints().len(),
            });
        }

        let length = output.length();
        if length < 2 {
            return Err(MetricsError::TooShort { length });
        }

        let output_world = output
            .world_t()
            .ok_or(MetricsError::MissingWorldTransforms("output"))?;
        let target_world = target
            .world_t()
            .ok_or(MetricsError::MissingWorldTransforms("target"))?;

        let joint_count = output.joints().len();
        let mut error = Self {
            length,
            position: vec![0.0; joint_count],
            rotation: vec![0.0; joint_count],
            linear_velocity: vec![0.0; joint_count],
            angular_velocity: vec![0.0; joint_count],
        };

        for j in 0..joint_count {
            let output_pos = joint_positions(output.local_t(), output_world, j);
            let target_pos = joint_positions(target.local_t(), target_world, j);
            let output_rot = joint_rotations(output.local_t(), j);
            let target_rot = joint_rotations(target.local_t(), j);

            error.position[j] = mean(
                output_pos
                    .iter()
                    .zip(&target_pos)
                    .map(|(p, gt)| p.distance(*gt)),
            );
            error.linear_velocity[j] = mean(
                velocities(&output_pos)
                    .zip(velocities(&target_pos))
                    .map(|(v, gt)| v.distance(gt)),
            );
            error.rotation[j] = mean(
                output_rot
                    .iter()
                    .zip(&target_rot)
                    .map(|(r, gt)| basis_angle(*r, *gt)),
            );
            error.angular_velocity[j] = mean(
                angular_velocities(&output_rot)
                    .zip(angular_velocities(&target_rot))
                    .map(|(w, gt)| basis_angle(w, gt)),
            );
        }

        Ok(error)
    }

    pub fn joint_count(&self) -> usize {
        self.position.len()
    }

    pub fn joint(&self, index: usize) -> ErrorTerms {
        ErrorTerms {
            position: self.position[index],
            rotation: self.rotation[index],
            linear_velocity: self.linear_velocity[index],
            angular_velocity: self.angular_velocity[index],
        }
    }

    /// Errors of joint 0.
    pub fn root(&self) -> ErrorTerms {
        self.joint(0)
    }

    /// Errors averaged over every joint except the root.
    pub fn joints_mean(&self) -> ErrorTerms {
        ErrorTerms {
            position: mean(self.position.iter().skip(1).copied()),
            rotation: mean(self.rotation.iter().skip(1).copied()),
            linear_velocity: mean(self.linear_velocity.iter().skip(1).copied()),
            angular_velocity: mean(self.angular_velocity.iter().skip(1).copied()),
        }
    }
}

/// Length weighted average of per-joint errors over many comparisons.
#[derive(Debug, Clone, Default)]
pub struct WeightedErrors {
    total_length: usize,
    sums: Option<MotionError>,
}

impl WeightedErrors {
    /// Adds a comparison. Returns `false` if its joint count differs from
    /// the errors accumulated so far, in which case it is ignored.
    pub fn add(&mut self, error: &MotionError) -> bool {
        let weight = error.length as f32;
        match &mut self.sums {
            None => {
                let scale =
                    |values: &[f32]| values.iter().map(|v| v * weight).collect::<Vec<_>>();
                self.sums = Some(MotionError {
                    length: error.length,
                    position: scale(&error.position),
                    rotation: scale(&error.rotation),
                    linear_velocity: scale(&error.linear_velocity),
                    angular_velocity: scale(&error.angular_velocity),
                });
            }
            Some(sums) if sums.joint_count() != error.joint_count() => return false,
            Some(sums) => {
                let accumulate = |sums: &mut [f32], values: &[f32]| {
                    for (sum, value) in sums.iter_mut().zip(values) {
                        *sum += value * weight;
                    }
                };
                accumulate(&mut sums.position, &error.position);
                accumulate(&mut sums.rotation, &error.rotation);
                accumulate(&mut sums.linear_velocity, &error.linear_velocity);
                accumulate(&mut sums.angular_velocity, &error.angular_velocity);
                sums.length += error.length;
            }
        }
        self.total_length += error.length;
        true
    }

    /// Joint count of the accumulated errors, [`None`] until something was added.
    pub fn joint_count(&self) -> Option<usize> {
        self.sums.as_ref().map(MotionError::joint_count)
    }

    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Per-joint averages, [`None`] until something was added.
    pub fn average(&self) -> Option<MotionError> {
        let sums = self.sums.as_ref()?;
        let total = self.total_length as f32;
        let divide = |values: &[f32]| values.iter().map(|v| v / total).collect::<Vec<_>>();

        Some(MotionError {
            length: self.total_length,
            position: divide(&sums.position),
            rotation: divide(&sums.rotation),
            linear_velocity: divide(&sums.linear_velocity),
            angular_velocity: divide(&sums.angular_velocity),
        })
    }
}

/// Root positions come from its local transform, the rest from world transforms.
fn joint_positions(local_t: &TransformFrames, world_t: &TransformFrames, joint: usize) -> Vec<Vec3> {
    let source = match joint {
        0 => local_t,
        _ => world_t,
    };
    source.joint(joint).map(|m| m.w_axis.truncate()).collect()
}

fn joint_rotations(local_t: &TransformFrames, joint: usize) -> Vec<Mat3> {
    local_t.joint(joint).map(|m| Mat3::from_mat4(m)).collect()
}

fn velocities(positions: &[Vec3]) -> impl Iterator<Item = Vec3> + '_ {
    positions.windows(2).map(|w| w[1] - w[0])
}

fn angular_velocities(rotations: &[Mat3]) -> impl Iterator<Item = Mat3> + '_ {
    rotations.windows(2).map(|w| w[1] * w[0].transpose())
}

/// Mean angle in degrees between the X and the Y basis vectors of two rotations.
fn basis_angle(a: Mat3, b: Mat3) -> f32 {
    (angle_between(a.x_axis, b.x_axis) + angle_between(a.y_axis, b.y_axis)) * 0.5
}

fn angle_between(a: Vec3, b: Vec3) -> f32 {
    a.normalize()
        .dot(b.normalize())
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees()
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    match count {
        0 => 0.0,
        _ => sum / count as f32,
    }
}
