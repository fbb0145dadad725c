use bevy::prelude::*;

use crate::error::ResampleError;
use crate::rotation::{lerp, slerp};
use crate::transform_frames::TransformFrames;

/// Frame density change selected by a signed upsample factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDensity {
    Keep,
    /// Insert interpolated frames, `n` output frames per input frame pair.
    Interpolate(usize),
    /// Keep every `n`-th frame starting from the first.
    Stride(usize),
}

impl FrameDensity {
    /// `> 1` interpolates, `< -1` strides by the absolute value, anything else keeps the frames.
    pub fn from_factor(upsample: i32) -> Self {
        match upsample {
            f if f > 1 => FrameDensity::Interpolate(f as usize),
            f if f < -1 => FrameDensity::Stride(f.unsigned_abs() as usize),
            _ => FrameDensity::Keep,
        }
    }
}

impl TransformFrames {
    /// Drops `front` leading and `back` trailing frames.
    pub fn trim(&mut self, front: usize, back: usize) -> Result<(), ResampleError> {
        if front == 0 && back == 0 {
            return Ok(());
        }

        let length = self.len();
        if front.checked_add(back).map_or(true, |total| total >= length) {
            return Err(ResampleError::TrimUnderflow {
                front,
                back,
                length,
            });
        }

        let joint_count = self.joint_count();
        let matrices = self.matrices_mut();
        matrices.truncate((length - back) * joint_count);
        matrices.drain(..front * joint_count);
        Ok(())
    }

    /// Applies a [`FrameDensity`] in place.
    pub fn resample(&mut self, density: FrameDensity) -> Result<(), ResampleError> {
        match density {
            FrameDensity::Keep => {}
            FrameDensity::Interpolate(factor) => *self = self.interpolate(factor)?,
            FrameDensity::Stride(stride) => *self = self.stride(stride)?,
        }
        Ok(())
    }

    /// Expands every consecutive frame pair into `factor` frames at
    /// `t = k / factor`. The last frame only serves as an end point,
    /// so `(len - 1) * factor` frames are produced.
    pub fn interpolate(&self, factor: usize) -> Result<Self, ResampleError> {
        let length = self.len();
        if length < 2 {
            return Err(ResampleError::NotEnoughFrames { length });
        }

        let mut interpolated = Self::with_capacity(self.joint_count(), (length - 1) * factor);
        for f in 0..length - 1 {
            let (from, to) = (self.frame(f), self.frame(f + 1));
            for k in 0..factor {
                let t = k as f32 / factor as f32;
                interpolated.push_frame(
                    from.iter()
                        .zip(to)
                        .map(|(from, to)| interpolate_transform(*from, *to, t)),
                );
            }
        }

        Ok(interpolated)
    }

    /// Keeps every `stride`-th frame starting at the first one.
    pub fn stride(&self, stride: usize) -> Result<Self, ResampleError> {
        let length = self.len();
        if stride == 0 || length < stride {
            return Err(ResampleError::StrideUnderflow { stride, length });
        }

        let mut strided = Self::with_capacity(self.joint_count(), length.div_ceil(stride));
        for frame in self.frames().step_by(stride) {
            strided.push_frame(frame.iter().copied());
        }

        Ok(strided)
    }

    /// Repeats every frame `count` times in a row without interpolating.
    pub fn duplicate(&self, count: usize) -> Result<Self, ResampleError> {
        if count == 0 {
            return Err(ResampleError::ZeroDuplication);
        }

        let mut duplicated = Self::with_capacity(self.joint_count(), self.len() * count);
        for frame in self.frames() {
            for _ in 0..count {
                duplicated.push_frame(frame.iter().copied());
            }
        }

        Ok(duplicated)
    }
}

/// Lerps the translation and slerps the rotation of two rigid transforms.
pub fn interpolate_transform(from: Mat4, to: Mat4, t: f32) -> Mat4 {
    let (_, from_rotation, from_translation) = from.to_scale_rotation_translation();
    let (_, mut to_rotation, to_translation) = to.to_scale_rotation_translation();

    // A matrix maps to either of two antipodal quaternions, keep both on one hemisphere.
    if from_rotation.dot(to_rotation) < 0.0 {
        to_rotation = -to_rotation;
    }

    Mat4::from_rotation_translation(
        slerp(from_rotation, to_rotation, t),
        lerp(from_translation, to_translation, t),
    )
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    const EPS: f32 = 1e-5;

    /// Frame `f` translates by `f` along X and turns `f * 90` degrees about Y.
    fn turning(frames: usize, joints: usize) -> TransformFrames {
        let mut transforms = TransformFrames::new(joints);
        for f in 0..frames {
            let matrix = Mat4::from_rotation_translation(
                Quat::from_rotation_y(f as f32 * FRAC_PI_2),
                Vec3::new(f as f32, 0.0, 0.0),
            );
            transforms.push_frame(std::iter::repeat(matrix).take(joints));
        }
        transforms
    }

    fn x_of(transforms: &TransformFrames) -> Vec<f32> {
        transforms.joint(0).map(|m| m.w_axis.x).collect()
    }

    #[test]
    fn factor_selects_density() {
        assert_eq!(FrameDensity::from_factor(1), FrameDensity::Keep);
        assert_eq!(FrameDensity::from_factor(0), FrameDensity::Keep);
        assert_eq!(FrameDensity::from_factor(-1), FrameDensity::Keep);
        assert_eq!(FrameDensity::from_factor(4), FrameDensity::Interpolate(4));
        assert_eq!(FrameDensity::from_factor(-3), FrameDensity::Stride(3));
    }

    #[test]
    fn trims_both_ends() {
        let mut transforms = turning(6, 2);
        transforms.trim(1, 2).unwrap();
        assert_eq!(transforms.len(), 3);
        assert_eq!(x_of(&transforms), vec![1.0, 2.0, 3.0]);

        transforms.trim(0, 0).unwrap();
        assert_eq!(transforms.len(), 3);
    }

    #[test]
    fn trimming_everything_fails() {
        let mut transforms = turning(4, 1);
        assert_eq!(
            transforms.trim(2, 2),
            Err(ResampleError::TrimUnderflow {
                front: 2,
                back: 2,
                length: 4
            })
        );
        assert_eq!(transforms.len(), 4);

        assert_eq!(
            transforms.trim(usize::MAX, 1),
            Err(ResampleError::TrimUnderflow {
                front: usize::MAX,
                back: 1,
                length: 4
            })
        );
        assert_eq!(transforms.len(), 4);
    }

    #[test]
    fn interpolation_drops_the_last_frame() {
        let transforms = turning(4, 3);
        let upsampled = transforms.interpolate(3).unwrap();

        assert_eq!(upsampled.len(), (4 - 1) * 3);
        assert_eq!(upsampled.joint_count(), 3);

        let xs = x_of(&upsampled);
        let expected = (0..9).map(|i| i as f32 / 3.0).collect::<Vec<_>>();
        for (x, e) in xs.iter().zip(&expected) {
            assert!((x - e).abs() < EPS, "{xs:?}");
        }

        // Every group starts on an original frame.
        for f in 0..3 {
            assert!(upsampled.frame(f * 3)[0].abs_diff_eq(transforms.frame(f)[0], EPS));
        }
    }

    #[test]
    fn interpolation_slerps_rotation() {
        let upsampled = turning(2, 1).interpolate(2).unwrap();
        let (_, rotation, _) = upsampled.frame(1)[0].to_scale_rotation_translation();
        let expected = Quat::from_rotation_y(FRAC_PI_2 * 0.5);

        assert!((rotation * Vec3::X).abs_diff_eq(expected * Vec3::X, EPS));
        assert!((rotation * Vec3::Z).abs_diff_eq(expected * Vec3::Z, EPS));
    }

    #[test]
    fn interpolating_static_frames_is_stable() {
        let mut transforms = TransformFrames::new(1);
        let matrix = Mat4::from_rotation_translation(Quat::from_rotation_x(0.4), Vec3::ONE);
        transforms.push_frame([matrix]);
        transforms.push_frame([matrix]);

        let upsampled = transforms.interpolate(4).unwrap();
        for frame in upsampled.frames() {
            assert!(frame[0].is_finite());
            assert!(frame[0].abs_diff_eq(matrix, EPS));
        }
    }

    #[test]
    fn interpolation_needs_two_frames() {
        assert_eq!(
            turning(1, 1).interpolate(2),
            Err(ResampleError::NotEnoughFrames { length: 1 })
        );
    }

    #[test]
    fn stride_keeps_first_and_rounds_up() {
        assert_eq!(x_of(&turning(5, 2).stride(2).unwrap()), vec![0.0, 2.0, 4.0]);
        assert_eq!(x_of(&turning(4, 2).stride(2).unwrap()), vec![0.0, 2.0]);
        assert_eq!(turning(3, 1).stride(3).unwrap().len(), 1);
    }

    #[test]
    fn stride_longer_than_sequence_fails() {
        assert_eq!(
            turning(2, 1).stride(3),
            Err(ResampleError::StrideUnderflow {
                stride: 3,
                length: 2
            })
        );
    }

    #[test]
    fn duplicates_frames_exactly() {
        let transforms = turning(3, 2);
        let duplicated = transforms.duplicate(4).unwrap();

        assert_eq!(duplicated.len(), 12);
        for (i, frame) in duplicated.frames().enumerate() {
            assert_eq!(frame, transforms.frame(i / 4));
        }
        assert_eq!(transforms.duplicate(0), Err(ResampleError::ZeroDuplication));
    }

    #[test]
    fn resample_dispatches_density() {
        let mut transforms = turning(5, 1);
        transforms.resample(FrameDensity::Keep).unwrap();
        assert_eq!(transforms.len(), 5);

        transforms.resample(FrameDensity::Stride(2)).unwrap();
        assert_eq!(transforms.len(), 3);

        transforms.resample(FrameDensity::Interpolate(2)).unwrap();
        assert_eq!(transforms.len(), 4);
    }
}
