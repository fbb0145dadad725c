use bevy::prelude::*;

/// Dense `(frames, joints)` grid of joint transforms, stored frame-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformFrames {
    joint_count: usize,
    matrices: Vec<Mat4>,
}

impl TransformFrames {
    pub fn new(joint_count: usize) -> Self {
        Self {
            joint_count,
            matrices: Vec::new(),
        }
    }

    pub fn with_capacity(joint_count: usize, frame_count: usize) -> Self {
        Self {
            joint_count,
            matrices: Vec::with_capacity(joint_count * frame_count),
        }
    }

    /// Appends one frame worth of joint transforms.
    ///
    /// # Panics
    ///
    /// Panics if the frame does not hold exactly [`Self::joint_count`] transforms.
    pub fn push_frame(&mut self, frame: impl IntoIterator<Item = Mat4>) {
        let start = self.matrices.len();
        self.matrices.extend(frame);
        assert_eq!(
            self.matrices.len() - start,
            self.joint_count,
            "A frame must contain one transform per joint!"
        );
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        match self.joint_count {
            0 => 0,
            joint_count => self.matrices.len() / joint_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count
    }

    pub fn frame(&self, frame_index: usize) -> &[Mat4] {
        let start = frame_index * self.joint_count;
        &self.matrices[start..start + self.joint_count]
    }

    pub fn get(&self, frame_index: usize, joint_index: usize) -> Option<Mat4> {
        if joint_index >= self.joint_count {
            return None;
        }
        self.matrices
            .get(frame_index * self.joint_count + joint_index)
            .copied()
    }

    pub fn frames(&self) -> impl ExactSizeIterator<Item = &[Mat4]> + '_ {
        self.matrices.chunks_exact(self.joint_count.max(1))
    }

    /// All transforms of a single joint across frames.
    pub fn joint(&self, joint_index: usize) -> impl Iterator<Item = Mat4> + '_ {
        self.frames().map(move |frame| frame[joint_index])
    }

    /// Keeps only the first `frame_count` frames.
    pub fn truncate(&mut self, frame_count: usize) {
        self.matrices.truncate(frame_count * self.joint_count);
    }

    pub fn as_slice(&self) -> &[Mat4] {
        &self.matrices
    }

    pub(crate) fn matrices_mut(&mut self) -> &mut Vec<Mat4> {
        &mut self.matrices
    }
}
