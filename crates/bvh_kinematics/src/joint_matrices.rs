use bevy::prelude::*;

use crate::parser::ParsedBvh;
use crate::rotation::EulerOrder;
use crate::transform_frames::TransformFrames;

/// Builds the local matrix of every joint for every frame.
///
/// Rotations come from the joint's Euler angles. Only the root translates
/// with the recorded data, every other joint is translated by its rest offset.
pub fn build_local_transforms(bvh: &ParsedBvh, order: EulerOrder) -> TransformFrames {
    let joint_count = bvh.joint_count();
    let mut local_t = TransformFrames::with_capacity(joint_count, bvh.num_frames);

    for f in 0..bvh.num_frames {
        let channels = bvh.frame_channels(f);
        let root_translation = channels[0];

        local_t.push_frame((0..joint_count).map(|j| {
            let rotation = order.to_quat(channels[j + 1]);
            let translation = match j {
                0 => root_translation,
                _ => bvh.offsets[j],
            };
            Mat4::from_rotation_translation(rotation, translation)
        }));
    }

    local_t
}

/// Chains local matrices down the hierarchy into world matrices.
///
/// Joints are visited in index order, which is valid because every parent
/// index is smaller than its child's. With `fix_root` the root sits at the
/// world origin, otherwise it keeps its recorded placement.
pub fn compose_world_transforms(
    local_t: &TransformFrames,
    parents: &[usize],
    fix_root: bool,
) -> TransformFrames {
    let joint_count = local_t.joint_count();
    debug_assert_eq!(joint_count, parents.len());

    let mut world_t = TransformFrames::with_capacity(joint_count, local_t.len());
    let mut world_matrices = vec![Mat4::IDENTITY; joint_count];

    for local_matrices in local_t.frames() {
        for (i, local_matrix) in local_matrices.iter().enumerate() {
            world_matrices[i] = match i {
                0 if fix_root => Mat4::IDENTITY,
                0 => *local_matrix,
                _ => Mat4::mul_mat4(&world_matrices[parents[i]], local_matrix),
            };
        }
        world_t.push_frame(world_matrices.iter().copied());
    }

    world_t
}
