//! Loads bvh motion capture into per-frame joint transforms.
//!
//! The pipeline runs parse -> local transforms -> trim & resample when an
//! [`Animation`](animation::Animation) is loaded, world transforms are
//! composed on request.

pub mod prelude {
    pub use crate::animation::{match_length, Animation};
    pub use crate::bvh_asset::{AnimationAsset, BvhAnimationPlugin};
    pub use crate::config::LoadSettings;
    pub use crate::error::{BvhError, ParseError, ResampleError};
    pub use crate::parser::ChannelLayout;
    pub use crate::resample::FrameDensity;
    pub use crate::rotation::EulerOrder;
    pub use crate::transform_frames::TransformFrames;
}

pub mod animation;
pub mod bvh_asset;
pub mod config;
pub mod error;
pub mod joint_matrices;
pub mod parser;
pub mod resample;
pub mod rotation;
pub mod transform_frames;
