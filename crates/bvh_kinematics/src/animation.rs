use std::path::Path;

use bevy::prelude::*;

use crate::config::LoadSettings;
use crate::error::{BvhError, ResampleError};
use crate::joint_matrices::{build_local_transforms, compose_world_transforms};
use crate::parser::parse_bvh;
use crate::transform_frames::TransformFrames;

/// Whether the world transforms still describe the current local transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum WorldState {
    #[default]
    Stale,
    Composed {
        fix_root: bool,
    },
}

/// A skeletal animation loaded from a bvh file.
///
/// Holds one local transform per frame per joint, and optionally the world
/// transforms composed from them. Any change to the local transforms marks
/// the world transforms stale until [`Animation::compute_world_transform`]
/// runs again.
#[derive(Debug, Clone, Default)]
pub struct Animation {
    name: String,
    fps: u32,
    joints: Vec<String>,
    parents: Vec<usize>,
    local_t: TransformFrames,
    world_t: TransformFrames,
    world_state: WorldState,
}

impl Animation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a new animation from a bvh file.
    pub fn from_bvh_file(path: impl AsRef<Path>, settings: &LoadSettings) -> Result<Self, BvhError> {
        let mut animation = Self::new();
        animation.load_bvh(path, settings)?;
        Ok(animation)
    }

    /// Reads, trims and resamples a bvh file into this animation,
    /// replacing everything it held before.
    ///
    /// The animation is named after the file stem.
    pub fn load_bvh(&mut self, path: impl AsRef<Path>, settings: &LoadSettings) -> Result<(), BvhError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.load_bvh_str(name, &source, settings)
    }

    /// Same as [`Self::load_bvh`] for bvh text that is already in memory.
    ///
    /// On error the animation is left untouched.
    pub fn load_bvh_str(
        &mut self,
        name: impl Into<String>,
        source: &str,
        settings: &LoadSettings,
    ) -> Result<(), BvhError> {
        let order = settings.euler_order()?;
        let bvh = parse_bvh(source, settings.layout)?;

        let mut local_t = build_local_transforms(&bvh, order);
        local_t.trim(settings.front_trim, settings.back_trim)?;
        local_t.resample(settings.frame_density())?;

        self.name = name.into();
        self.fps = bvh.fps;
        self.world_t = TransformFrames::new(bvh.joint_count());
        self.world_state = WorldState::Stale;
        self.joints = bvh.joints;
        self.parents = bvh.parents;
        self.local_t = local_t;

        info!("Loaded {} frames from {}", self.length(), self.name);
        Ok(())
    }

    /// Composes world transforms from the local transforms.
    ///
    /// With `fix_root` the root joint is pinned to the origin, which removes
    /// the recording's global placement from every joint.
    pub fn compute_world_transform(&mut self, fix_root: bool) {
        self.world_t = compose_world_transforms(&self.local_t, &self.parents, fix_root);
        self.world_state = WorldState::Composed { fix_root };
    }

    /// Repeats every frame `count` times without interpolating.
    pub fn dup_upsample(&mut self, count: usize) -> Result<(), ResampleError> {
        self.local_t = self.local_t.duplicate(count)?;
        self.mark_world_stale();
        Ok(())
    }

    /// Keeps at most the first `length` frames.
    pub fn truncate(&mut self, length: usize) {
        if length < self.length() {
            self.local_t.truncate(length);
            self.mark_world_stale();
        }
    }

    fn mark_world_stale(&mut self) {
        self.world_state = WorldState::Stale;
    }
}

// Getter functions
impl Animation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Number of frames.
    pub fn length(&self) -> usize {
        self.local_t.len()
    }

    pub fn joints(&self) -> &[String] {
        &self.joints
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|joint| joint == name)
    }

    /// Parent of every joint, `parents[0] == 0` for the root.
    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    pub fn local_t(&self) -> &TransformFrames {
        &self.local_t
    }

    /// World transforms, or [`None`] if they were never composed or the
    /// local transforms changed since.
    pub fn world_t(&self) -> Option<&TransformFrames> {
        match self.world_state {
            WorldState::Stale => None,
            WorldState::Composed { .. } => Some(&self.world_t),
        }
    }

    /// The `fix_root` flag the current world transforms were composed with.
    pub fn world_fix_root(&self) -> Option<bool> {
        match self.world_state {
            WorldState::Stale => None,
            WorldState::Composed { fix_root } => Some(fix_root),
        }
    }
}

/// Truncates every animation to the shortest one. Returns the shared length.
pub fn match_length<'a>(animations: impl IntoIterator<Item = &'a mut Animation>) -> usize {
    let mut animations = animations.into_iter().collect::<Vec<_>>();
    let Some(min_length) = animations.iter().map(|a| a.length()).min() else {
        return 0;
    };

    for animation in animations.iter_mut() {
        animation.truncate(min_length);
    }
    min_length
}
