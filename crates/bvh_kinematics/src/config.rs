use serde::{Deserialize, Serialize};

use crate::error::InvalidEulerOrder;
use crate::parser::ChannelLayout;
use crate::resample::FrameDensity;
use crate::rotation::EulerOrder;

/// Parameters of a bvh load.
///
/// Doubles as the settings of [`AnimationAssetLoader`](crate::bvh_asset::AnimationAssetLoader),
/// so it can be written to `.meta` files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoadSettings {
    /// Euler rotation order of the motion channels, see [`EulerOrder`].
    pub euler: String,
    /// `> 1` interpolates that many frames per frame pair, `< -1` keeps every n-th frame.
    pub upsample: i32,
    /// Number of leading frames to drop.
    pub front_trim: usize,
    /// Number of trailing frames to drop.
    pub back_trim: usize,
    pub layout: ChannelLayout,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            euler: String::from("ZYX"),
            upsample: 1,
            front_trim: 0,
            back_trim: 0,
            layout: ChannelLayout::Standard,
        }
    }
}

impl LoadSettings {
    pub fn euler_order(&self) -> Result<EulerOrder, InvalidEulerOrder> {
        self.euler.parse()
    }

    pub fn frame_density(&self) -> FrameDensity {
        FrameDensity::from_factor(self.upsample)
    }
}
