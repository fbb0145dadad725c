use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, AsyncReadExt, LoadContext};
use bevy::prelude::*;
use thiserror::Error;

use crate::animation::Animation;
use crate::config::LoadSettings;
use crate::error::BvhError;

pub struct BvhAnimationPlugin;

impl Plugin for BvhAnimationPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<AnimationAsset>()
            .init_asset_loader::<AnimationAssetLoader>();
    }
}

/// An [`Animation`] loaded through the [`AssetServer`].
#[derive(Asset, TypePath, Deref, DerefMut, Debug)]
pub struct AnimationAsset(pub Animation);

/// Loads `.bvh` files, configured by [`LoadSettings`].
#[derive(Default)]
pub struct AnimationAssetLoader;

impl AssetLoader for AnimationAssetLoader {
    type Asset = AnimationAsset;
    type Settings = LoadSettings;
    type Error = AnimationAssetLoaderError;

    async fn load<'a>(
        &'a self,
        reader: &'a mut Reader<'_>,
        settings: &'a LoadSettings,
        load_context: &'a mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let source = String::from_utf8(bytes)?;

        let name = load_context
            .path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut animation = Animation::new();
        animation.load_bvh_str(name, &source, settings)?;
        Ok(AnimationAsset(animation))
    }

    fn extensions(&self) -> &[&str] {
        &["bvh"]
    }
}

/// Possible errors that can be produced by [`AnimationAssetLoader`]
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AnimationAssetLoaderError {
    /// An [Io](std::io) Error
    #[error("Could not load bvh file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bvh file is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Bvh(#[from] BvhError),
}
