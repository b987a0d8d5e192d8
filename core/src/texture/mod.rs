//! Textures whose pixels arrive asynchronously.
//!
//! A [`Texture`] is created in the `Pending` state by the importer and shared
//! via `Arc` between every material that references the same resolved key.
//! Whichever thread finishes decoding calls [`Texture::set_image`] or
//! [`Texture::fail`]; a failed texture renders as flat white.

mod cache;
mod sampler;

pub use cache::TextureCache;
pub use sampler::{FilterMode, SamplerSettings, WrapMode};

use std::sync::Arc;

use parking_lot::RwLock;

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 rows.
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// A single opaque white pixel.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![255; 4],
        }
    }

    /// Decode an encoded image (PNG, JPEG) into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

/// Load state of a [`Texture`].
#[derive(Debug, Clone)]
pub enum TextureState {
    /// Decode has not completed.
    Pending,
    /// Pixels are available.
    Ready(Arc<ImageData>),
    /// Decode failed; the white substitute is bound instead.
    Failed {
        /// Error reported by the loader.
        reason: String,
        /// Substitute image.
        substitute: Arc<ImageData>,
    },
}

/// A texture shared between materials.
#[derive(Debug)]
pub struct Texture {
    key: String,
    sampler: SamplerSettings,
    state: RwLock<TextureState>,
}

impl Texture {
    /// Create a pending texture for `key` (a resolved path or embedded id).
    pub fn new(key: impl Into<String>, sampler: SamplerSettings) -> Self {
        Self {
            key: key.into(),
            sampler,
            state: RwLock::new(TextureState::Pending),
        }
    }

    /// A ready 1x1 white texture.
    pub fn white() -> Self {
        Self {
            key: "<white>".to_string(),
            sampler: SamplerSettings::default(),
            state: RwLock::new(TextureState::Ready(Arc::new(ImageData::white()))),
        }
    }

    /// Resolved key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Sampler settings.
    pub fn sampler(&self) -> SamplerSettings {
        self.sampler
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> TextureState {
        self.state.read().clone()
    }

    /// Whether pixels (real or substitute) are available.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.state.read(), TextureState::Pending)
    }

    /// Whether the load failed and the substitute is in use.
    pub fn is_failed(&self) -> bool {
        matches!(*self.state.read(), TextureState::Failed { .. })
    }

    /// Image to bind: the decoded pixels or the white substitute.
    pub fn image(&self) -> Option<Arc<ImageData>> {
        match &*self.state.read() {
            TextureState::Pending => None,
            TextureState::Ready(image) => Some(Arc::clone(image)),
            TextureState::Failed { substitute, .. } => Some(Arc::clone(substitute)),
        }
    }

    /// Install decoded pixels.
    pub fn set_image(&self, image: ImageData) {
        *self.state.write() = TextureState::Ready(Arc::new(image));
    }

    /// Mark the load as failed and bind the white substitute.
    pub fn fail(&self, reason: impl Into<String>) {
        *self.state.write() = TextureState::Failed {
            reason: reason.into(),
            substitute: Arc::new(ImageData::white()),
        };
    }
}
