//! Sampler settings carried by imported textures.

use serde::Deserialize;

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Nearest neighbor filtering.
    Nearest,
    /// Linear filtering.
    #[default]
    Linear,
}

/// Texture wrapping behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Repeat.
    #[default]
    Repeat,
    /// Clamp to edge.
    ClampToEdge,
    /// Mirrored repeat.
    MirrorRepeat,
}

/// Filtering and wrapping for one texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerSettings {
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Wrap along U.
    pub wrap_s: WrapMode,
    /// Wrap along V.
    pub wrap_t: WrapMode,
}

impl SamplerSettings {
    /// Nearest-neighbour sampling, repeat wrapping.
    pub fn nearest() -> Self {
        Self {
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            ..Self::default()
        }
    }

    /// Set both wrap modes.
    #[must_use]
    pub fn with_wrap(mut self, wrap_s: WrapMode, wrap_t: WrapMode) -> Self {
        self.wrap_s = wrap_s;
        self.wrap_t = wrap_t;
        self
    }
}
