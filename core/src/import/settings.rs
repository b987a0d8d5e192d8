//! Import settings and asset configuration.

use std::path::Path;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::ImportError;

bitflags! {
    /// Switches controlling what the importer builds.
    ///
    /// Reads from TOML as a `|`-separated string, e.g.
    /// `settings = "NO_LIGHTING | NO_ANIMATION"`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ImportSettings: u32 {
        /// Skip lights; materials use the unlit shader class.
        const NO_LIGHTING = 1 << 0;
        /// Skip animations.
        const NO_ANIMATION = 1 << 1;
        /// Skip textures.
        const NO_TEXTURING = 1 << 2;
        /// Skip morph targets.
        const NO_MORPH = 1 << 3;
        /// Mark imported animations to start on attach.
        const START_ANIMATIONS = 1 << 4;
        /// Generate tangents for meshes that have normals and texture
        /// coordinates but no tangents.
        const CALCULATE_TANGENTS = 1 << 5;
    }
}

impl ImportSettings {
    /// The default set: tangents generated, everything else imported.
    pub fn recommended() -> Self {
        Self::CALCULATE_TANGENTS
    }

    /// Whether lights are imported and materials are lit.
    pub fn lighting(self) -> bool {
        !self.contains(Self::NO_LIGHTING)
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::recommended()
    }
}

/// `[import]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    /// Default settings for requests that do not override them.
    pub settings: ImportSettings,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            settings: ImportSettings::recommended(),
        }
    }
}

/// `[textures]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextureSection {
    /// Share decoded textures through the context's texture cache.
    pub use_cache: bool,
    /// Decode textures on the task pool. When off, decoding happens on the
    /// thread that builds the materials.
    pub background: bool,
}

impl Default for TextureSection {
    fn default() -> Self {
        Self {
            use_cache: true,
            background: true,
        }
    }
}

/// `[tasks]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaskSection {
    /// Workers started with the pool.
    pub min_workers: usize,
    /// Upper bound the pool may grow to.
    pub max_workers: usize,
}

impl Default for TaskSection {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: 4,
        }
    }
}

/// Asset loader configuration, usually read from `assets.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Import defaults.
    pub import: ImportSection,
    /// Texture loading.
    pub textures: TextureSection,
    /// Background task pool.
    pub tasks: TaskSection,
}

impl AssetConfig {
    /// Parse from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ImportError> {
        toml::from_str(text).map_err(|e| ImportError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!(
            "loaded asset config from {} (settings: {:?})",
            path.display(),
            config.import.settings
        );
        Ok(config)
    }
}
