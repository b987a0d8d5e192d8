//! Extension → loader registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::ImportError;
use super::source::SourceScene;

/// Parses model bytes into a [`SourceScene`].
pub trait SceneLoader: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Parse `bytes` read from the file `name`.
    fn load(&self, bytes: &[u8], name: &str) -> Result<SourceScene, ImportError>;
}

/// Maps lower-case file extensions to loaders.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn SceneLoader>>,
}

impl LoaderRegistry {
    /// Registry with no loaders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every loader compiled into this crate.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "gltf")]
        {
            let gltf: Arc<dyn SceneLoader> = Arc::new(super::gltf::GltfSceneLoader);
            registry.register("gltf", Arc::clone(&gltf));
            registry.register("glb", gltf);
        }
        registry
    }

    /// Register `loader` for `extension` (case-insensitive, without dot).
    /// Replaces any previous loader for that extension.
    pub fn register(&mut self, extension: &str, loader: Arc<dyn SceneLoader>) {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        log::debug!("registering {} loader for .{extension}", loader.name());
        self.loaders.insert(extension, loader);
    }

    /// Loader for `extension`.
    pub fn get(&self, extension: &str) -> Option<&Arc<dyn SceneLoader>> {
        self.loaders.get(&extension.to_ascii_lowercase())
    }

    /// Loader for a file name, by its extension.
    pub fn for_file(&self, file: &str) -> Result<&Arc<dyn SceneLoader>, ImportError> {
        let extension = Path::new(file)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.get(extension)
            .ok_or_else(|| ImportError::UnknownExtension(extension.to_string()))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}
