//! Texture requests issued while building materials.
//!
//! Embedded textures (`*N`) are decoded immediately. External references
//! are resolved to a key by a [`TextureResolver`], shared through the
//! context's [`TextureCache`], and loaded on the task pool; the request's
//! completion counter tracks every load it starts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::tasks::TaskPool;
use crate::texture::{ImageData, SamplerSettings, Texture, TextureCache};

use super::ImportError;
use super::events::{AssetEvent, EventDispatcher};
use super::request::AssetRequest;
use super::source::SourceScene;

/// External collaborator that locates and decodes texture files.
pub trait TextureResolver: Send + Sync {
    /// Turn a reference found in `model_file` into a cache key.
    fn resolve(&self, model_file: &str, reference: &str) -> String {
        let dir = Path::new(model_file).parent().unwrap_or_else(|| Path::new(""));
        dir.join(reference).to_string_lossy().replace('\\', "/")
    }

    /// Load and decode the texture behind `key`.
    fn load(&self, key: &str) -> Result<ImageData, ImportError>;
}

/// Reads textures from the file system relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileTextureResolver {
    root: PathBuf,
}

impl FileTextureResolver {
    /// Resolve keys relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TextureResolver for FileTextureResolver {
    fn load(&self, key: &str) -> Result<ImageData, ImportError> {
        let path = self.root.join(key);
        let bytes = std::fs::read(&path).map_err(|source| ImportError::Io {
            path: path.clone(),
            source,
        })?;
        ImageData::decode(&bytes).map_err(|e| ImportError::TextureDecode {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

/// Hands out textures for material slots.
pub trait TextureProvider {
    /// Texture for `reference` as written in the model. Always returns a
    /// texture; failures surface later through the texture itself and the
    /// request's events.
    fn request(&self, reference: &str, sampler: SamplerSettings) -> Arc<Texture>;
}

/// Index of an embedded texture reference (`*3` → `3`).
pub fn embedded_index(reference: &str) -> Option<usize> {
    reference.strip_prefix('*')?.parse().ok()
}

/// Decode embedded texture `index` of `scene`.
pub fn decode_embedded(scene: &SourceScene, index: usize) -> Result<ImageData, ImportError> {
    let key = format!("*{index}");
    let embedded = scene
        .textures
        .get(index)
        .ok_or_else(|| ImportError::TextureDecode {
            key: key.clone(),
            message: "no such embedded texture".to_string(),
        })?;
    ImageData::decode(&embedded.bytes).map_err(|e| ImportError::TextureDecode {
        key,
        message: e.to_string(),
    })
}

/// Provider used by the asset loader: cache, resolver, task pool and the
/// request's completion counter.
#[derive(Clone)]
pub struct RequestTextures {
    resolver: Arc<dyn TextureResolver>,
    cache: Arc<TextureCache>,
    pool: Option<Arc<TaskPool>>,
    request: Arc<AssetRequest>,
    dispatcher: Arc<EventDispatcher>,
}

impl RequestTextures {
    /// Create a provider. Without a pool, textures load on the calling
    /// thread.
    pub fn new(
        resolver: Arc<dyn TextureResolver>,
        cache: Arc<TextureCache>,
        pool: Option<Arc<TaskPool>>,
        request: Arc<AssetRequest>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            resolver,
            cache,
            pool,
            request,
            dispatcher,
        }
    }

    fn start_load(&self, key: String, texture: Arc<Texture>) {
        if !self.request.texture_started() {
            log::warn!("texture '{key}' requested after {} completed", self.request.file());
        }
        let resolver = Arc::clone(&self.resolver);
        let request = Arc::clone(&self.request);
        let dispatcher = Arc::clone(&self.dispatcher);
        let job = move || {
            crate::profile_scope!("load_texture");
            let event = match resolver.load(&key) {
                Ok(image) => {
                    texture.set_image(image);
                    AssetEvent::TextureLoaded { key, texture }
                }
                Err(err) => {
                    let error = err.to_string();
                    texture.fail(error.clone());
                    request.add_error(error.clone());
                    AssetEvent::TextureError { key, error }
                }
            };
            dispatcher.dispatch(request.listeners(), &event);
            request.complete_one(&dispatcher);
        };
        match &self.pool {
            Some(pool) => {
                pool.spawn(job);
            }
            None => job(),
        }
    }
}

impl TextureProvider for RequestTextures {
    fn request(&self, reference: &str, sampler: SamplerSettings) -> Arc<Texture> {
        let key = self.resolver.resolve(self.request.file(), reference);
        if self.request.uses_cache() {
            let (texture, created) = self.cache.get_or_create(&key, sampler);
            if created {
                self.start_load(key, Arc::clone(&texture));
            } else {
                log::trace!("texture cache hit for '{key}'");
            }
            texture
        } else {
            let texture = Arc::new(Texture::new(key.clone(), sampler));
            self.start_load(key, Arc::clone(&texture));
            texture
        }
    }
}
