//! Model loading front end.
//!
//! [`AssetLoader`] ties together the loader registry, the texture resolver
//! and cache, the task pool and the event dispatcher. The synchronous path
//! builds straight into the live graph; the asynchronous path builds into
//! a detached graph on the pool and hands the subtree to the render thread
//! through a [`RenderThreadQueue`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::scene::{NodeId, SceneGraph};
use crate::tasks::{RenderThreadQueue, TaskHandle, TaskPool};
use crate::texture::TextureCache;

use super::ImportError;
use super::builder::import_scene;
use super::events::{AssetEvent, EventDispatcher};
use super::registry::LoaderRegistry;
use super::request::AssetRequest;
use super::settings::AssetConfig;
use super::source::SourceScene;
use super::textures::{FileTextureResolver, RequestTextures, TextureResolver};

/// Loads model files into a [`SceneGraph`].
pub struct AssetLoader {
    shared: Shared,
    pool: Arc<TaskPool>,
    config: AssetConfig,
}

impl AssetLoader {
    /// Loader reading models and textures below `root`, with default
    /// configuration and every built-in scene loader.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, AssetConfig::default())
    }

    /// Loader reading below `root` with `config`.
    pub fn with_config(root: impl Into<PathBuf>, config: AssetConfig) -> Self {
        let root = root.into();
        let pool = TaskPool::new(config.tasks.min_workers, config.tasks.max_workers);
        log::debug!(
            "asset loader rooted at {} ({} task workers)",
            root.display(),
            pool.worker_count()
        );
        let pool = Arc::new(pool);
        Self {
            shared: Shared {
                resolver: Arc::new(FileTextureResolver::new(root.clone())),
                root,
                registry: LoaderRegistry::with_defaults(),
                cache: Arc::new(TextureCache::new()),
                texture_pool: config.textures.background.then(|| Arc::clone(&pool)),
                dispatcher: Arc::new(EventDispatcher::new()),
            },
            pool,
            config,
        }
    }

    /// Replace the scene loader registry.
    #[must_use]
    pub fn with_registry(mut self, registry: LoaderRegistry) -> Self {
        self.shared.registry = registry;
        self
    }

    /// Replace the texture resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn TextureResolver>) -> Self {
        self.shared.resolver = resolver;
        self
    }

    /// Replace the event dispatcher (loader and context listeners).
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.shared.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.shared.registry
    }

    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// The texture cache shared by every request of this loader.
    pub fn texture_cache(&self) -> &Arc<TextureCache> {
        &self.shared.cache
    }

    pub fn pool(&self) -> &Arc<TaskPool> {
        &self.pool
    }

    /// A request for `file` carrying the configured defaults.
    pub fn request(&self, file: impl Into<String>) -> AssetRequest {
        AssetRequest::new(file)
            .with_settings(self.config.import.settings)
            .use_cache(self.config.textures.use_cache)
    }

    /// Load `request` into `graph` on the calling thread.
    ///
    /// The new root is a top-level node named after the file stem and is
    /// always attached. On a fatal error (unreadable file, unknown
    /// extension, parse failure) it stays empty, the error is recorded on
    /// the request, [`AssetEvent::ModelError`] fires and the request
    /// completes.
    pub fn load_model(&self, graph: &mut SceneGraph, request: Arc<AssetRequest>) -> NodeId {
        crate::profile_function!();
        let root = graph.create_node(Some(&root_name(request.file())));
        match self.shared.read_model(request.file()) {
            Ok(scene) => {
                self.shared.build(graph, &scene, root, &request);
                self.shared.finish(&request, root);
            }
            Err(err) => {
                log::error!("failed to load {}: {err}", request.file());
                request.set_root(root);
                self.shared.fail(&request, err.to_string());
            }
        }
        root
    }

    /// Load `request` from an in-memory description, skipping file access
    /// and parsing.
    pub fn load_scene(
        &self,
        graph: &mut SceneGraph,
        scene: &SourceScene,
        request: Arc<AssetRequest>,
    ) -> NodeId {
        let root = graph.create_node(Some(&root_name(request.file())));
        self.shared.build(graph, scene, root, &request);
        self.shared.finish(&request, root);
        root
    }

    /// Load `request` on the task pool.
    ///
    /// Nodes, meshes and skeletons are built into a detached graph; the
    /// subtree is attached when the render thread drains `queue`, and only
    /// then does [`AssetEvent::ModelLoaded`] fire. A fatal error still
    /// attaches an empty root so callers always get a node.
    pub fn load_model_async(
        &self,
        request: Arc<AssetRequest>,
        queue: &RenderThreadQueue,
    ) -> TaskHandle<Result<(), ImportError>> {
        let loader = self.shared.clone();
        let queue = queue.clone();
        self.pool.spawn(move || {
            crate::profile_scope!("load_model_async");
            let name = root_name(request.file());
            match loader.read_model(request.file()) {
                Ok(scene) => {
                    let mut detached = SceneGraph::new();
                    let root = detached.create_node(Some(&name));
                    loader.build(&mut detached, &scene, root, &request);
                    queue.post(move |graph| match graph.graft(detached, root, None) {
                        Some(root) => loader.finish(&request, root),
                        None => {
                            let err = ImportError::EmptyScene(request.file().to_string());
                            loader.fail(&request, err.to_string());
                        }
                    });
                    Ok(())
                }
                Err(err) => {
                    let message = err.to_string();
                    queue.post(move |graph| {
                        let root = graph.create_node(Some(&name));
                        request.set_root(root);
                        loader.fail(&request, message);
                    });
                    Err(err)
                }
            }
        })
    }

    /// Clear shared state at context teardown.
    pub fn teardown(&self) {
        self.shared.cache.clear();
    }
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("root", &self.shared.root)
            .field("extensions", &self.shared.registry.extensions())
            .field("cached_textures", &self.shared.cache.len())
            .finish()
    }
}

/// The parts of [`AssetLoader`] a background load needs, cloned onto the
/// pool and into the render-thread callback.
#[derive(Clone)]
struct Shared {
    root: PathBuf,
    registry: LoaderRegistry,
    resolver: Arc<dyn TextureResolver>,
    cache: Arc<TextureCache>,
    /// `None` decodes textures inline.
    texture_pool: Option<Arc<TaskPool>>,
    dispatcher: Arc<EventDispatcher>,
}

impl Shared {
    fn read_model(&self, file: &str) -> Result<SourceScene, ImportError> {
        let loader = self.registry.for_file(file)?;
        let path = self.root.join(file);
        let bytes = std::fs::read(&path).map_err(|source| ImportError::Io { path, source })?;
        log::debug!("parsing {file} with the {} loader", loader.name());
        loader.load(&bytes, file)
    }

    fn build(&self, graph: &mut SceneGraph, scene: &SourceScene, root: NodeId, request: &Arc<AssetRequest>) {
        let textures = RequestTextures::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.cache),
            self.texture_pool.clone(),
            Arc::clone(request),
            Arc::clone(&self.dispatcher),
        );
        let outcome = import_scene(graph, scene, root, request.settings(), &textures);
        request.extend_errors(outcome.errors);
    }

    fn finish(&self, request: &AssetRequest, root: NodeId) {
        request.set_root(root);
        let event = AssetEvent::ModelLoaded {
            file: request.file().to_string(),
            root,
            errors: request.errors(),
        };
        log::info!("loaded {} ({} errors)", request.file(), request.errors().len());
        self.dispatcher.dispatch(request.listeners(), &event);
        request.complete_one(&self.dispatcher);
    }

    fn fail(&self, request: &AssetRequest, error: String) {
        request.add_error(error.clone());
        let event = AssetEvent::ModelError {
            file: request.file().to_string(),
            error,
        };
        self.dispatcher.dispatch(request.listeners(), &event);
        request.complete_one(&self.dispatcher);
    }
}

fn root_name(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file)
        .to_string()
}
