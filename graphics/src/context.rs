//! Render context: owns the shader registry, the compiled-shader cache and
//! the backend, and resolves shaders for render objects.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use vrscene_core::light::Light;
use vrscene_core::scene::{NodeId, RenderData, SceneGraph};

use crate::backend::{DummyBackend, ShaderBackend};
use crate::cache::{CompiledShader, CompiledShaderCache};
use crate::error::ShaderError;
use crate::shader::{
    GeneratorOptions, Overrides, ShaderRegistry, ShaderTemplate, ShaderVariant, generate,
};

/// Render context settings.
///
/// ```toml
/// multiview = true
/// max_bones = 60
/// glsl_version = "300 es"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderContextConfig {
    /// Render both eyes in one pass (`GL_OVR_multiview2`).
    pub multiview: bool,
    /// Bone matrices available to skinned shaders.
    pub max_bones: u32,
    /// Text after `#version` in generated source.
    pub glsl_version: String,
}

impl Default for RenderContextConfig {
    fn default() -> Self {
        let options = GeneratorOptions::default();
        Self {
            multiview: false,
            max_bones: options.max_bones,
            glsl_version: options.glsl_version,
        }
    }
}

impl RenderContextConfig {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ShaderError> {
        toml::from_str(text).map_err(|e| ShaderError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ShaderError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ShaderError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        log::info!(
            "loaded render context config from {} (multiview: {})",
            path.display(),
            config.multiview
        );
        Ok(config)
    }

    fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            glsl_version: self.glsl_version.clone(),
            max_bones: self.max_bones,
        }
    }
}

/// One rendering context.
///
/// Every context has its own cache, so two contexts never share compiled
/// programs. Shader resolution is meant for the render thread; the cache
/// lock serializes callers anyway.
pub struct RenderContext {
    registry: ShaderRegistry,
    cache: CompiledShaderCache,
    backend: Arc<dyn ShaderBackend>,
    config: RenderContextConfig,
    options: GeneratorOptions,
    generated: AtomicUsize,
}

impl RenderContext {
    /// Context with the built-in shader classes and `backend`.
    pub fn new(
        backend: Arc<dyn ShaderBackend>,
        config: RenderContextConfig,
    ) -> Result<Self, ShaderError> {
        Ok(Self::with_registry(ShaderRegistry::with_builtins()?, backend, config))
    }

    /// Context over the dummy backend with default settings.
    pub fn headless() -> Result<Self, ShaderError> {
        Self::new(Arc::new(DummyBackend::new()), RenderContextConfig::default())
    }

    pub fn with_registry(
        registry: ShaderRegistry,
        backend: Arc<dyn ShaderBackend>,
        config: RenderContextConfig,
    ) -> Self {
        log::info!(
            "render context on {} ({} shader classes, multiview: {})",
            backend.name(),
            registry.len(),
            config.multiview
        );
        Self {
            registry,
            cache: CompiledShaderCache::new(),
            options: config.generator_options(),
            backend,
            config,
            generated: AtomicUsize::new(0),
        }
    }

    pub fn registry(&self) -> &ShaderRegistry {
        &self.registry
    }

    /// Register an application shader class.
    pub fn registry_mut(&mut self) -> &mut ShaderRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &RenderContextConfig {
        &self.config
    }

    pub fn cache(&self) -> &CompiledShaderCache {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn ShaderBackend> {
        &self.backend
    }

    /// Times source was generated, i.e. cache misses that reached the
    /// generator.
    pub fn generation_count(&self) -> usize {
        self.generated.load(Ordering::Acquire)
    }

    /// The variant `render_data` would use under `lights`, without
    /// compiling anything.
    pub fn variant_for(
        &self,
        render_data: &RenderData,
        lights: &[Light],
    ) -> Result<(Arc<ShaderTemplate>, ShaderVariant), ShaderError> {
        let material = render_data.material().read();
        let template = Arc::clone(self.registry.get(material.shader())?);
        let variant = ShaderVariant::resolve(
            &template,
            &material,
            render_data.mesh().layout(),
            lights,
            &self.overrides(render_data, lights),
        );
        Ok((template, variant))
    }

    /// Signature of the variant `render_data` would use under `lights`.
    pub fn signature_for(
        &self,
        render_data: &RenderData,
        lights: &[Light],
    ) -> Result<String, ShaderError> {
        Ok(self.variant_for(render_data, lights)?.1.signature)
    }

    /// Pick, generate and compile (if needed) the program for
    /// `render_data` lit by `lights`, and bind it.
    pub fn resolve_shader(
        &self,
        render_data: &mut RenderData,
        lights: &[Light],
    ) -> Result<Arc<CompiledShader>, ShaderError> {
        let (template, variant) = self.variant_for(render_data, lights)?;
        let (compiled, hit) = self
            .cache
            .get_or_compile(&variant.signature, || self.compile(&template, &variant))?;
        if hit {
            log::trace!("shader cache hit {}", variant.signature);
        }
        render_data.bind_shader(compiled.handle);
        Ok(compiled)
    }

    /// Resolve every render object below `root`, lit by every light below
    /// `root`. Returns how many objects were bound.
    pub fn resolve_subtree(
        &self,
        graph: &mut SceneGraph,
        root: NodeId,
    ) -> Result<usize, ShaderError> {
        let nodes: Vec<NodeId> = graph.depth_first(root).collect();
        let lights: Vec<Light> = nodes
            .iter()
            .filter_map(|&id| graph.components(id)?.light.clone())
            .collect();
        let mut bound = 0;
        for id in nodes {
            if let Some(render_data) = graph
                .components_mut(id)
                .and_then(|c| c.render_data.as_mut())
            {
                self.resolve_shader(render_data, &lights)?;
                bound += 1;
            }
        }
        Ok(bound)
    }

    /// Drop every compiled program.
    pub fn teardown(&self) {
        log::debug!("render context teardown ({} shaders)", self.cache.len());
        self.cache.clear();
        self.backend.release_all();
    }

    fn overrides(&self, render_data: &RenderData, lights: &[Light]) -> Overrides {
        let lit = render_data.lighting_enabled && !lights.is_empty();
        let shadows = lit
            && lights
                .iter()
                .any(|l| l.casts_shadows() && l.kind().shadow_vertex_source().is_some());
        Overrides::new()
            .with("MULTIVIEW", self.config.multiview)
            .with("LIGHTSOURCES", lit)
            .with("SHADOWS", shadows)
    }

    fn compile(
        &self,
        template: &ShaderTemplate,
        variant: &ShaderVariant,
    ) -> Result<CompiledShader, ShaderError> {
        vrscene_core::profile_scope!("generate_shader");
        let source = generate(template, variant, &self.options)?;
        self.generated.fetch_add(1, Ordering::AcqRel);
        let handle = self
            .backend
            .compile(&variant.signature, &source.vertex, &source.fragment)?;
        log::debug!("compiled shader {} as {handle:?}", variant.signature);
        Ok(CompiledShader {
            handle,
            signature: variant.signature.clone(),
            vertex_source: source.vertex,
            fragment_source: source.fragment,
            uniforms: source.uniforms,
            textures: source.textures,
            vertex_attributes: source.vertex_attributes,
        })
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("backend", &self.backend.name())
            .field("classes", &self.registry.len())
            .field("cached", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_toml() {
        let config =
            RenderContextConfig::from_toml_str("multiview = true\nmax_bones = 32\n").unwrap();
        assert!(config.multiview);
        assert_eq!(config.max_bones, 32);
        assert_eq!(config.glsl_version, "300 es");
        assert!(matches!(
            RenderContextConfig::from_toml_str("max_bones = \"many\""),
            Err(ShaderError::Config(_))
        ));
    }

    #[test]
    fn headless_context_has_builtins() {
        let context = RenderContext::headless().unwrap();
        assert_eq!(context.registry().len(), 4);
        assert!(context.cache().is_empty());
        assert_eq!(context.generation_count(), 0);
    }
}
