//! Shader variant compiler.
//!
//! A shader class ([`ShaderTemplate`]) is registered once. Each time a
//! render object needs a program, the class is resolved against the
//! object's material, vertex layout and active lights into a
//! [`ShaderVariant`] whose signature keys the compiled-shader cache. Source
//! is generated ([`generate`]) only for signatures not seen before.
//!
//! # Example
//!
//! ```ignore
//! use vrscene_graphics::shader::{ShaderRegistry, ShaderVariant, Overrides, generate};
//!
//! let registry = ShaderRegistry::with_builtins()?;
//! let template = registry.get(material.shader())?;
//! let variant = ShaderVariant::resolve(template, &material, mesh.layout(), &lights, &Overrides::new());
//! let source = generate(template, &variant, &GeneratorOptions::default())?;
//! ```

pub mod builtin;
pub mod descriptor;
pub mod generator;
pub mod signature;
pub mod template;

use std::collections::HashMap;
use std::sync::Arc;

use vrscene_core::material::ShaderId;

use crate::error::ShaderError;

pub use descriptor::{Descriptor, DescriptorEntry, UniformSlot, ValueType};
pub use generator::{GeneratedSource, GeneratorOptions, generate};
pub use signature::{LIGHT_CLASS_ORDER, Overrides, ShaderVariant, TextureUse, count_light_classes};
pub use template::{RESERVED_TOKENS, ShaderStage, ShaderTemplate, ShaderTemplateBuilder};

/// Shader classes by id.
#[derive(Debug, Clone, Default)]
pub struct ShaderRegistry {
    templates: HashMap<ShaderId, Arc<ShaderTemplate>>,
}

impl ShaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in class.
    pub fn with_builtins() -> Result<Self, ShaderError> {
        let mut registry = Self::new();
        for (id, template) in builtin::builtin_templates()? {
            registry.register(id, template);
        }
        Ok(registry)
    }

    /// Register `template` under `id`, replacing any previous class.
    pub fn register(&mut self, id: ShaderId, template: ShaderTemplate) {
        if template.class_name() != id.class_name() {
            log::warn!(
                "shader class {} registered under id {id}; signatures use the class name",
                template.class_name()
            );
        }
        if self.templates.insert(id.clone(), Arc::new(template)).is_some() {
            log::debug!("replaced shader class {id}");
        }
    }

    pub fn get(&self, id: &ShaderId) -> Result<&Arc<ShaderTemplate>, ShaderError> {
        self.templates
            .get(id)
            .ok_or_else(|| ShaderError::UnknownShader(id.to_string()))
    }

    pub fn contains(&self, id: &ShaderId) -> bool {
        self.templates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
