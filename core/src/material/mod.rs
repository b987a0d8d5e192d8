//! Materials: a shader class plus named uniform values and texture bindings.
//!
//! A material does not know the layout of the shader it will be drawn with.
//! It only records which uniforms and textures it defines; the shader
//! variant compiler decides which `HAS_` defines that turns on.
//!
//! - [`ShaderId`] names the shader class by value
//! - [`UniformValue`] is a typed uniform
//! - [`TextureBinding`] pairs a shared [`Texture`] with the vertex attribute
//!   that supplies its coordinates

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::mesh::attr;
use crate::texture::Texture;

/// Conventional uniform and texture slot names used by the importer and
/// the built-in shader classes.
pub mod slots {
    /// Diffuse / base color texture.
    pub const DIFFUSE_TEXTURE: &str = "diffuseTexture";
    /// Specular texture.
    pub const SPECULAR_TEXTURE: &str = "specularTexture";
    /// Ambient texture.
    pub const AMBIENT_TEXTURE: &str = "ambientTexture";
    /// Emissive texture.
    pub const EMISSIVE_TEXTURE: &str = "emissiveTexture";
    /// Tangent-space normal map.
    pub const NORMAL_TEXTURE: &str = "normalTexture";
    /// Opacity texture.
    pub const OPACITY_TEXTURE: &str = "opacityTexture";
    /// Light map.
    pub const LIGHTMAP_TEXTURE: &str = "lightmapTexture";
    /// Metallic (B) / roughness (G) texture.
    pub const METALLIC_ROUGHNESS_TEXTURE: &str = "metallicRoughnessTexture";
    /// Ambient occlusion texture.
    pub const OCCLUSION_TEXTURE: &str = "occlusionTexture";

    /// Diffuse color.
    pub const DIFFUSE_COLOR: &str = "diffuse_color";
    /// Specular color.
    pub const SPECULAR_COLOR: &str = "specular_color";
    /// Ambient color.
    pub const AMBIENT_COLOR: &str = "ambient_color";
    /// Emissive color.
    pub const EMISSIVE_COLOR: &str = "emissive_color";
    /// Specular exponent.
    pub const SPECULAR_EXPONENT: &str = "specular_exponent";
    /// Overall opacity.
    pub const OPACITY: &str = "opacity";
    /// PBR metallic factor.
    pub const METALLIC: &str = "metallic";
    /// PBR roughness factor.
    pub const ROUGHNESS: &str = "roughness";
    /// Specular-glossiness glossiness factor.
    pub const GLOSSINESS: &str = "glossinessFactor";

    /// Name of the `index`-th layer of a texture slot (`diffuseTexture`,
    /// `diffuseTexture1`, ...).
    pub fn layered(slot: &str, index: usize) -> String {
        if index == 0 {
            slot.to_string()
        } else {
            format!("{slot}{index}")
        }
    }
}

/// Shader class a material is drawn with.
///
/// Built-in classes are resolved by value; [`Custom`](Self::Custom) names a
/// class registered by the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderId {
    /// Unlit textured.
    Texture,
    /// Per-pixel Phong lighting.
    Phong,
    /// Phong with more than one texture per slot.
    PhongLayered,
    /// Metallic-roughness / specular-glossiness PBR.
    Pbr,
    /// Application-defined class.
    Custom(String),
}

impl ShaderId {
    /// Simple class name, used as the prefix of every shader signature.
    pub fn class_name(&self) -> &str {
        match self {
            Self::Texture => "Texture",
            Self::Phong => "Phong",
            Self::PhongLayered => "PhongLayered",
            Self::Pbr => "Pbr",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// A typed uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `int`
    Int(i32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat4`, column-major.
    Mat4([f32; 16]),
}

impl UniformValue {
    /// GLSL type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Vec2(_) => "float2",
            Self::Vec3(_) => "float3",
            Self::Vec4(_) => "float4",
            Self::Mat4(_) => "mat4",
        }
    }
}

/// A texture bound to a material slot.
#[derive(Debug, Clone)]
pub struct TextureBinding {
    /// Shared texture.
    pub texture: Arc<Texture>,
    /// Vertex attribute supplying this texture's coordinates.
    pub texcoord: String,
}

/// Alpha rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    /// Alpha ignored.
    #[default]
    Opaque,
    /// Alpha blended.
    Blend,
}

/// A material: shader class plus defined uniforms and textures.
///
/// Uniforms and textures keep insertion order so generated descriptors are
/// stable. Setting a name that already exists replaces its value in place.
#[derive(Debug, Clone)]
pub struct Material {
    name: Option<String>,
    shader: ShaderId,
    uniforms: Vec<(String, UniformValue)>,
    textures: Vec<(String, TextureBinding)>,
    alpha_mode: AlphaMode,
}

/// A material shared between render-data objects.
pub type SharedMaterial = Arc<RwLock<Material>>;

impl Material {
    /// Empty material drawn with `shader`.
    pub fn new(shader: ShaderId) -> Self {
        Self {
            name: None,
            shader,
            uniforms: Vec::new(),
            textures: Vec::new(),
            alpha_mode: AlphaMode::Opaque,
        }
    }

    /// Wrap into a [`SharedMaterial`].
    pub fn into_shared(self) -> SharedMaterial {
        Arc::new(RwLock::new(self))
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a uniform.
    #[must_use]
    pub fn with_uniform(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.set_uniform(name, value);
        self
    }

    /// Add a texture sampled with the first texture coordinate set.
    #[must_use]
    pub fn with_texture(mut self, name: impl Into<String>, texture: Arc<Texture>) -> Self {
        self.set_texture(name, texture, attr::texcoord(0));
        self
    }

    /// Material name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Shader class.
    pub fn shader(&self) -> &ShaderId {
        &self.shader
    }

    /// Change the shader class.
    pub fn set_shader(&mut self, shader: ShaderId) {
        self.shader = shader;
    }

    /// Alpha mode.
    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }

    /// Change the alpha mode.
    pub fn set_alpha_mode(&mut self, mode: AlphaMode) {
        self.alpha_mode = mode;
    }

    /// Define or replace a uniform.
    pub fn set_uniform(&mut self, name: impl Into<String>, value: UniformValue) {
        let name = name.into();
        match self.uniforms.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.uniforms.push((name, value)),
        }
    }

    /// Uniform value by name.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Whether a uniform of this name is defined.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|(n, _)| n == name)
    }

    /// Defined uniforms in insertion order.
    pub fn uniforms(&self) -> impl Iterator<Item = (&str, UniformValue)> {
        self.uniforms.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Bind or replace a texture; `texcoord` names the vertex attribute
    /// supplying its coordinates.
    pub fn set_texture(
        &mut self,
        name: impl Into<String>,
        texture: Arc<Texture>,
        texcoord: impl Into<String>,
    ) {
        let name = name.into();
        let binding = TextureBinding {
            texture,
            texcoord: texcoord.into(),
        };
        match self.textures.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = binding,
            None => self.textures.push((name, binding)),
        }
    }

    /// Texture binding by name.
    pub fn texture(&self, name: &str) -> Option<&TextureBinding> {
        self.textures.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    /// Whether a texture of this name is bound.
    pub fn has_texture(&self, name: &str) -> bool {
        self.texture(name).is_some()
    }

    /// Vertex attribute the texture `name` is sampled with.
    pub fn texcoord_attr(&self, name: &str) -> Option<&str> {
        self.texture(name).map(|b| b.texcoord.as_str())
    }

    /// Bound textures in insertion order.
    pub fn textures(&self) -> impl Iterator<Item = (&str, &TextureBinding)> {
        self.textures.iter().map(|(n, b)| (n.as_str(), b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_uniform_replaces_in_place() {
        let mut mat = Material::new(ShaderId::Phong)
            .with_uniform(slots::DIFFUSE_COLOR, UniformValue::Vec4([1.0; 4]))
            .with_uniform(slots::OPACITY, UniformValue::Float(1.0));
        mat.set_uniform(slots::DIFFUSE_COLOR, UniformValue::Vec4([0.5; 4]));

        let names: Vec<_> = mat.uniforms().map(|(n, _)| n).collect();
        assert_eq!(names, [slots::DIFFUSE_COLOR, slots::OPACITY]);
        assert_eq!(
            mat.uniform(slots::DIFFUSE_COLOR),
            Some(UniformValue::Vec4([0.5; 4]))
        );
    }

    #[test]
    fn texture_records_texcoord_attribute() {
        let mut mat = Material::new(ShaderId::Texture);
        mat.set_texture(slots::DIFFUSE_TEXTURE, Arc::new(Texture::white()), "a_texcoord1");
        assert!(mat.has_texture(slots::DIFFUSE_TEXTURE));
        assert!(!mat.has_uniform(slots::DIFFUSE_TEXTURE));
        assert_eq!(mat.texcoord_attr(slots::DIFFUSE_TEXTURE), Some("a_texcoord1"));
    }

    #[test]
    fn layered_slot_names() {
        assert_eq!(slots::layered(slots::DIFFUSE_TEXTURE, 0), "diffuseTexture");
        assert_eq!(slots::layered(slots::DIFFUSE_TEXTURE, 2), "diffuseTexture2");
    }

    #[test]
    fn class_names() {
        assert_eq!(ShaderId::PhongLayered.class_name(), "PhongLayered");
        assert_eq!(ShaderId::Custom("Toon".into()).to_string(), "Toon");
    }
}
