//! Built-in shader classes.
//!
//! | Class | Lighting | Notes |
//! |-------|----------|-------|
//! | `Texture` | none | diffuse color times an optional diffuse texture |
//! | `Phong` | per pixel | specular, emissive, normal and light maps |
//! | `PhongLayered` | per pixel | blends a second diffuse layer |
//! | `Pbr` | per pixel | metallic-roughness mapped onto the Phong surface |
//!
//! The GLSL lives in `graphics/shaders/` and is compiled into the crate.

use vrscene_core::material::ShaderId;

use crate::error::ShaderError;

use super::template::{ShaderTemplate, ShaderTemplateBuilder};

// =============================================================================
// Segment sources
// =============================================================================

const SKIN_VERTEX: &str = include_str!("../../shaders/common/skin.vert");
const NORMAL_MAP_VERTEX: &str = include_str!("../../shaders/common/normal_map.vert");
const ADD_LIGHT_FRAGMENT: &str = include_str!("../../shaders/common/add_light.frag");

const TEXTURE_VERTEX: &str = include_str!("../../shaders/texture/texture.vert");
const TEXTURE_FRAGMENT: &str = include_str!("../../shaders/texture/texture.frag");

const PHONG_VERTEX: &str = include_str!("../../shaders/phong/phong.vert");
const PHONG_FRAGMENT: &str = include_str!("../../shaders/phong/phong.frag");
const PHONG_SURFACE: &str = include_str!("../../shaders/phong/surface.frag");
const LAYERED_SURFACE: &str = include_str!("../../shaders/phong/layered_surface.frag");

const PBR_SURFACE: &str = include_str!("../../shaders/pbr/surface.frag");

// =============================================================================
// Descriptors
// =============================================================================

const LIT_VERTEX_ATTRIBUTES: &str = "float3 a_position float3 a_normal float4 a_tangent \
     float2 a_texcoord float2 a_texcoord1 float4 a_bone_weights int4 a_bone_indices";

const PHONG_UNIFORMS: &str = "float4 ambient_color float4 diffuse_color float4 specular_color \
     float4 emissive_color float specular_exponent float opacity";

/// Every built-in class, keyed by its id.
pub fn builtin_templates() -> Result<Vec<(ShaderId, ShaderTemplate)>, ShaderError> {
    Ok(vec![
        (ShaderId::Texture, texture()?),
        (ShaderId::Phong, phong()?),
        (ShaderId::PhongLayered, phong_layered()?),
        (ShaderId::Pbr, pbr()?),
    ])
}

/// Unlit textured.
pub fn texture() -> Result<ShaderTemplate, ShaderError> {
    ShaderTemplate::builder(ShaderId::Texture.class_name())
        .segment("VertexTemplate", TEXTURE_VERTEX)
        .segment("VertexSkinShader", SKIN_VERTEX)
        .segment("FragmentTemplate", TEXTURE_FRAGMENT)
        .uniforms("float4 diffuse_color float opacity")
        .textures("sampler2D diffuseTexture")
        .vertex_attributes(
            "float3 a_position float2 a_texcoord float4 a_bone_weights int4 a_bone_indices",
        )
        .build()
}

fn lit(id: ShaderId, surface: &str) -> ShaderTemplateBuilder {
    ShaderTemplate::builder(id.class_name())
        .segment("VertexTemplate", PHONG_VERTEX)
        .segment("VertexSkinShader", SKIN_VERTEX)
        .segment("VertexNormalShader", NORMAL_MAP_VERTEX)
        .segment("FragmentTemplate", PHONG_FRAGMENT)
        .segment("FragmentSurface", surface)
        .segment("FragmentAddLight", ADD_LIGHT_FRAGMENT)
        .vertex_attributes(LIT_VERTEX_ATTRIBUTES)
}

/// Per-pixel Phong.
pub fn phong() -> Result<ShaderTemplate, ShaderError> {
    lit(ShaderId::Phong, PHONG_SURFACE)
        .uniforms(PHONG_UNIFORMS)
        .textures(
            "sampler2D diffuseTexture sampler2D specularTexture sampler2D emissiveTexture \
             sampler2D normalTexture sampler2D lightmapTexture",
        )
        .build()
}

/// Phong with a second diffuse layer.
pub fn phong_layered() -> Result<ShaderTemplate, ShaderError> {
    lit(ShaderId::PhongLayered, LAYERED_SURFACE)
        .uniforms(PHONG_UNIFORMS)
        .textures("sampler2D diffuseTexture sampler2D diffuseTexture1 sampler2D specularTexture")
        .build()
}

/// Metallic-roughness.
pub fn pbr() -> Result<ShaderTemplate, ShaderError> {
    lit(ShaderId::Pbr, PBR_SURFACE)
        .uniforms("float4 diffuse_color float4 emissive_color float metallic float roughness")
        .textures(
            "sampler2D diffuseTexture sampler2D metallicRoughnessTexture \
             sampler2D occlusionTexture sampler2D emissiveTexture sampler2D normalTexture",
        )
        .build()
}
