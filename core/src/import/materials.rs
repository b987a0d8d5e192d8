//! Material construction and shader class selection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::material::{AlphaMode, Material, ShaderId, SharedMaterial, UniformValue, slots};
use crate::mesh::attr;
use crate::texture::Texture;

use super::context::ImportContext;
use super::settings::ImportSettings;
use super::source::{ShadingWorkflow, SourceMaterial, SourceTexture, TextureKind};
use super::textures::{decode_embedded, embedded_index};

/// Key under which the fallback material is cached.
const DEFAULT_MATERIAL: usize = usize::MAX;

/// Material slot name for a texture kind.
pub fn texture_slot(kind: TextureKind) -> &'static str {
    match kind {
        TextureKind::Diffuse => slots::DIFFUSE_TEXTURE,
        TextureKind::Specular => slots::SPECULAR_TEXTURE,
        TextureKind::Ambient => slots::AMBIENT_TEXTURE,
        TextureKind::Emissive => slots::EMISSIVE_TEXTURE,
        TextureKind::Normal => slots::NORMAL_TEXTURE,
        TextureKind::Opacity => slots::OPACITY_TEXTURE,
        TextureKind::Lightmap => slots::LIGHTMAP_TEXTURE,
        TextureKind::MetallicRoughness => slots::METALLIC_ROUGHNESS_TEXTURE,
        TextureKind::Occlusion => slots::OCCLUSION_TEXTURE,
    }
}

/// Shader class for a material.
///
/// Unlit when lighting is off; PBR when the material declares a PBR
/// workflow; layered Phong when any texture kind has more than one texture;
/// Phong otherwise.
pub fn select_shader(material: &SourceMaterial, lighting: bool) -> ShaderId {
    if !lighting {
        return ShaderId::Texture;
    }
    if material.workflow != ShadingWorkflow::Classic {
        return ShaderId::Pbr;
    }
    let mut per_kind: HashMap<TextureKind, usize> = HashMap::new();
    for tex in &material.textures {
        *per_kind.entry(tex.kind).or_default() += 1;
    }
    if per_kind.values().any(|&n| n > 1) {
        ShaderId::PhongLayered
    } else {
        ShaderId::Phong
    }
}

/// Shared material for source material `index`, built on first use.
pub(crate) fn material_for(ctx: &mut ImportContext<'_>, index: Option<usize>) -> SharedMaterial {
    let key = match index {
        Some(i) if i < ctx.scene.materials.len() => i,
        Some(i) => {
            ctx.error(format!(
                "material {i} out of range ({} materials)",
                ctx.scene.materials.len()
            ));
            DEFAULT_MATERIAL
        }
        None => DEFAULT_MATERIAL,
    };
    if let Some(material) = ctx.materials.get(&key) {
        return Arc::clone(material);
    }
    let scene = ctx.scene;
    let material = match scene.materials.get(key) {
        Some(source) => build_material(ctx, source),
        None => default_material(ctx.lighting),
    };
    let shared = material.into_shared();
    ctx.materials.insert(key, Arc::clone(&shared));
    shared
}

fn default_material(lighting: bool) -> Material {
    let shader = if lighting {
        ShaderId::Phong
    } else {
        ShaderId::Texture
    };
    Material::new(shader).with_uniform(slots::DIFFUSE_COLOR, UniformValue::Vec4([1.0; 4]))
}

fn build_material(ctx: &mut ImportContext<'_>, source: &SourceMaterial) -> Material {
    let mut material = Material::new(select_shader(source, ctx.lighting));
    if let Some(name) = &source.name {
        material = material.with_name(name.clone());
    }

    let opacity = source.opacity.unwrap_or(1.0);
    let mut diffuse = source.diffuse.unwrap_or([1.0; 4]);
    diffuse[3] *= opacity;
    material.set_uniform(slots::DIFFUSE_COLOR, UniformValue::Vec4(diffuse));
    let colors = [
        (slots::SPECULAR_COLOR, source.specular),
        (slots::AMBIENT_COLOR, source.ambient),
        (slots::EMISSIVE_COLOR, source.emissive),
    ];
    for (slot, color) in colors {
        if let Some(color) = color {
            material.set_uniform(slot, UniformValue::Vec4(color));
        }
    }
    if let Some(shininess) = source.shininess {
        material.set_uniform(slots::SPECULAR_EXPONENT, UniformValue::Float(shininess));
    }
    if let Some(opacity) = source.opacity {
        material.set_uniform(slots::OPACITY, UniformValue::Float(opacity));
    }
    match source.workflow {
        ShadingWorkflow::Classic => {}
        ShadingWorkflow::MetallicRoughness {
            metallic,
            roughness,
        } => {
            material.set_uniform(slots::METALLIC, UniformValue::Float(metallic));
            material.set_uniform(slots::ROUGHNESS, UniformValue::Float(roughness));
        }
        ShadingWorkflow::SpecularGlossiness { glossiness } => {
            material.set_uniform(slots::GLOSSINESS, UniformValue::Float(glossiness));
        }
    }

    let has_opacity_texture = source
        .textures
        .iter()
        .any(|t| t.kind == TextureKind::Opacity);
    if opacity < 1.0 || has_opacity_texture {
        material.set_alpha_mode(AlphaMode::Blend);
    }

    if !ctx.settings.contains(ImportSettings::NO_TEXTURING) {
        let mut layer: HashMap<TextureKind, usize> = HashMap::new();
        for tex in &source.textures {
            let n = layer.entry(tex.kind).or_default();
            let slot = slots::layered(texture_slot(tex.kind), *n);
            *n += 1;
            let texture = resolve_texture(ctx, tex);
            material.set_texture(slot, texture, attr::texcoord(tex.uv_index));
        }
    }
    material
}

fn resolve_texture(ctx: &mut ImportContext<'_>, tex: &SourceTexture) -> Arc<Texture> {
    let Some(index) = embedded_index(&tex.path) else {
        return ctx.textures.request(&tex.path, tex.sampler);
    };
    if let Some(texture) = ctx.embedded.get(&index) {
        return Arc::clone(texture);
    }
    let texture = Arc::new(Texture::new(tex.path.clone(), tex.sampler));
    match decode_embedded(ctx.scene, index) {
        Ok(image) => texture.set_image(image),
        Err(err) => {
            texture.fail(err.to_string());
            ctx.error(err);
        }
    }
    ctx.embedded.insert(index, Arc::clone(&texture));
    texture
}
