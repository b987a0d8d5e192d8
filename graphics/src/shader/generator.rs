//! Source generation for one shader variant.

use std::fmt::Write;

use vrscene_core::light::LightKind;

use crate::error::ShaderError;

use super::descriptor::Descriptor;
use super::signature::ShaderVariant;
use super::template::{ShaderStage, ShaderTemplate};

const MULTIVIEW_EXTENSION: &str = "#extension GL_OVR_multiview2 : enable\n";

/// Context-wide generation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Text after `#version`.
    pub glsl_version: String,
    /// Length of the bone matrix array.
    pub max_bones: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            glsl_version: "300 es".to_string(),
            max_bones: 60,
        }
    }
}

/// Vertex and fragment source of a variant, plus the descriptor entries
/// the variant actually uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub vertex: String,
    pub fragment: String,
    pub uniforms: Descriptor,
    pub textures: Descriptor,
    pub vertex_attributes: Descriptor,
}

/// Generate the sources of `variant`.
pub fn generate(
    template: &ShaderTemplate,
    variant: &ShaderVariant,
    options: &GeneratorOptions,
) -> Result<GeneratedSource, ShaderError> {
    vrscene_core::profile_function!();
    let satisfied = |d: &Descriptor| {
        d.filter(|e| !template.is_definable(&e.name) || variant.is_on(&e.name))
    };
    let uniforms = satisfied(template.uniforms());
    let textures = satisfied(template.textures());
    let vertex_attributes = satisfied(template.vertex_attributes());

    let fragment_lights = light_block(variant)?;
    let material_block = material_uniforms(&uniforms);
    let bones_block = format!(
        "layout (std140) uniform Bones_ubo\n{{\n    mat4 u_bone_matrix[{}];\n}};\n",
        options.max_bones
    );

    let mut stages = [String::new(), String::new()];
    for (slot, stage) in stages.iter_mut().zip(ShaderStage::ALL) {
        let mut reserved = |token: &str| match (token, stage) {
            ("LIGHTSOURCES", ShaderStage::Vertex) => shadow_block(variant),
            ("LIGHTSOURCES", ShaderStage::Fragment) => fragment_lights.clone(),
            ("MATERIAL_UNIFORMS", _) => material_block.clone(),
            ("BONES_UNIFORMS", _) => bones_block.clone(),
            ("TEXCOORDS", ShaderStage::Vertex) => texcoord_assignments(variant),
            _ => String::new(),
        };
        let body = template.expand(stage, &mut reserved)?;
        *slot = header(variant, stage, options) + &body;
    }
    let [vertex, fragment] = stages;

    Ok(GeneratedSource {
        vertex,
        fragment,
        uniforms,
        textures,
        vertex_attributes,
    })
}

fn header(variant: &ShaderVariant, stage: ShaderStage, options: &GeneratorOptions) -> String {
    let mut out = format!("#version {}\n", options.glsl_version);
    if variant.is_on("MULTIVIEW") {
        out.push_str(MULTIVIEW_EXTENSION);
        if stage == ShaderStage::Vertex {
            out.push_str("layout(num_views = 2) in;\n");
        }
    }
    for name in &variant.defines {
        let _ = writeln!(out, "#define HAS_{name} 1");
    }
    out
}

fn material_uniforms(uniforms: &Descriptor) -> String {
    let (slots, size) = uniforms.std140_layout();
    if slots.is_empty() {
        return String::new();
    }
    let mut out = String::from("layout (std140) uniform Material_ubo\n{\n");
    for slot in &slots {
        let _ = writeln!(
            out,
            "    {} {}; // offset {}",
            slot.ty.glsl(),
            slot.name,
            slot.offset
        );
    }
    let _ = writeln!(out, "}}; // {size} bytes");
    out
}

fn texcoord_assignments(variant: &ShaderVariant) -> String {
    let mut out = String::new();
    for texture in &variant.textures {
        let _ = writeln!(out, "    {}_coord = {}.xy;", texture.name, texture.texcoord);
    }
    out
}

/// Vertex side of `@LIGHTSOURCES`: the shadow outputs, once, when shadows
/// are on.
fn shadow_block(variant: &ShaderVariant) -> String {
    if !variant.is_on("SHADOWS") {
        return String::new();
    }
    variant
        .lights
        .iter()
        .find_map(|(kind, _)| kind.shadow_vertex_source())
        .unwrap_or_default()
        .to_string()
}

/// Fragment side of `@LIGHTSOURCES`: one struct, one uniform and one
/// function per light class, then `LightPixel` summing them. Classes with
/// several lights loop over a uniform array.
fn light_block(variant: &ShaderVariant) -> Result<String, ShaderError> {
    let mut out = String::new();
    for &(kind, count) in &variant.lights {
        let class = kind.class_name();
        let members = Descriptor::parse(kind.uniform_descriptor())?;
        let _ = write!(out, "struct Uniform{class}\n{{\n{}}};\n", members.glsl_members());
        if count > 1 {
            let _ = writeln!(out, "uniform Uniform{class} u_{class}[{count}];");
        } else {
            let _ = writeln!(out, "uniform Uniform{class} u_{class};");
        }
        out.push_str(kind.fragment_source());
    }

    out.push_str("\nvec4 LightPixel(Surface s)\n{\n    vec4 color = vec4(0.0);\n");
    for &(kind, count) in &variant.lights {
        out.push_str(&light_call(kind, count));
    }
    out.push_str("    return color;\n}\n");
    Ok(out)
}

fn light_call(kind: LightKind, count: usize) -> String {
    let class = kind.class_name();
    if count > 1 {
        format!(
            "    for (int i = 0; i < {count}; ++i)\n    {{\n        color += {class}(s, u_{class}[i]);\n    }}\n"
        )
    } else {
        format!("    color += {class}(s, u_{class});\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::TextureUse;

    fn variant(defines: &[&str], lights: Vec<(LightKind, usize)>) -> ShaderVariant {
        ShaderVariant {
            signature: "Test".into(),
            defines: defines.iter().map(|s| s.to_string()).collect(),
            textures: Vec::new(),
            lights,
        }
    }

    fn template() -> ShaderTemplate {
        ShaderTemplate::builder("Test")
            .segment("VertexTemplate", "@MATERIAL_UNIFORMS@LIGHTSOURCES@VertexBody")
            .segment("VertexBody", "void main() {\n@TEXCOORDS}\n// HAS_SHADOWS\n")
            .segment(
                "FragmentTemplate",
                "@MATERIAL_UNIFORMS\n#ifdef HAS_LIGHTSOURCES\n@LIGHTSOURCES#endif\n",
            )
            .uniforms("float4 diffuse_color float specular_exponent float4 u_extra")
            .segment("FragmentExtra", "// HAS_diffuse_color HAS_u_extra")
            .build()
            .unwrap()
    }

    #[test]
    fn header_lists_defines() {
        let source = generate(
            &template(),
            &variant(&["MULTIVIEW", "diffuse_color"], Vec::new()),
            &GeneratorOptions::default(),
        )
        .unwrap();
        assert!(source.vertex.starts_with(
            "#version 300 es\n#extension GL_OVR_multiview2 : enable\nlayout(num_views = 2) in;\n#define HAS_MULTIVIEW 1\n#define HAS_diffuse_color 1\n"
        ));
        assert!(!source.fragment.contains("num_views"));
    }

    #[test]
    fn material_block_keeps_satisfied_uniforms() {
        let source = generate(
            &template(),
            &variant(&["diffuse_color"], Vec::new()),
            &GeneratorOptions::default(),
        )
        .unwrap();
        // `specular_exponent` is not definable, so it is always kept.
        assert_eq!(source.uniforms.to_string(), "float4 diffuse_color float specular_exponent");
        assert!(source.fragment.contains("vec4 diffuse_color; // offset 0"));
        assert!(source.fragment.contains("float specular_exponent; // offset 16"));
        assert!(!source.fragment.contains("u_extra"));
    }

    #[test]
    fn several_lights_of_a_class_share_one_loop() {
        let source = generate(
            &template(),
            &variant(
                &["LIGHTSOURCES"],
                vec![(LightKind::Directional, 1), (LightKind::Point, 3)],
            ),
            &GeneratorOptions::default(),
        )
        .unwrap();
        let fragment = &source.fragment;
        assert_eq!(fragment.matches("struct UniformPointLight").count(), 1);
        assert!(fragment.contains("uniform UniformPointLight u_PointLight[3];"));
        assert!(fragment.contains("for (int i = 0; i < 3; ++i)"));
        assert!(fragment.contains("color += DirectLight(s, u_DirectLight);"));
        assert_eq!(fragment.matches("vec4 PointLight(").count(), 1);
        assert!(!source.vertex.contains("LightVertex"));
    }

    #[test]
    fn shadows_add_vertex_outputs() {
        let source = generate(
            &template(),
            &variant(&["LIGHTSOURCES", "SHADOWS"], vec![(LightKind::Spot, 2)]),
            &GeneratorOptions::default(),
        )
        .unwrap();
        assert_eq!(source.vertex.matches("void LightVertex").count(), 1);
    }

    #[test]
    fn texcoords_copy_their_attribute() {
        let mut v = variant(&[], Vec::new());
        v.textures.push(TextureUse {
            name: "diffuseTexture".into(),
            texcoord: "a_texcoord1".into(),
        });
        let source = generate(&template(), &v, &GeneratorOptions::default()).unwrap();
        assert!(source.vertex.contains("    diffuseTexture_coord = a_texcoord1.xy;\n"));
        assert!(!source.fragment.contains("_coord"));
    }
}
