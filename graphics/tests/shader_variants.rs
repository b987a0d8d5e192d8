//! Shader variant resolution through a headless render context.
//!
//! Every test runs against the dummy backend, which counts compilations,
//! so cache hits and misses are observable.

use std::sync::Arc;

use rstest::{fixture, rstest};

use vrscene_core::light::Light;
use vrscene_core::material::{Material, ShaderId, UniformValue, slots};
use vrscene_core::mesh::{Mesh, attr};
use vrscene_core::scene::{RenderData, SceneGraph};
use vrscene_core::texture::Texture;
use vrscene_graphics::{
    DummyBackend, RenderContext, RenderContextConfig, ShaderError, ShaderTemplate,
};

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    backend: Arc<DummyBackend>,
    context: RenderContext,
}

fn harness_with(config: RenderContextConfig) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = Arc::new(DummyBackend::new());
    let context = RenderContext::new(Arc::clone(&backend) as _, config).unwrap();
    Harness { backend, context }
}

#[fixture]
fn harness() -> Harness {
    harness_with(RenderContextConfig::default())
}

/// A three-vertex mesh carrying the named float channels.
fn mesh(channels: &[(&str, u32)]) -> Arc<Mesh> {
    let mut mesh = Mesh::new(3);
    for &(name, components) in channels {
        mesh.set_float_channel(name, components, vec![0.0; 3 * components as usize])
            .unwrap();
    }
    Arc::new(mesh)
}

fn lit_mesh() -> Arc<Mesh> {
    mesh(&[(attr::POSITION, 3), (attr::NORMAL, 3), ("a_texcoord", 2)])
}

fn phong_material(diffuse: [f32; 4]) -> Material {
    Material::new(ShaderId::Phong)
        .with_uniform(slots::DIFFUSE_COLOR, UniformValue::Vec4(diffuse))
        .with_uniform(slots::SPECULAR_EXPONENT, UniformValue::Float(16.0))
}

fn render_data(mesh: Arc<Mesh>, material: Material) -> RenderData {
    RenderData::new(mesh, material.into_shared())
}

fn scenario_c_lights() -> Vec<Light> {
    vec![Light::point(), Light::directional(), Light::point()]
}

// ============================================================================
// Determinism
// ============================================================================

#[rstest]
#[case::texture(ShaderId::Texture)]
#[case::phong(ShaderId::Phong)]
#[case::phong_layered(ShaderId::PhongLayered)]
#[case::pbr(ShaderId::Pbr)]
fn second_resolve_hits_the_cache(harness: Harness, #[case] shader: ShaderId) {
    let material = Material::new(shader.clone())
        .with_uniform(slots::DIFFUSE_COLOR, UniformValue::Vec4([1.0; 4]))
        .with_texture(slots::DIFFUSE_TEXTURE, Arc::new(Texture::white()));
    let mut data = render_data(lit_mesh(), material);
    let lights = scenario_c_lights();

    let first = harness.context.resolve_shader(&mut data, &lights).unwrap();
    let second = harness.context.resolve_shader(&mut data, &lights).unwrap();

    assert_eq!(first.signature, second.signature);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(data.shader(), Some(first.handle));
    assert_eq!(harness.context.generation_count(), 1);
    assert_eq!(harness.backend.compile_count(), 1);
    assert!(first.signature.starts_with(shader.class_name()));
}

#[rstest]
fn equal_inputs_share_a_program_across_objects(harness: Harness) {
    let mut a = render_data(lit_mesh(), phong_material([1.0, 0.0, 0.0, 1.0]));
    let mut b = render_data(lit_mesh(), phong_material([0.0, 1.0, 0.0, 1.0]));

    let first = harness.context.resolve_shader(&mut a, &[]).unwrap();
    let second = harness.context.resolve_shader(&mut b, &[]).unwrap();

    assert_eq!(a.shader(), b.shader());
    assert_eq!(first.signature, second.signature);
    assert_eq!(harness.backend.compile_count(), 1);
}

// ============================================================================
// Discrimination
// ============================================================================

#[rstest]
fn uniform_values_do_not_change_the_signature(harness: Harness) {
    let red = render_data(lit_mesh(), phong_material([1.0, 0.0, 0.0, 1.0]));
    let blue = render_data(lit_mesh(), phong_material([0.0, 0.0, 1.0, 1.0]));
    let lights = [Light::point()];
    assert_eq!(
        harness.context.signature_for(&red, &lights).unwrap(),
        harness.context.signature_for(&blue, &lights).unwrap()
    );
}

#[rstest]
#[case::extra_point(vec![Light::point(), Light::point(), Light::directional()])]
#[case::spot_instead(vec![Light::spot(0.5, None), Light::directional()])]
#[case::no_directional(vec![Light::point()])]
#[case::no_lights(vec![])]
fn light_classes_and_counts_change_the_signature(harness: Harness, #[case] lights: Vec<Light>) {
    let data = render_data(lit_mesh(), phong_material([1.0; 4]));
    let base = harness
        .context
        .signature_for(&data, &[Light::point(), Light::directional()])
        .unwrap();
    let other = harness.context.signature_for(&data, &lights).unwrap();
    assert_ne!(base, other);
}

#[rstest]
fn presence_of_a_uniform_changes_the_signature(harness: Harness) {
    let plain = render_data(lit_mesh(), phong_material([1.0; 4]));
    let glowing = render_data(
        lit_mesh(),
        phong_material([1.0; 4]).with_uniform(slots::EMISSIVE_COLOR, UniformValue::Vec4([1.0; 4])),
    );
    let plain_sig = harness.context.signature_for(&plain, &[]).unwrap();
    let glowing_sig = harness.context.signature_for(&glowing, &[]).unwrap();
    assert!(!plain_sig.contains("$emissive_color"));
    assert!(glowing_sig.contains("$emissive_color"));
}

#[rstest]
fn light_order_does_not_matter(harness: Harness) {
    let data = render_data(lit_mesh(), phong_material([1.0; 4]));
    let a = harness
        .context
        .signature_for(&data, &[Light::point(), Light::directional(), Light::point()])
        .unwrap();
    let b = harness
        .context
        .signature_for(&data, &[Light::directional(), Light::point(), Light::point()])
        .unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// End-to-end scenario C
// ============================================================================

#[rstest]
fn two_points_and_one_directional(harness: Harness) {
    let mut data = render_data(lit_mesh(), phong_material([1.0; 4]));
    let lights = scenario_c_lights();

    let compiled = harness.context.resolve_shader(&mut data, &lights).unwrap();

    assert!(compiled.signature.contains("$PointLight2"));
    assert!(compiled.signature.contains("$DirectLight1"));
    assert!(compiled.signature.contains("$LIGHTSOURCES"));
    let fragment = &compiled.fragment_source;
    assert!(fragment.contains("#define HAS_LIGHTSOURCES 1"));
    assert!(fragment.contains("uniform UniformPointLight u_PointLight[2];"));
    assert!(fragment.contains("uniform UniformDirectLight u_DirectLight;"));
    assert!(fragment.contains("vec4 LightPixel(Surface s)"));
    assert!(!fragment.contains('@'));
    assert!(!compiled.vertex_source.contains('@'));

    let generated = harness.context.generation_count();
    let again = harness.context.resolve_shader(&mut data, &lights).unwrap();
    assert_eq!(again.handle, compiled.handle);
    assert_eq!(harness.context.generation_count(), generated);
}

#[rstest]
fn disabled_lighting_drops_light_terms(harness: Harness) {
    let data = render_data(lit_mesh(), phong_material([1.0; 4])).with_lighting(false);
    let signature = harness
        .context
        .signature_for(&data, &scenario_c_lights())
        .unwrap();
    assert!(!signature.contains("LIGHTSOURCES"));
    assert!(!signature.contains("Light"));
}

#[rstest]
fn unlit_class_ignores_lights(harness: Harness) {
    let material = Material::new(ShaderId::Texture)
        .with_uniform(slots::DIFFUSE_COLOR, UniformValue::Vec4([1.0; 4]))
        .with_texture(slots::DIFFUSE_TEXTURE, Arc::new(Texture::white()));
    let mut data = render_data(mesh(&[(attr::POSITION, 3), ("a_texcoord", 2)]), material);

    let compiled = harness
        .context
        .resolve_shader(&mut data, &scenario_c_lights())
        .unwrap();

    assert_eq!(compiled.signature, "Texture$a_texcoord$diffuseTexturea_texcoord");
    assert!(!compiled.fragment_source.contains("LightPixel"));
}

// ============================================================================
// Generated source
// ============================================================================

#[rstest]
fn textures_copy_their_own_coordinate_set(harness: Harness) {
    let mut material = phong_material([1.0; 4]);
    material.set_texture(slots::DIFFUSE_TEXTURE, Arc::new(Texture::white()), "a_texcoord1");
    let mut data = render_data(
        mesh(&[(attr::POSITION, 3), (attr::NORMAL, 3), ("a_texcoord1", 2)]),
        material,
    );

    let compiled = harness.context.resolve_shader(&mut data, &[]).unwrap();

    assert!(compiled.signature.contains("$diffuseTexturea_texcoord1"));
    assert!(compiled.vertex_source.contains("diffuseTexture_coord = a_texcoord1.xy;"));
    assert_eq!(compiled.textures.to_string(), "sampler2D diffuseTexture");
}

#[rstest]
fn satisfied_descriptors_are_reported(harness: Harness) {
    let mut data = render_data(lit_mesh(), phong_material([1.0; 4]));
    let compiled = harness.context.resolve_shader(&mut data, &[]).unwrap();

    assert!(compiled.uniforms.contains("diffuse_color"));
    assert!(!compiled.uniforms.contains("emissive_color"));
    assert!(compiled.textures.is_empty());
    assert!(compiled.vertex_attributes.contains("a_normal"));
    assert!(!compiled.vertex_attributes.contains("a_bone_weights"));
    assert!(compiled.fragment_source.contains("layout (std140) uniform Material_ubo"));
}

#[rstest]
fn skinned_meshes_get_the_bone_block() {
    let config = RenderContextConfig {
        max_bones: 32,
        ..RenderContextConfig::default()
    };
    let harness = harness_with(config);
    let mut mesh = Mesh::new(3);
    mesh.set_float_channel(attr::POSITION, 3, vec![0.0; 9]).unwrap();
    mesh.set_float_channel(attr::BONE_WEIGHTS, 4, vec![0.25; 12]).unwrap();
    mesh.set_int_channel(attr::BONE_INDICES, 4, vec![0; 12]).unwrap();
    let mut data = render_data(Arc::new(mesh), phong_material([1.0; 4]));

    let compiled = harness.context.resolve_shader(&mut data, &[]).unwrap();

    assert!(compiled.signature.contains("$a_bone_weights"));
    assert!(compiled.vertex_source.contains("mat4 u_bone_matrix[32];"));
    assert!(compiled.vertex_source.contains("#define HAS_a_bone_weights 1"));
}

#[rstest]
fn multiview_is_forced_by_the_context() {
    let harness = harness_with(RenderContextConfig {
        multiview: true,
        ..RenderContextConfig::default()
    });
    let mut data = render_data(lit_mesh(), phong_material([1.0; 4]));
    let compiled = harness.context.resolve_shader(&mut data, &[]).unwrap();

    assert!(compiled.signature.contains("$MULTIVIEW"));
    assert!(
        compiled
            .vertex_source
            .contains("#extension GL_OVR_multiview2 : enable")
    );
}

#[rstest]
fn shadow_casters_add_vertex_outputs(harness: Harness) {
    let mut data = render_data(lit_mesh(), phong_material([1.0; 4]));
    let lights = [Light::spot(0.7, None).with_shadows(true), Light::point()];

    let compiled = harness.context.resolve_shader(&mut data, &lights).unwrap();

    assert!(compiled.signature.contains("$SHADOWS"));
    assert_eq!(compiled.vertex_source.matches("void LightVertex").count(), 1);

    let quiet = [Light::spot(0.7, None).with_shadows(false), Light::point()];
    let signature = harness.context.signature_for(&data, &quiet).unwrap();
    assert!(!signature.contains("$SHADOWS"));
}

// ============================================================================
// Registration errors and context lifetime
// ============================================================================

#[test]
fn class_without_fragment_template_is_rejected() {
    let err = ShaderTemplate::builder("Toon")
        .segment("VertexTemplate", "void main() {}")
        .build()
        .unwrap_err();
    assert!(matches!(err, ShaderError::MissingSegment { segment, .. } if segment == "FragmentTemplate"));
}

#[rstest]
fn unregistered_class_fails_to_resolve(harness: Harness) {
    let mut data = render_data(lit_mesh(), Material::new(ShaderId::Custom("Toon".into())));
    let err = harness.context.resolve_shader(&mut data, &[]).unwrap_err();
    assert_eq!(err, ShaderError::UnknownShader("Toon".into()));
    assert_eq!(data.shader(), None);
}

#[rstest]
fn custom_class_can_be_registered(mut harness: Harness) {
    let toon = ShaderTemplate::builder("Toon")
        .segment("VertexTemplate", "in vec3 a_position;\n@VertexBody")
        .segment("VertexBody", "void main() { gl_Position = vec4(a_position, 1.0); }\n")
        .segment("FragmentTemplate", "out vec4 c;\nvoid main() { c = vec4(1.0); }\n// HAS_LIGHTSOURCES\n")
        .build()
        .unwrap();
    harness
        .context
        .registry_mut()
        .register(ShaderId::Custom("Toon".into()), toon);
    let mut data = render_data(lit_mesh(), Material::new(ShaderId::Custom("Toon".into())));

    let compiled = harness
        .context
        .resolve_shader(&mut data, &[Light::point()])
        .unwrap();

    assert_eq!(compiled.signature, "Toon$LIGHTSOURCES$PointLight1");
    assert!(compiled.vertex_source.contains("gl_Position = vec4(a_position, 1.0);"));
}

#[rstest]
fn subtree_resolution_uses_lights_in_the_graph(harness: Harness) {
    let mut graph = SceneGraph::new();
    let root = graph.create_node(Some("root"));
    let lamp = graph.create_child(root, Some("lamp"));
    let body = graph.create_child(root, Some("body"));
    graph.components_mut(lamp).unwrap().light = Some(Light::point());
    graph.components_mut(body).unwrap().render_data =
        Some(render_data(lit_mesh(), phong_material([1.0; 4])));

    let bound = harness.context.resolve_subtree(&mut graph, root).unwrap();

    assert_eq!(bound, 1);
    let data = graph.components(body).unwrap().render_data.as_ref().unwrap();
    assert!(data.shader().is_some());
    assert!(
        harness
            .context
            .signature_for(data, &[Light::point()])
            .unwrap()
            .ends_with("$PointLight1")
    );
}

#[rstest]
fn teardown_empties_the_cache(harness: Harness) {
    let mut data = render_data(lit_mesh(), phong_material([1.0; 4]));
    harness.context.resolve_shader(&mut data, &[]).unwrap();
    assert_eq!(harness.context.cache().len(), 1);

    harness.context.teardown();
    assert!(harness.context.cache().is_empty());

    harness.context.resolve_shader(&mut data, &[]).unwrap();
    assert_eq!(harness.context.generation_count(), 2);
}

#[test]
fn contexts_do_not_share_programs() {
    let a = harness_with(RenderContextConfig::default());
    let b = harness_with(RenderContextConfig::default());
    let mut data = render_data(lit_mesh(), phong_material([1.0; 4]));
    a.context.resolve_shader(&mut data, &[]).unwrap();
    b.context.resolve_shader(&mut data, &[]).unwrap();
    assert_eq!(a.backend.compile_count(), 1);
    assert_eq!(b.backend.compile_count(), 1);
}
