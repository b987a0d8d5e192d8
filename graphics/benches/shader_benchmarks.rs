use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use vrscene_core::light::Light;
use vrscene_core::material::{Material, ShaderId, UniformValue, slots};
use vrscene_core::mesh::{Mesh, attr};
use vrscene_core::scene::RenderData;
use vrscene_core::texture::Texture;
use vrscene_graphics::shader::{GeneratorOptions, Overrides, ShaderVariant, builtin, generate};
use vrscene_graphics::{RenderContext, ShaderRegistry};

fn render_data() -> RenderData {
    let mut mesh = Mesh::new(3);
    mesh.set_float_channel(attr::POSITION, 3, vec![0.0; 9]).unwrap();
    mesh.set_float_channel(attr::NORMAL, 3, vec![0.0; 9]).unwrap();
    mesh.set_float_channel("a_texcoord", 2, vec![0.0; 6]).unwrap();
    let material = Material::new(ShaderId::Phong)
        .with_uniform(slots::DIFFUSE_COLOR, UniformValue::Vec4([1.0; 4]))
        .with_texture(slots::DIFFUSE_TEXTURE, Arc::new(Texture::white()));
    RenderData::new(Arc::new(mesh), material.into_shared())
}

fn lights() -> Vec<Light> {
    vec![Light::point(), Light::point(), Light::directional()]
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

fn bench_register_builtins(c: &mut Criterion) {
    c.bench_function("shader_registry_builtins", |b| {
        b.iter(|| black_box(ShaderRegistry::with_builtins().unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Signature and source generation
// ---------------------------------------------------------------------------

fn bench_signature(c: &mut Criterion) {
    let template = builtin::phong().unwrap();
    let data = render_data();
    let material = data.material().read().clone();
    let lights = lights();
    let overrides = Overrides::new().with("LIGHTSOURCES", true);
    c.bench_function("shader_signature_phong_3_lights", |b| {
        b.iter(|| {
            black_box(ShaderVariant::resolve(
                &template,
                &material,
                data.mesh().layout(),
                &lights,
                &overrides,
            ))
        });
    });
}

fn bench_generate(c: &mut Criterion) {
    let template = builtin::phong().unwrap();
    let data = render_data();
    let material = data.material().read().clone();
    let variant = ShaderVariant::resolve(
        &template,
        &material,
        data.mesh().layout(),
        &lights(),
        &Overrides::new().with("LIGHTSOURCES", true),
    );
    let options = GeneratorOptions::default();
    c.bench_function("shader_generate_phong_3_lights", |b| {
        b.iter(|| black_box(generate(&template, &variant, &options).unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Cached resolution
// ---------------------------------------------------------------------------

fn bench_cached_resolve(c: &mut Criterion) {
    let context = RenderContext::headless().unwrap();
    let mut data = render_data();
    let lights = lights();
    context.resolve_shader(&mut data, &lights).unwrap();
    c.bench_function("shader_resolve_cache_hit", |b| {
        b.iter(|| black_box(context.resolve_shader(&mut data, &lights).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_register_builtins,
    bench_signature,
    bench_generate,
    bench_cached_resolve
);
criterion_main!(benches);
