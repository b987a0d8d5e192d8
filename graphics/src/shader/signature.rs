//! Shader signatures.
//!
//! A signature names one compiled variant of a shader class. It depends
//! only on which definable names are satisfied (never on uniform values)
//! and on how many lights of each class are active.

use std::collections::HashMap;

use vrscene_core::light::{Light, LightKind};
use vrscene_core::material::Material;
use vrscene_core::mesh::VertexLayout;

use super::template::ShaderTemplate;

/// Light classes in the order their signature terms are emitted.
///
/// The order is fixed and independent of the order of the light list, so
/// the same multiset of lights always yields the same signature.
pub const LIGHT_CLASS_ORDER: [LightKind; 3] =
    [LightKind::Directional, LightKind::Point, LightKind::Spot];

/// Caller-forced definable names. A forced name skips every other check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    forced: HashMap<String, bool>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `name` on or off.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, on: bool) -> Self {
        self.set(name, on);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, on: bool) {
        self.forced.insert(name.into(), on);
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.forced.get(name).copied()
    }
}

/// A texture the variant samples, with the attribute its coordinates
/// come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureUse {
    pub name: String,
    pub texcoord: String,
}

/// The resolved switches of one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderVariant {
    /// Cache key.
    pub signature: String,
    /// Satisfied definable names, in discovery order.
    pub defines: Vec<String>,
    /// Satisfied textures, in discovery order.
    pub textures: Vec<TextureUse>,
    /// Active light classes with their counts. Empty unless
    /// `LIGHTSOURCES` is on.
    pub lights: Vec<(LightKind, usize)>,
}

impl ShaderVariant {
    /// Resolve `template` against a material, a vertex layout and the
    /// active lights.
    ///
    /// A definable name is on when it is forced by `overrides`, or when the
    /// material declares a uniform of that name, or when some vertex
    /// attribute contains it, or when the material binds a texture of
    /// that name. Checks run in that order.
    pub fn resolve(
        template: &ShaderTemplate,
        material: &Material,
        layout: &VertexLayout,
        lights: &[Light],
        overrides: &Overrides,
    ) -> Self {
        let mut defines = Vec::new();
        let mut textures = Vec::new();
        let mut signature = template.class_name().to_string();

        for name in template.definable_names() {
            let on = if let Some(forced) = overrides.get(name) {
                forced
            } else if material.has_uniform(name) || layout.has_attribute_containing(name) {
                true
            } else if let Some(texcoord) = material.texcoord_attr(name) {
                textures.push(TextureUse {
                    name: name.clone(),
                    texcoord: texcoord.to_string(),
                });
                signature.push('$');
                signature.push_str(name);
                signature.push_str(texcoord);
                defines.push(name.clone());
                continue;
            } else {
                false
            };
            if on {
                signature.push('$');
                signature.push_str(name);
                defines.push(name.clone());
            }
        }

        let lit = defines.iter().any(|d| d == "LIGHTSOURCES");
        let lights = if lit { count_light_classes(lights) } else { Vec::new() };
        for (kind, count) in &lights {
            signature.push('$');
            signature.push_str(kind.class_name());
            signature.push_str(&count.to_string());
        }

        log::trace!("resolved signature {signature}");
        Self {
            signature,
            defines,
            textures,
            lights,
        }
    }

    /// Whether definable `name` is on.
    pub fn is_on(&self, name: &str) -> bool {
        self.defines.iter().any(|d| d == name)
    }

    pub fn light_count(&self, kind: LightKind) -> usize {
        self.lights
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, n)| *n)
    }
}

/// Count lights per class, skipping classes with no lights.
pub fn count_light_classes(lights: &[Light]) -> Vec<(LightKind, usize)> {
    LIGHT_CLASS_ORDER
        .iter()
        .filter_map(|&kind| {
            let count = lights.iter().filter(|l| l.kind() == kind).count();
            (count > 0).then_some((kind, count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use vrscene_core::material::{ShaderId, UniformValue};
    use vrscene_core::mesh::{ScalarType, VertexAttribute, attr};

    use super::*;

    fn template() -> ShaderTemplate {
        ShaderTemplate::builder("Probe")
            .segment(
                "VertexTemplate",
                "HAS_MULTIVIEW HAS_a_normal HAS_diffuseTexture HAS_diffuse_color",
            )
            .segment("FragmentTemplate", "HAS_LIGHTSOURCES")
            .build()
            .unwrap()
    }

    fn layout() -> VertexLayout {
        VertexLayout::new()
            .with_attribute(VertexAttribute::new(attr::POSITION, ScalarType::Float, 3))
            .with_attribute(VertexAttribute::new(attr::NORMAL, ScalarType::Float, 3))
    }

    #[test]
    fn names_follow_discovery_order() {
        let material = Material::new(ShaderId::Phong)
            .with_uniform("diffuse_color", UniformValue::Vec4([1.0; 4]));
        let variant = ShaderVariant::resolve(
            &template(),
            &material,
            &layout(),
            &[],
            &Overrides::new(),
        );
        assert_eq!(variant.signature, "Probe$a_normal$diffuse_color");
        assert!(variant.is_on("a_normal"));
        assert!(!variant.is_on("MULTIVIEW"));
    }

    #[test]
    fn overrides_win() {
        let material = Material::new(ShaderId::Phong);
        let overrides = Overrides::new().with("MULTIVIEW", true).with("a_normal", false);
        let variant =
            ShaderVariant::resolve(&template(), &material, &layout(), &[], &overrides);
        assert_eq!(variant.signature, "Probe$MULTIVIEW");
    }

    #[test]
    fn lights_only_count_when_lightsources_is_on() {
        let material = Material::new(ShaderId::Phong);
        let lights = [Light::point(), Light::directional(), Light::point()];

        let off = ShaderVariant::resolve(
            &template(),
            &material,
            &layout(),
            &lights,
            &Overrides::new().with("LIGHTSOURCES", false),
        );
        assert!(off.lights.is_empty());
        assert!(!off.signature.contains("Light"));

        let on = ShaderVariant::resolve(
            &template(),
            &material,
            &layout(),
            &lights,
            &Overrides::new().with("LIGHTSOURCES", true),
        );
        assert_eq!(on.signature, "Probe$a_normal$LIGHTSOURCES$DirectLight1$PointLight2");
        assert_eq!(on.light_count(LightKind::Point), 2);
        assert_eq!(on.light_count(LightKind::Spot), 0);
    }

    #[test]
    fn counting_ignores_light_order() {
        let a = count_light_classes(&[Light::spot(0.5, None), Light::point()]);
        let b = count_light_classes(&[Light::point(), Light::spot(0.5, None)]);
        assert_eq!(a, b);
        assert_eq!(a, [(LightKind::Point, 1), (LightKind::Spot, 1)]);
    }
}
