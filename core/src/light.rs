//! Light sources.
//!
//! Every [`LightKind`] is a light *class*: all lights of one class share a
//! uniform struct layout and one GLSL function, named after the class, that
//! computes the light's contribution to a surface. The shader variant
//! compiler groups active lights by class and emits each class once.

use crate::material::UniformValue;

/// Diffuse intensity uniform.
pub const DIFFUSE_INTENSITY: &str = "diffuse_intensity";
/// Ambient intensity uniform.
pub const AMBIENT_INTENSITY: &str = "ambient_intensity";
/// Specular intensity uniform.
pub const SPECULAR_INTENSITY: &str = "specular_intensity";
/// World-space direction uniform.
pub const WORLD_DIRECTION: &str = "world_direction";
/// World-space position uniform.
pub const WORLD_POSITION: &str = "world_position";
/// Constant attenuation.
pub const ATTENUATION_CONSTANT: &str = "attenuation_constant";
/// Linear attenuation.
pub const ATTENUATION_LINEAR: &str = "attenuation_linear";
/// Quadratic attenuation.
pub const ATTENUATION_QUADRATIC: &str = "attenuation_quadratic";
/// Cosine of the inner cone angle.
pub const INNER_CONE_ANGLE: &str = "inner_cone_angle";
/// Cosine of the outer cone angle.
pub const OUTER_CONE_ANGLE: &str = "outer_cone_angle";

const DIRECT_FRAGMENT: &str = r"
vec4 DirectLight(Surface s, UniformDirectLight data)
{
    vec3 L = normalize(-data.world_direction.xyz);
    float ndotl = max(dot(s.normal, L), 0.0);
    vec3 H = normalize(L + s.viewspace_eye);
    float spec = pow(max(dot(s.normal, H), 0.0), s.shininess);
    return s.ambient * data.ambient_intensity
         + s.diffuse * data.diffuse_intensity * ndotl
         + s.specular * data.specular_intensity * spec;
}
";

const POINT_FRAGMENT: &str = r"
vec4 PointLight(Surface s, UniformPointLight data)
{
    vec3 D = data.world_position.xyz - s.world_position;
    float d = length(D);
    vec3 L = D / max(d, 0.0001);
    float att = 1.0 / (data.attenuation_constant + data.attenuation_linear * d
                     + data.attenuation_quadratic * d * d);
    float ndotl = max(dot(s.normal, L), 0.0);
    vec3 H = normalize(L + s.viewspace_eye);
    float spec = pow(max(dot(s.normal, H), 0.0), s.shininess);
    return s.ambient * data.ambient_intensity
         + att * (s.diffuse * data.diffuse_intensity * ndotl
                + s.specular * data.specular_intensity * spec);
}
";

const SPOT_FRAGMENT: &str = r"
vec4 SpotLight(Surface s, UniformSpotLight data)
{
    vec3 D = data.world_position.xyz - s.world_position;
    float d = length(D);
    vec3 L = D / max(d, 0.0001);
    float att = 1.0 / (data.attenuation_constant + data.attenuation_linear * d
                     + data.attenuation_quadratic * d * d);
    float cos_spot = dot(-L, normalize(data.world_direction.xyz));
    float cone = smoothstep(data.outer_cone_angle, data.inner_cone_angle, cos_spot);
    float ndotl = max(dot(s.normal, L), 0.0);
    vec3 H = normalize(L + s.viewspace_eye);
    float spec = pow(max(dot(s.normal, H), 0.0), s.shininess);
    return s.ambient * data.ambient_intensity
         + att * cone * (s.diffuse * data.diffuse_intensity * ndotl
                       + s.specular * data.specular_intensity * spec);
}
";

const SHADOW_VERTEX: &str = r"
uniform mat4 u_shadow_matrix;
out vec4 shadow_position;
void LightVertex(vec4 world_pos)
{
    shadow_position = u_shadow_matrix * world_pos;
}
";

/// Type of a light. Each kind is one light class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Infinitely distant light.
    Directional,
    /// Omnidirectional light at a position.
    Point,
    /// Cone light at a position.
    Spot,
}

impl LightKind {
    /// Class name, used in signatures and as the GLSL function name.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Directional => "DirectLight",
            Self::Point => "PointLight",
            Self::Spot => "SpotLight",
        }
    }

    /// `type name` pairs of the shared uniform struct.
    pub fn uniform_descriptor(self) -> &'static str {
        match self {
            Self::Directional => {
                "float4 diffuse_intensity float4 ambient_intensity float4 specular_intensity \
                 float4 world_direction"
            }
            Self::Point => {
                "float4 diffuse_intensity float4 ambient_intensity float4 specular_intensity \
                 float4 world_position float attenuation_constant float attenuation_linear \
                 float attenuation_quadratic"
            }
            Self::Spot => {
                "float4 diffuse_intensity float4 ambient_intensity float4 specular_intensity \
                 float4 world_position float4 world_direction float attenuation_constant \
                 float attenuation_linear float attenuation_quadratic float inner_cone_angle \
                 float outer_cone_angle"
            }
        }
    }

    /// Fragment shader function computing one light's contribution.
    pub fn fragment_source(self) -> &'static str {
        match self {
            Self::Directional => DIRECT_FRAGMENT,
            Self::Point => POINT_FRAGMENT,
            Self::Spot => SPOT_FRAGMENT,
        }
    }

    /// Per-vertex outputs contributed when a light of this class casts
    /// shadows. Point lights never do.
    pub fn shadow_vertex_source(self) -> Option<&'static str> {
        match self {
            Self::Directional | Self::Spot => Some(SHADOW_VERTEX),
            Self::Point => None,
        }
    }
}

/// A light source.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    kind: LightKind,
    name: Option<String>,
    uniforms: Vec<(&'static str, UniformValue)>,
    casts_shadows: bool,
}

impl Light {
    /// A light of `kind` with white intensity and default attenuation.
    pub fn new(kind: LightKind) -> Self {
        let mut uniforms = vec![
            (DIFFUSE_INTENSITY, UniformValue::Vec4([1.0, 1.0, 1.0, 1.0])),
            (AMBIENT_INTENSITY, UniformValue::Vec4([0.0, 0.0, 0.0, 1.0])),
            (SPECULAR_INTENSITY, UniformValue::Vec4([1.0, 1.0, 1.0, 1.0])),
        ];
        if kind != LightKind::Directional {
            uniforms.push((WORLD_POSITION, UniformValue::Vec4([0.0, 0.0, 0.0, 1.0])));
        }
        if kind != LightKind::Point {
            uniforms.push((WORLD_DIRECTION, UniformValue::Vec4([0.0, 0.0, -1.0, 0.0])));
        }
        if kind != LightKind::Directional {
            uniforms.push((ATTENUATION_CONSTANT, UniformValue::Float(1.0)));
            uniforms.push((ATTENUATION_LINEAR, UniformValue::Float(0.0)));
            uniforms.push((ATTENUATION_QUADRATIC, UniformValue::Float(0.0)));
        }
        if kind == LightKind::Spot {
            let outer = std::f32::consts::FRAC_PI_4;
            uniforms.push((INNER_CONE_ANGLE, UniformValue::Float((outer / 1.5).cos())));
            uniforms.push((OUTER_CONE_ANGLE, UniformValue::Float(outer.cos())));
        }
        Self {
            kind,
            name: None,
            uniforms,
            casts_shadows: false,
        }
    }

    /// Directional light.
    pub fn directional() -> Self {
        Self::new(LightKind::Directional)
    }

    /// Point light.
    pub fn point() -> Self {
        Self::new(LightKind::Point)
    }

    /// Spot light with the given outer cone half-angle (radians). The inner
    /// angle defaults to `outer / 1.5`.
    pub fn spot(outer_angle: f32, inner_angle: Option<f32>) -> Self {
        let inner = inner_angle.unwrap_or(outer_angle / 1.5);
        Self::new(LightKind::Spot)
            .with_uniform(INNER_CONE_ANGLE, UniformValue::Float(inner.cos()))
            .with_uniform(OUTER_CONE_ANGLE, UniformValue::Float(outer_angle.cos()))
    }

    /// Set the name lights are matched to scene nodes by.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a uniform. Names outside the class's descriptor are ignored.
    #[must_use]
    pub fn with_uniform(mut self, name: &str, value: UniformValue) -> Self {
        self.set_uniform(name, value);
        self
    }

    /// Enable shadow casting.
    #[must_use]
    pub fn with_shadows(mut self, casts_shadows: bool) -> Self {
        self.casts_shadows = casts_shadows;
        self
    }

    /// Kind (class) of this light.
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Class name.
    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether this light casts shadows.
    pub fn casts_shadows(&self) -> bool {
        self.casts_shadows && self.kind.shadow_vertex_source().is_some()
    }

    /// Set a uniform value in place.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        match self.uniforms.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => log::warn!("{} has no uniform '{name}'", self.kind.class_name()),
        }
    }

    /// Uniform value by name.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Uniform values in descriptor order.
    pub fn uniforms(&self) -> impl Iterator<Item = (&'static str, UniformValue)> + '_ {
        self.uniforms.iter().copied()
    }
}
