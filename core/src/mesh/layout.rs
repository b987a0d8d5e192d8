//! Vertex layout definitions.
//!
//! A layout is an ordered list of named attributes. It is fixed once the
//! owning [`Mesh`](super::Mesh) is built and is what the shader variant
//! compiler inspects to decide which `HAS_` defines a mesh satisfies.

use std::fmt;

use super::data::MeshError;

/// Well-known attribute names.
pub mod attr {
    /// Vertex position (float3).
    pub const POSITION: &str = "a_position";
    /// Vertex normal (float3).
    pub const NORMAL: &str = "a_normal";
    /// Vertex tangent (float3).
    pub const TANGENT: &str = "a_tangent";
    /// Vertex bitangent (float3).
    pub const BITANGENT: &str = "a_bitangent";
    /// Up to four bone indices (int4).
    pub const BONE_INDICES: &str = "a_bone_indices";
    /// Up to four bone weights (float4).
    pub const BONE_WEIGHTS: &str = "a_bone_weights";

    /// Name of texture coordinate set `set` (`a_texcoord`, `a_texcoord1`, …).
    pub fn texcoord(set: usize) -> String {
        if set == 0 {
            "a_texcoord".to_string()
        } else {
            format!("a_texcoord{set}")
        }
    }

    /// Name of vertex color set `set` (`a_color`, `a_color1`, …).
    pub fn color(set: usize) -> String {
        if set == 0 {
            "a_color".to_string()
        } else {
            format!("a_color{set}")
        }
    }
}

/// Scalar type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// 32-bit float.
    Float,
    /// 32-bit signed integer.
    Int,
}

impl ScalarType {
    fn prefix(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
        }
    }
}

/// A single named vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Attribute name as seen by shaders.
    pub name: String,
    /// Scalar type of each component.
    pub scalar: ScalarType,
    /// Number of components (1–4).
    pub components: u32,
}

impl VertexAttribute {
    /// Create a new attribute.
    pub fn new(name: impl Into<String>, scalar: ScalarType, components: u32) -> Self {
        Self {
            name: name.into(),
            scalar,
            components,
        }
    }

    /// Size in bytes of one element.
    pub fn size(&self) -> usize {
        4 * self.components as usize
    }

    /// Descriptor type name (`float3`, `int4`, …).
    pub fn type_name(&self) -> String {
        if self.components == 1 {
            self.scalar.prefix().to_string()
        } else {
            format!("{}{}", self.scalar.prefix(), self.components)
        }
    }
}

/// Ordered set of vertex attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute. A repeated name replaces the earlier entry in place.
    #[must_use]
    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.push(attribute);
        self
    }

    pub(crate) fn push(&mut self, attribute: VertexAttribute) {
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.name == attribute.name)
        {
            *existing = attribute;
        } else {
            self.attributes.push(attribute);
        }
    }

    /// Parse a descriptor string such as `"float3 a_position float2 a_texcoord"`.
    ///
    /// Pairs are whitespace separated; `;` and `,` are treated as whitespace.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, MeshError> {
        let cleaned = descriptor.replace([';', ','], " ");
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            return Err(MeshError::InvalidDescriptor(descriptor.to_string()));
        }
        let mut layout = Self::new();
        for pair in tokens.chunks(2) {
            let (scalar, components) = parse_type(pair[0])
                .ok_or_else(|| MeshError::InvalidDescriptor(descriptor.to_string()))?;
            layout.push(VertexAttribute::new(pair[1], scalar, components));
        }
        Ok(layout)
    }

    /// All attributes in declaration order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Look up an attribute by exact name.
    pub fn get(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether an attribute with exactly this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether any attribute name contains `fragment` as a substring.
    pub fn has_attribute_containing(&self, fragment: &str) -> bool {
        self.attributes.iter().any(|a| a.name.contains(fragment))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the layout has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Interleaved stride in bytes.
    pub fn stride(&self) -> usize {
        self.attributes.iter().map(VertexAttribute::size).sum()
    }

    /// Render back into descriptor form.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VertexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{} {}", a.type_name(), a.name)?;
        }
        Ok(())
    }
}

fn parse_type(token: &str) -> Option<(ScalarType, u32)> {
    let (scalar, rest) = if let Some(rest) = token.strip_prefix("float") {
        (ScalarType::Float, rest)
    } else if let Some(rest) = token.strip_prefix("int") {
        (ScalarType::Int, rest)
    } else {
        return None;
    };
    let components = if rest.is_empty() {
        1
    } else {
        rest.parse::<u32>().ok()?
    };
    (1..=4).contains(&components).then_some((scalar, components))
}
