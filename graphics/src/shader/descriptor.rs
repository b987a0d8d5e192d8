//! `type name` descriptor strings.
//!
//! Shader classes declare their uniforms, textures and vertex attributes
//! as space-separated `type name` sequences, e.g.
//! `"float4 diffuse_color float specular_exponent"`.

use std::fmt;

use crate::error::ShaderError;

/// Scalar, vector, matrix or sampler type named in a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Float2,
    Float3,
    Float4,
    Int,
    Int2,
    Int3,
    Int4,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
}

impl ValueType {
    /// Parse a descriptor type token.
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "float" => Self::Float,
            "float2" => Self::Float2,
            "float3" => Self::Float3,
            "float4" => Self::Float4,
            "int" => Self::Int,
            "int2" => Self::Int2,
            "int3" => Self::Int3,
            "int4" => Self::Int4,
            "mat3" => Self::Mat3,
            "mat4" => Self::Mat4,
            "sampler2D" => Self::Sampler2D,
            "samplerCube" => Self::SamplerCube,
            _ => return None,
        })
    }

    /// Token used in descriptor strings.
    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Int => "int",
            Self::Int2 => "int2",
            Self::Int3 => "int3",
            Self::Int4 => "int4",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
            Self::Sampler2D => "sampler2D",
            Self::SamplerCube => "samplerCube",
        }
    }

    /// GLSL type name.
    pub fn glsl(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Float2 => "vec2",
            Self::Float3 => "vec3",
            Self::Float4 => "vec4",
            Self::Int => "int",
            Self::Int2 => "ivec2",
            Self::Int3 => "ivec3",
            Self::Int4 => "ivec4",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
            Self::Sampler2D => "sampler2D",
            Self::SamplerCube => "samplerCube",
        }
    }

    pub fn is_sampler(self) -> bool {
        matches!(self, Self::Sampler2D | Self::SamplerCube)
    }

    /// (base alignment, size) in bytes under std140. `None` for samplers,
    /// which cannot live in a uniform block.
    pub fn std140(self) -> Option<(usize, usize)> {
        Some(match self {
            Self::Float | Self::Int => (4, 4),
            Self::Float2 | Self::Int2 => (8, 8),
            Self::Float3 | Self::Int3 => (16, 12),
            Self::Float4 | Self::Int4 => (16, 16),
            Self::Mat3 => (16, 48),
            Self::Mat4 => (16, 64),
            Self::Sampler2D | Self::SamplerCube => return None,
        })
    }
}

/// One `type name` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEntry {
    pub ty: ValueType,
    pub name: String,
}

/// One member of a std140 uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub ty: ValueType,
    /// Byte offset from the start of the block.
    pub offset: usize,
    /// Byte size.
    pub size: usize,
}

/// A parsed descriptor, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    entries: Vec<DescriptorEntry>,
}

impl Descriptor {
    /// Parse `text`. Names must be unique; the empty string is an empty
    /// descriptor.
    pub fn parse(text: &str) -> Result<Self, ShaderError> {
        let invalid = |reason: String| ShaderError::InvalidDescriptor {
            descriptor: text.to_string(),
            reason,
        };
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            return Err(invalid(format!("odd number of tokens ({})", tokens.len())));
        }
        let mut entries: Vec<DescriptorEntry> = Vec::with_capacity(tokens.len() / 2);
        for pair in tokens.chunks_exact(2) {
            let ty = ValueType::parse(pair[0])
                .ok_or_else(|| invalid(format!("unknown type '{}'", pair[0])))?;
            let name = pair[1];
            if !is_identifier(name) {
                return Err(invalid(format!("'{name}' is not an identifier")));
            }
            if entries.iter().any(|e| e.name == name) {
                return Err(invalid(format!("'{name}' declared twice")));
            }
            entries.push(DescriptorEntry {
                ty,
                name: name.to_string(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DescriptorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&DescriptorEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The entries `keep` accepts, in order.
    pub fn filter(&self, mut keep: impl FnMut(&DescriptorEntry) -> bool) -> Self {
        Self {
            entries: self.entries.iter().filter(|e| keep(e)).cloned().collect(),
        }
    }

    /// std140 offsets of every non-sampler entry, and the block size
    /// rounded up to 16 bytes.
    pub fn std140_layout(&self) -> (Vec<UniformSlot>, usize) {
        let mut offset: usize = 0;
        let mut slots = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let Some((align, size)) = entry.ty.std140() else {
                continue;
            };
            offset = offset.next_multiple_of(align);
            slots.push(UniformSlot {
                name: entry.name.clone(),
                ty: entry.ty,
                offset,
                size,
            });
            offset += size;
        }
        (slots, offset.next_multiple_of(16))
    }

    /// GLSL member declarations, one per line, each indented by four spaces.
    pub fn glsl_members(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str("    ");
            out.push_str(entry.ty.glsl());
            out.push(' ');
            out.push_str(&entry.name);
            out.push_str(";\n");
        }
        out
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{} {}", entry.ty.name(), entry.name)?;
        }
        Ok(())
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let d = Descriptor::parse("float4 diffuse_color  float specular_exponent").unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.get("diffuse_color").unwrap().ty, ValueType::Float4);
        assert_eq!(d.to_string(), "float4 diffuse_color float specular_exponent");
        assert!(Descriptor::parse("").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Descriptor::parse("float4"),
            Err(ShaderError::InvalidDescriptor { .. })
        ));
        assert!(Descriptor::parse("double x").is_err());
        assert!(Descriptor::parse("float 1x").is_err());
        assert!(Descriptor::parse("float x float4 x").is_err());
    }

    #[test]
    fn std140_offsets() {
        let d = Descriptor::parse("float a float3 b float c mat4 m float2 d sampler2D tex").unwrap();
        let (slots, size) = d.std140_layout();
        let offsets: Vec<_> = slots.iter().map(|s| (s.name.as_str(), s.offset)).collect();
        // float3 aligns to 16; the float after it packs into its tail.
        assert_eq!(offsets, [("a", 0), ("b", 16), ("c", 28), ("m", 32), ("d", 96)]);
        assert_eq!(size, 112);
    }

    #[test]
    fn glsl_members() {
        let d = Descriptor::parse("float4 color int count").unwrap();
        assert_eq!(d.glsl_members(), "    vec4 color;\n    int count;\n");
    }
}
