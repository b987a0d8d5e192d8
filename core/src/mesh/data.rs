//! CPU-side mesh data.

use super::layout::{ScalarType, VertexAttribute, VertexLayout};

/// Errors raised while assembling a mesh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    /// A channel's element count does not match `vertex_count * components`.
    #[error("channel {name}: expected {expected} values, got {actual}")]
    ChannelLength {
        /// Attribute name.
        name: String,
        /// Expected scalar count.
        expected: usize,
        /// Supplied scalar count.
        actual: usize,
    },
    /// Component count outside 1..=4.
    #[error("channel {name}: invalid component count {components}")]
    InvalidComponents {
        /// Attribute name.
        name: String,
        /// Supplied component count.
        components: u32,
    },
    /// An index refers past the end of the vertex data.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index.
        index: u32,
        /// Mesh vertex count.
        vertex_count: u32,
    },
    /// A layout descriptor string could not be parsed.
    #[error("invalid vertex descriptor: {0:?}")]
    InvalidDescriptor(String),
}

/// Raw scalar storage for one vertex channel.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexData {
    /// Float components.
    Float(Vec<f32>),
    /// Integer components.
    Int(Vec<i32>),
}

impl VertexData {
    fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    fn scalar(&self) -> ScalarType {
        match self {
            Self::Float(_) => ScalarType::Float,
            Self::Int(_) => ScalarType::Int,
        }
    }
}

/// A CPU-side mesh made of named vertex channels.
///
/// Channels are stored non-interleaved; [`channel_bytes`](Self::channel_bytes)
/// exposes each one as raw bytes for upload. The [`VertexLayout`] is derived
/// from the channels in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    name: Option<String>,
    layout: VertexLayout,
    channels: Vec<VertexData>,
    vertex_count: u32,
    indices: Option<Vec<u32>>,
}

impl Mesh {
    /// Create an empty mesh expecting `vertex_count` vertices per channel.
    pub fn new(vertex_count: u32) -> Self {
        Self {
            name: None,
            layout: VertexLayout::new(),
            channels: Vec::new(),
            vertex_count,
            indices: None,
        }
    }

    /// Set a debug name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add (or replace) a float channel.
    pub fn set_float_channel(
        &mut self,
        name: &str,
        components: u32,
        data: Vec<f32>,
    ) -> Result<(), MeshError> {
        self.set_channel(name, components, VertexData::Float(data))
    }

    /// Add (or replace) an integer channel.
    pub fn set_int_channel(
        &mut self,
        name: &str,
        components: u32,
        data: Vec<i32>,
    ) -> Result<(), MeshError> {
        self.set_channel(name, components, VertexData::Int(data))
    }

    fn set_channel(&mut self, name: &str, components: u32, data: VertexData) -> Result<(), MeshError> {
        if !(1..=4).contains(&components) {
            return Err(MeshError::InvalidComponents {
                name: name.to_string(),
                components,
            });
        }
        let expected = self.vertex_count as usize * components as usize;
        if data.len() != expected {
            return Err(MeshError::ChannelLength {
                name: name.to_string(),
                expected,
                actual: data.len(),
            });
        }
        let attribute = VertexAttribute::new(name, data.scalar(), components);
        match self.layout.attributes().iter().position(|a| a.name == name) {
            Some(i) => self.channels[i] = data,
            None => self.channels.push(data),
        }
        self.layout.push(attribute);
        Ok(())
    }

    /// Set triangle-list indices.
    pub fn set_indices(&mut self, indices: Vec<u32>) -> Result<(), MeshError> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: self.vertex_count,
            });
        }
        self.indices = Some(indices);
        Ok(())
    }

    /// Debug name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Vertex layout derived from the channels.
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Index data, if indexed.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Raw channel data by attribute name.
    pub fn channel(&self, name: &str) -> Option<&VertexData> {
        let i = self.layout.attributes().iter().position(|a| a.name == name)?;
        self.channels.get(i)
    }

    /// Float channel by attribute name.
    pub fn float_channel(&self, name: &str) -> Option<&[f32]> {
        match self.channel(name)? {
            VertexData::Float(v) => Some(v),
            VertexData::Int(_) => None,
        }
    }

    /// Integer channel by attribute name.
    pub fn int_channel(&self, name: &str) -> Option<&[i32]> {
        match self.channel(name)? {
            VertexData::Int(v) => Some(v),
            VertexData::Float(_) => None,
        }
    }

    /// Channel data reinterpreted as bytes for upload.
    pub fn channel_bytes(&self, name: &str) -> Option<&[u8]> {
        Some(match self.channel(name)? {
            VertexData::Float(v) => bytemuck::cast_slice(v),
            VertexData::Int(v) => bytemuck::cast_slice(v),
        })
    }
}
