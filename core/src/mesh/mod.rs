//! CPU-side mesh types.
//!
//! - [`VertexLayout`]: ordered attribute name → (scalar type, components)
//! - [`Mesh`]: named vertex channels plus optional indices
//!
//! Attribute names follow the shader convention (`a_position`,
//! `a_texcoord1`, …) so a shader template can test for them by name.

mod data;
mod layout;

pub use data::{Mesh, MeshError, VertexData};
pub use layout::{ScalarType, VertexAttribute, VertexLayout, attr};
