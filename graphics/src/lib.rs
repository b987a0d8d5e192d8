//! # vrscene graphics
//!
//! Shader variant compiler for vrscene render objects.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`shader`]: shader class templates, signatures and source generation
//! - [`RenderContext`]: per-context registry, compiled-shader cache and
//!   backend; resolves the program for a [`RenderData`](vrscene_core::scene::RenderData)
//! - [`ShaderBackend`]: seam to whatever builds the programs, with a
//!   [`DummyBackend`] for testing
//!
//! ## Example
//!
//! ```ignore
//! use vrscene_graphics::RenderContext;
//!
//! let context = RenderContext::headless()?;
//! let compiled = context.resolve_shader(&mut render_data, &lights)?;
//! println!("{}", compiled.signature);
//! ```

pub mod backend;
pub mod cache;
pub mod context;
pub mod error;
pub mod shader;

// Re-export main types for convenience
pub use backend::{DummyBackend, ShaderBackend};
pub use cache::{CompiledShader, CompiledShaderCache};
pub use context::{RenderContext, RenderContextConfig};
pub use error::ShaderError;
pub use shader::{ShaderRegistry, ShaderTemplate, ShaderVariant};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the crate version. Call once at startup after installing a logger.
pub fn init() {
    log::info!("vrscene graphics v{} initialized", VERSION);
}
