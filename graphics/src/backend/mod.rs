//! Shader backend abstraction.
//!
//! The render context hands generated GLSL to a [`ShaderBackend`], which
//! stands in for the native layer that actually builds the program.
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: accepts every program and hands out sequential
//!   handles; used by tests and tools that only need signatures and
//!   source

pub mod dummy;

pub use dummy::DummyBackend;

use vrscene_core::scene::ShaderHandle;

use crate::error::ShaderError;

/// Builds programs from generated source.
///
/// Called with the render context's cache lock held, so an implementation
/// sees each signature at most once per context.
pub trait ShaderBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Build the program for `signature`.
    fn compile(
        &self,
        signature: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ShaderHandle, ShaderError>;

    /// Release every program. Called at context teardown.
    fn release_all(&self) {}
}
