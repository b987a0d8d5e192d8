//! Dummy shader backend for testing and development.
//!
//! Doesn't compile anything; every program gets the next handle.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use vrscene_core::scene::ShaderHandle;

use crate::error::ShaderError;

use super::ShaderBackend;

/// Dummy shader backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_handle: AtomicU32,
    compiled: AtomicUsize,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of programs compiled so far.
    pub fn compile_count(&self) -> usize {
        self.compiled.load(Ordering::Acquire)
    }
}

impl ShaderBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy Backend"
    }

    fn compile(
        &self,
        signature: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ShaderHandle, ShaderError> {
        if vertex.is_empty() || fragment.is_empty() {
            return Err(ShaderError::Compilation {
                signature: signature.to_string(),
                message: "empty source".to_string(),
            });
        }
        let handle = ShaderHandle(self.next_handle.fetch_add(1, Ordering::AcqRel) + 1);
        self.compiled.fetch_add(1, Ordering::AcqRel);
        log::trace!(
            "DummyBackend: compiled {signature} as {handle:?} ({} + {} bytes)",
            vertex.len(),
            fragment.len()
        );
        Ok(handle)
    }

    fn release_all(&self) {
        log::trace!("DummyBackend: releasing {} programs", self.compile_count());
    }
}
