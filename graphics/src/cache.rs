//! Compiled-shader cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use vrscene_core::scene::ShaderHandle;

use crate::error::ShaderError;
use crate::shader::Descriptor;

/// A compiled variant and the descriptors it was generated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    pub handle: ShaderHandle,
    pub signature: String,
    pub vertex_source: String,
    pub fragment_source: String,
    /// Uniforms the variant reads, in declaration order.
    pub uniforms: Descriptor,
    pub textures: Descriptor,
    pub vertex_attributes: Descriptor,
}

/// Signature to compiled variant. Entries are never evicted; the cache is
/// cleared as a whole at context teardown.
#[derive(Debug, Default)]
pub struct CompiledShaderCache {
    entries: Mutex<HashMap<String, Arc<CompiledShader>>>,
}

impl CompiledShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signature: &str) -> Option<Arc<CompiledShader>> {
        self.entries.lock().get(signature).cloned()
    }

    /// Return the entry for `signature`, running `compile` to create it on
    /// a miss. The lock is held while `compile` runs, so concurrent misses
    /// on one signature compile once. The flag is `true` on a hit.
    pub fn get_or_compile(
        &self,
        signature: &str,
        compile: impl FnOnce() -> Result<CompiledShader, ShaderError>,
    ) -> Result<(Arc<CompiledShader>, bool), ShaderError> {
        let mut entries = self.entries.lock();
        if let Some(hit) = entries.get(signature) {
            return Ok((Arc::clone(hit), true));
        }
        let compiled = Arc::new(compile()?);
        entries.insert(signature.to_string(), Arc::clone(&compiled));
        Ok((compiled, false))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cached signatures, sorted.
    pub fn signatures(&self) -> Vec<String> {
        let mut signatures: Vec<String> = self.entries.lock().keys().cloned().collect();
        signatures.sort();
        signatures
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(handle: u32) -> CompiledShader {
        CompiledShader {
            handle: ShaderHandle(handle),
            signature: "Texture".into(),
            vertex_source: String::new(),
            fragment_source: String::new(),
            uniforms: Descriptor::default(),
            textures: Descriptor::default(),
            vertex_attributes: Descriptor::default(),
        }
    }

    #[test]
    fn compiles_once_per_signature() {
        let cache = CompiledShaderCache::new();
        let (first, hit) = cache.get_or_compile("Texture", || Ok(compiled(1))).unwrap();
        assert!(!hit);
        let (second, hit) = cache
            .get_or_compile("Texture", || panic!("recompiled a cached signature"))
            .unwrap();
        assert!(hit);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = CompiledShaderCache::new();
        let err = cache
            .get_or_compile("Texture", || Err(ShaderError::UnknownShader("x".into())))
            .unwrap_err();
        assert_eq!(err, ShaderError::UnknownShader("x".into()));
        assert!(cache.is_empty());
        cache.get_or_compile("Texture", || Ok(compiled(2))).unwrap();
        assert_eq!(cache.signatures(), ["Texture"]);
        cache.clear();
        assert!(cache.get("Texture").is_none());
    }
}
