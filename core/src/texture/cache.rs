//! Context-owned texture cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{SamplerSettings, Texture};

/// Maps resolved texture keys to shared [`Texture`]s.
///
/// One cache belongs to one rendering context; it is passed to the asset
/// loader by reference and cleared at context teardown.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: Mutex<HashMap<String, Arc<Texture>>>,
}

impl TextureCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached texture for `key`, or insert a new pending one.
    ///
    /// The boolean is `true` when the texture was created by this call and
    /// the caller is therefore responsible for loading it.
    pub fn get_or_create(&self, key: &str, sampler: SamplerSettings) -> (Arc<Texture>, bool) {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(key) {
            return (Arc::clone(existing), false);
        }
        let texture = Arc::new(Texture::new(key, sampler));
        entries.insert(key.to_string(), Arc::clone(&texture));
        (texture, true)
    }

    /// Look up without inserting.
    pub fn get(&self, key: &str) -> Option<Arc<Texture>> {
        self.entries.lock().get(key).cloned()
    }

    /// Number of cached textures.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        log::debug!("clearing texture cache ({} entries)", entries.len());
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lookup_shares_texture() {
        let cache = TextureCache::new();
        let (a, created_a) = cache.get_or_create("wood.png", SamplerSettings::default());
        let (b, created_b) = cache.get_or_create("wood.png", SamplerSettings::nearest());
        assert!(created_a);
        assert!(!created_b);
        assert!(Arc::ptr_eq(&a, &b));
        cache.clear();
        assert!(cache.is_empty());
    }
}
