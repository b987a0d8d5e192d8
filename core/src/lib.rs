//! # vrscene core
//!
//! Scene-graph side of the vrscene framework:
//!
//! - [`mesh`]: vertex layouts and CPU meshes
//! - [`material`]: materials bound to shader classes
//! - [`light`]: light kinds and their shader fragments
//! - [`texture`]: asynchronously filled textures and the texture cache
//! - [`scene`]: the node arena, render data, skeletons, skins, animations
//! - [`import`]: the asset graph builder that turns an external scene
//!   description into an engine node tree
//! - [`tasks`]: background task pool and the render-thread queue

pub mod import;
pub mod light;
pub mod material;
pub mod math;
pub mod mesh;
pub mod profiling;
pub mod scene;
pub mod tasks;
pub mod texture;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the crate version. Call once at startup after installing a logger.
pub fn init() {
    log::info!("vrscene core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
