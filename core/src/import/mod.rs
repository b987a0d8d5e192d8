//! Asset graph builder.
//!
//! Turns a parsed external scene description ([`SourceScene`]) into a
//! subtree of the engine's [`SceneGraph`](crate::scene::SceneGraph):
//! nodes with transforms, cameras, lights, meshes with materials and
//! textures, a skeleton with skinned meshes, and animations.
//!
//! # Stages
//!
//! [`import_scene`] runs, in order:
//!
//! 1. the first camera becomes a `MainCamera` node under the import root,
//! 2. importable lights are collected by name (unless `NO_LIGHTING`),
//! 3. the node tree is traversed; unnamed single-child wrappers collapse
//!    and multi-mesh nodes split into `<name>-<mesh>` children,
//! 4. bone names referenced by skinned meshes are resolved against the
//!    built tree into one skeleton,
//! 5. meshes and materials are built (each shared by index),
//! 6. animation channels are routed to the skeleton or to named nodes.
//!
//! Problems at any stage are logged and recorded; the import never aborts
//! once parsing succeeded.
//!
//! # Loading files
//!
//! [`AssetLoader`] reads a file, picks a [`SceneLoader`] by extension,
//! runs the import and reports progress through [`AssetEvent`]s. The
//! request completes (and [`AssetEvent::AssetLoaded`] fires) once the
//! model and every texture it requested are done.

mod animation;
mod bones;
mod builder;
mod context;
mod error;
mod events;
#[cfg(feature = "gltf")]
mod gltf;
mod loader;
mod materials;
mod meshes;
mod registry;
mod request;
mod settings;
mod source;
mod textures;

#[cfg(test)]
mod tests;

pub use animation::{convert_channel, correct_root_bone_scale};
pub use builder::{ImportOutcome, MAIN_CAMERA, import_scene};
pub use error::ImportError;
pub use events::{AssetEvent, AssetListener, EventDispatcher};
#[cfg(feature = "gltf")]
pub use gltf::GltfSceneLoader;
pub use loader::AssetLoader;
pub use materials::{select_shader, texture_slot};
pub use meshes::{MAX_BONE_INFLUENCES, MAX_COLOR_SETS, MAX_TEXCOORD_SETS};
pub use registry::{LoaderRegistry, SceneLoader};
pub use request::AssetRequest;
pub use settings::{AssetConfig, ImportSection, ImportSettings, TaskSection, TextureSection};
pub use source::{
    DEFAULT_TICKS_PER_SECOND, EmbeddedTexture, IDENTITY, ShadingWorkflow, SourceAnimation,
    SourceBone, SourceCamera, SourceChannel, SourceLight, SourceLightKind, SourceMaterial,
    SourceMesh, SourceMorphTarget, SourceNode, SourceScene, SourceTexture, TextureKind,
    VertexWeight,
};
pub use textures::{
    FileTextureResolver, RequestTextures, TextureProvider, TextureResolver, decode_embedded,
    embedded_index,
};
