//! Importer errors.

use std::path::PathBuf;

use crate::mesh::MeshError;

/// Errors raised while loading or importing a model.
///
/// Whether an error aborts the import or is accumulated into the request's
/// error list is decided by the caller: an unreadable or unparsable model
/// file is fatal, everything else is recorded and reported once the import
/// finishes.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// No loader is registered for the file extension.
    #[error("no loader registered for extension '{0}'")]
    UnknownExtension(String),

    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file contents could not be parsed into a scene.
    #[error("cannot parse {name}: {message}")]
    Parse {
        /// File name.
        name: String,
        /// Parser message.
        message: String,
    },

    /// A node references a mesh the scene does not contain, or the mesh
    /// has no usable vertex data.
    #[error("mesh {index} is missing or unusable: {reason}")]
    MissingMesh {
        /// Source mesh index.
        index: usize,
        /// What was wrong.
        reason: String,
    },

    /// Vertex data rejected by the mesh builder.
    #[error("mesh {index}: {source}")]
    Mesh {
        /// Source mesh index.
        index: usize,
        /// Underlying error.
        #[source]
        source: MeshError,
    },

    /// A texture could not be resolved or decoded.
    #[error("texture '{key}': {message}")]
    TextureDecode {
        /// Resolved texture key.
        key: String,
        /// What went wrong.
        message: String,
    },

    /// The scene has no nodes.
    #[error("scene '{0}' is empty")]
    EmptyScene(String),

    /// Importer configuration could not be loaded.
    #[error("invalid asset configuration: {0}")]
    Config(String),
}
