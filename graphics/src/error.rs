//! Shader compiler error types.

/// Errors raised while registering, generating or compiling shaders.
///
/// Registration errors (`MissingSegment`, `UnknownSegment`,
/// `InvalidDescriptor`) are programming errors in a shader class and are
/// reported as soon as the class is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    /// A required segment (`VertexTemplate` / `FragmentTemplate`) is absent.
    #[error("shader class '{class}' has no '{segment}' segment")]
    MissingSegment {
        /// Shader class name.
        class: String,
        /// Missing segment name.
        segment: String,
    },
    /// A segment references `@Name` but no segment of that name exists, or
    /// segments reference each other in a cycle.
    #[error("shader class '{class}': unknown or recursive segment reference '@{segment}'")]
    UnknownSegment {
        /// Shader class name.
        class: String,
        /// Referenced segment name.
        segment: String,
    },
    /// No shader class is registered under this id.
    #[error("no shader class registered for '{0}'")]
    UnknownShader(String),
    /// A `type name` descriptor string could not be parsed.
    #[error("invalid descriptor '{descriptor}': {reason}")]
    InvalidDescriptor {
        /// The offending descriptor text.
        descriptor: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The backend rejected generated source.
    #[error("compiling {signature} failed: {message}")]
    Compilation {
        /// Signature of the variant.
        signature: String,
        /// Backend message.
        message: String,
    },
    /// Render context configuration could not be read.
    #[error("render context config: {0}")]
    Config(String),
}
