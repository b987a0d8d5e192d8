//! Shader class templates.
//!
//! A [`ShaderTemplate`] is a shader class registration: named GLSL
//! segments plus the uniform, texture and vertex-attribute descriptors the
//! class can consume. Segments are named after the stage they belong to
//! (`Vertex…` / `Fragment…`); the master segment of each stage is
//! `VertexTemplate` / `FragmentTemplate`, and any segment may pull in
//! another one of the same stage with an `@Name` token.

use std::fmt;

use crate::error::ShaderError;

use super::descriptor::Descriptor;

/// Tokens filled in by the generator rather than by a registered segment.
pub const RESERVED_TOKENS: [&str; 4] = [
    "LIGHTSOURCES",
    "MATERIAL_UNIFORMS",
    "BONES_UNIFORMS",
    "TEXCOORDS",
];

const DEFINE_PREFIX: &str = "HAS_";

/// Programmable stage a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// Prefix of every segment name of this stage.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Vertex => "Vertex",
            Self::Fragment => "Fragment",
        }
    }

    /// Name of the stage's master segment.
    pub fn master(self) -> &'static str {
        match self {
            Self::Vertex => "VertexTemplate",
            Self::Fragment => "FragmentTemplate",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A validated shader class.
#[derive(Debug, Clone)]
pub struct ShaderTemplate {
    class_name: String,
    segments: Vec<(String, String)>,
    uniforms: Descriptor,
    textures: Descriptor,
    vertex_attributes: Descriptor,
    definable: Vec<String>,
}

impl ShaderTemplate {
    /// Start registering a class named `class_name`.
    pub fn builder(class_name: impl Into<String>) -> ShaderTemplateBuilder {
        ShaderTemplateBuilder {
            class_name: class_name.into(),
            segments: Vec::new(),
            uniforms: String::new(),
            textures: String::new(),
            vertex_attributes: String::new(),
        }
    }

    /// Simple class name; the first part of every signature.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Source of segment `name`.
    pub fn segment(&self, name: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, source)| source.as_str())
    }

    /// Segment names in registration order.
    pub fn segment_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|(n, _)| n.as_str())
    }

    pub fn uniforms(&self) -> &Descriptor {
        &self.uniforms
    }

    pub fn textures(&self) -> &Descriptor {
        &self.textures
    }

    pub fn vertex_attributes(&self) -> &Descriptor {
        &self.vertex_attributes
    }

    /// Names following `HAS_` anywhere in the segments, in the order they
    /// were first seen.
    pub fn definable_names(&self) -> &[String] {
        &self.definable
    }

    pub fn is_definable(&self, name: &str) -> bool {
        self.definable.iter().any(|n| n == name)
    }

    /// Whether the class can consume lights.
    pub fn uses_lights(&self) -> bool {
        self.is_definable("LIGHTSOURCES")
    }

    /// Expand the master segment of `stage`.
    ///
    /// Every `@Name` token naming a segment of the same stage is replaced
    /// by that segment, recursively. Reserved tokens are replaced by
    /// whatever `reserved` returns for them. Tokens without this stage's
    /// prefix, including references to the other stage, are kept verbatim.
    pub fn expand(
        &self,
        stage: ShaderStage,
        reserved: &mut dyn FnMut(&str) -> String,
    ) -> Result<String, ShaderError> {
        let master = self.segment(stage.master()).ok_or_else(|| ShaderError::MissingSegment {
            class: self.class_name.clone(),
            segment: stage.master().to_string(),
        })?;
        let mut out = String::with_capacity(master.len() * 2);
        let mut stack = vec![stage.master()];
        self.expand_into(stage, master, reserved, &mut stack, &mut out)?;
        Ok(out)
    }

    fn expand_into<'a>(
        &'a self,
        stage: ShaderStage,
        source: &'a str,
        reserved: &mut dyn FnMut(&str) -> String,
        stack: &mut Vec<&'a str>,
        out: &mut String,
    ) -> Result<(), ShaderError> {
        let mut rest = source;
        while let Some(at) = rest.find('@') {
            out.push_str(&rest[..at]);
            let after = &rest[at + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let token = &after[..len];
            rest = &after[len..];

            if RESERVED_TOKENS.contains(&token) {
                out.push_str(&reserved(token));
                continue;
            }
            // Segments of the other stage are not substituted here.
            if !token.starts_with(stage.prefix()) {
                out.push('@');
                out.push_str(token);
                continue;
            }
            let unknown = || ShaderError::UnknownSegment {
                class: self.class_name.clone(),
                segment: token.to_string(),
            };
            if stack.contains(&token) {
                return Err(unknown());
            }
            let (name, body) = self
                .segments
                .iter()
                .find(|(n, _)| n == token)
                .map(|(n, s)| (n.as_str(), s.as_str()))
                .ok_or_else(unknown)?;
            stack.push(name);
            self.expand_into(stage, body, reserved, stack, out)?;
            stack.pop();
        }
        out.push_str(rest);
        Ok(())
    }
}

/// Collects the parts of a [`ShaderTemplate`]; validation happens in
/// [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ShaderTemplateBuilder {
    class_name: String,
    segments: Vec<(String, String)>,
    uniforms: String,
    textures: String,
    vertex_attributes: String,
}

impl ShaderTemplateBuilder {
    /// Add (or replace) segment `name`.
    #[must_use]
    pub fn segment(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        let source = source.into();
        match self.segments.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = source,
            None => self.segments.push((name, source)),
        }
        self
    }

    #[must_use]
    pub fn uniforms(mut self, descriptor: impl Into<String>) -> Self {
        self.uniforms = descriptor.into();
        self
    }

    #[must_use]
    pub fn textures(mut self, descriptor: impl Into<String>) -> Self {
        self.textures = descriptor.into();
        self
    }

    #[must_use]
    pub fn vertex_attributes(mut self, descriptor: impl Into<String>) -> Self {
        self.vertex_attributes = descriptor.into();
        self
    }

    /// Validate and finish the class.
    ///
    /// Fails when a master segment is missing, when a segment references
    /// an unknown or recursive segment of its own stage, or when a
    /// descriptor does not parse.
    pub fn build(self) -> Result<ShaderTemplate, ShaderError> {
        let template = ShaderTemplate {
            uniforms: Descriptor::parse(&self.uniforms)?,
            textures: Descriptor::parse(&self.textures)?,
            vertex_attributes: Descriptor::parse(&self.vertex_attributes)?,
            definable: discover_defines(self.segments.iter().map(|(_, s)| s.as_str())),
            class_name: self.class_name,
            segments: self.segments,
        };
        for stage in ShaderStage::ALL {
            template.expand(stage, &mut |_| String::new())?;
        }
        log::debug!(
            "registered shader class {} ({} segments, definable: {})",
            template.class_name,
            template.segments.len(),
            template.definable.join(" ")
        );
        Ok(template)
    }
}

fn discover_defines<'a>(sources: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for source in sources {
        for (at, _) in source.match_indices(DEFINE_PREFIX) {
            // Skip matches inside a longer identifier such as `XHAS_`.
            let preceded_by_ident = source[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
            if preceded_by_ident {
                continue;
            }
            let tail = &source[at + DEFINE_PREFIX.len()..];
            let len = tail
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(tail.len());
            let name = &tail[..len];
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ShaderTemplateBuilder {
        ShaderTemplate::builder("Minimal")
            .segment(
                "VertexTemplate",
                "#ifdef HAS_a_normal\n@VertexNormal\n#endif\nvoid main() {}\n",
            )
            .segment("VertexNormal", "out vec3 normal; // HAS_a_normal again\n")
            .segment(
                "FragmentTemplate",
                "#ifdef HAS_LIGHTSOURCES\n@LIGHTSOURCES\n#endif\nvoid main() {}\n",
            )
    }

    #[test]
    fn discovers_defines_in_order() {
        let template = minimal().build().unwrap();
        assert_eq!(template.definable_names(), ["a_normal", "LIGHTSOURCES"]);
        assert!(template.uses_lights());
    }

    #[test]
    fn expands_nested_segments() {
        let template = minimal().build().unwrap();
        let vertex = template
            .expand(ShaderStage::Vertex, &mut |_| String::new())
            .unwrap();
        assert!(vertex.contains("out vec3 normal;"));
        assert!(!vertex.contains('@'));

        let fragment = template
            .expand(ShaderStage::Fragment, &mut |token| format!("<{token}>"))
            .unwrap();
        assert!(fragment.contains("<LIGHTSOURCES>"));
    }

    #[test]
    fn keeps_unrelated_at_signs() {
        let template = ShaderTemplate::builder("At")
            .segment("VertexTemplate", "// mail@example\nvoid main() {}\n")
            .segment("FragmentTemplate", "void main() {}\n")
            .build()
            .unwrap();
        let vertex = template
            .expand(ShaderStage::Vertex, &mut |_| String::new())
            .unwrap();
        assert!(vertex.contains("mail@example"));
    }

    #[test]
    fn missing_master_segment_is_an_error() {
        let err = ShaderTemplate::builder("Broken")
            .segment("VertexTemplate", "void main() {}")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ShaderError::MissingSegment {
                class: "Broken".into(),
                segment: "FragmentTemplate".into()
            }
        );
    }

    #[test]
    fn other_stage_references_are_left_alone() {
        let template = minimal()
            .segment("VertexNormal", "vec3 n;")
            .segment("FragmentTemplate", "@VertexNormal\nvoid main() {}")
            .build()
            .unwrap();
        let fragment = template
            .expand(ShaderStage::Fragment, &mut |_| String::new())
            .unwrap();
        assert!(fragment.contains("@VertexNormal"));
        assert!(!fragment.contains("vec3 n;"));
    }

    #[test]
    fn unknown_and_recursive_references_are_errors() {
        let unknown = minimal()
            .segment("FragmentTemplate", "@FragmentMissing\nvoid main() {}")
            .build();
        assert!(matches!(unknown, Err(ShaderError::UnknownSegment { segment, .. }) if segment == "FragmentMissing"));

        let recursive = minimal()
            .segment("VertexNormal", "@VertexLoop")
            .segment("VertexLoop", "@VertexNormal")
            .build();
        assert!(matches!(recursive, Err(ShaderError::UnknownSegment { .. })));
    }

    #[test]
    fn bad_descriptor_is_an_error() {
        let err = minimal().uniforms("float4").build().unwrap_err();
        assert!(matches!(err, ShaderError::InvalidDescriptor { .. }));
    }
}
