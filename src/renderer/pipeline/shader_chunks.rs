//! WGSL `#include` preprocessor
//!
//! `#include <name>` is replaced by the named chunk, recursively. Chunks come
//! from a [`ShaderChunks`] table; [`ShaderChunks::builtin`] carries the
//! engine's uniform declarations so material shaders do not have to repeat the
//! group 1 / group 2 layouts by hand.

use std::borrow::Cow;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use crate::errors::{PrismError, Result};

const INCLUDE_DIRECTIVE: &str = "#include";

/// Group 1: per-drawable transforms.
const TRANSFORM_UNIFORMS: &str = r"
@group(1) @binding(0) var<uniform> model_matrix: mat4x4<f32>;
@group(1) @binding(1) var<uniform> world_matrix: mat4x4<f32>;
@group(1) @binding(2) var<uniform> normal_matrix: mat4x4<f32>;
";

/// Group 2: camera.
const CAMERA_UNIFORMS: &str = r"
@group(2) @binding(0) var<uniform> view_matrix: mat4x4<f32>;
@group(2) @binding(1) var<uniform> projection_matrix: mat4x4<f32>;
@group(2) @binding(2) var<uniform> camera_world_matrix: mat4x4<f32>;
";

/// Interleaved vertex input matching `Vertex`.
const VERTEX_INPUT: &str = r"
struct VertexInput {
    @location(0) position: vec4<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};
";

const HASH: &str = r"
fn hash13(p3_in: vec3<f32>) -> f32 {
    var p3 = fract(p3_in * 0.1031);
    p3 = p3 + dot(p3, p3.zyx + 31.32);
    return fract((p3.x + p3.y) * p3.z);
}
";

static BUILTIN: LazyLock<ShaderChunks> = LazyLock::new(|| {
    let mut chunks = ShaderChunks::new();
    chunks.register("transform_uniforms", TRANSFORM_UNIFORMS);
    chunks.register("camera_uniforms", CAMERA_UNIFORMS);
    chunks.register("vertex_input", VERTEX_INPUT);
    chunks.register("hash", HASH);
    chunks
});

/// Named WGSL chunk table.
#[derive(Debug, Clone, Default)]
pub struct ShaderChunks {
    chunks: FxHashMap<String, Cow<'static, str>>,
    aliases: FxHashMap<String, String>,
}

impl ShaderChunks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The engine's built-in chunks.
    #[must_use]
    pub fn builtin() -> &'static ShaderChunks {
        &BUILTIN
    }

    /// A table seeded with the built-in chunks, for adding user chunks.
    #[must_use]
    pub fn with_builtins() -> Self {
        BUILTIN.clone()
    }

    pub fn register(&mut self, name: &str, source: impl Into<Cow<'static, str>>) {
        self.chunks.insert(name.to_string(), source.into());
    }

    /// Makes `#include <alias>` resolve to `target`.
    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.chunks
            .get(name)
            .or_else(|| self.aliases.get(name).and_then(|t| self.chunks.get(t)))
            .map(AsRef::as_ref)
    }

    /// Expands every `#include <name>` in `source`.
    pub fn resolve(&self, source: &str) -> Result<String> {
        let mut out = String::with_capacity(source.len());
        let mut stack = Vec::new();
        self.expand(source, &mut out, &mut stack)?;
        Ok(out)
    }

    fn expand(&self, source: &str, out: &mut String, stack: &mut Vec<String>) -> Result<()> {
        let mut rest = source;
        while let Some(pos) = rest.find(INCLUDE_DIRECTIVE) {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + INCLUDE_DIRECTIVE.len()..];
            let Some((name, tail)) = parse_include_target(after) else {
                // Not a well-formed directive, keep it verbatim
                out.push_str(INCLUDE_DIRECTIVE);
                rest = after;
                continue;
            };

            if stack.iter().any(|n| n == name) {
                return Err(PrismError::ShaderIncludeCycle(name.to_string()));
            }
            let chunk = self
                .get(name)
                .ok_or_else(|| PrismError::ShaderIncludeUnresolved(name.to_string()))?;

            stack.push(name.to_string());
            self.expand(chunk, out, stack)?;
            stack.pop();

            rest = tail;
        }
        out.push_str(rest);
        Ok(())
    }
}

/// Parses `\s*<name>` and returns the name and the remaining text.
fn parse_include_target(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim_start_matches([' ', '\t']);
    let body = trimmed.strip_prefix('<')?;
    let end = body.find('>')?;
    let name = body[..end].trim();
    if name.is_empty() || name.contains('\n') {
        return None;
    }
    Some((name, &body[end + 1..]))
}

/// Resolves includes against the built-in table.
pub fn parse_includes(source: &str) -> Result<String> {
    ShaderChunks::builtin().resolve(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_tolerates_spacing() {
        assert_eq!(parse_include_target("  <foo>\nrest"), Some(("foo", "\nrest")));
        assert_eq!(parse_include_target("<foo"), None);
        assert_eq!(parse_include_target(" foo>"), None);
    }

    #[test]
    fn builtin_chunks_are_registered() {
        let chunks = ShaderChunks::builtin();
        assert!(chunks.get("camera_uniforms").is_some());
        assert!(chunks.get("transform_uniforms").is_some());
    }
}
