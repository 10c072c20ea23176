//! Produced artifacts.

use crate::content::Content;

/// The result of producing one logical source path.
///
/// Build one with [`Artifact::new`] and hand it to [`Store::save`](crate::Store::save);
/// the returned copy carries the final `output_path` and, when namehashing is
/// configured, the content `hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Logical source path, unique within the origin index
    pub origin_path: String,

    /// Path exposed to consumers. Defaults to the origin path; after saving it
    /// starts with `/` unless a replacer chose otherwise, and may carry a
    /// version suffix that the output index key omits.
    pub output_path: Option<String>,

    /// Produced content
    pub data: Content,

    /// Content digest, set on save when namehashing is configured
    pub hash: Option<String>,
}

impl Artifact {
    /// Create an artifact whose output path defaults to its origin.
    pub fn new(origin_path: impl Into<String>, data: impl Into<Content>) -> Self {
        Self {
            origin_path: origin_path.into(),
            output_path: None,
            data: data.into(),
            hash: None,
        }
    }

    /// Publish under a different output path.
    pub fn with_output_path(mut self, output_path: impl Into<String>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    /// Output path, falling back to the origin path.
    pub fn output_path(&self) -> &str {
        self.output_path.as_deref().unwrap_or(&self.origin_path)
    }
}
