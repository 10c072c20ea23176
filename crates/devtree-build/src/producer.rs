//! Producer that serves files from a project directory.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use path_clean::PathClean;

use devtree_store::{Artifact, Content, ProduceResult, Producer, Store, TreeNode, path};

use crate::util;

/// Reads logical paths from `root` and records them in the store.
///
/// Text files (by MIME type) are stored as [`Content::Text`] when they are
/// valid UTF-8; everything else is stored as bytes. A path with no file on
/// disk (a hash-renamed output, or anything saved by another producer) is
/// answered from the current tree projection. Directories and paths that
/// would resolve outside `root` produce nothing.
#[derive(Debug, Clone)]
pub struct FsProducer {
    root: PathBuf,
    mime_types: BTreeMap<String, String>,
}

impl FsProducer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into().clean(),
            mime_types: BTreeMap::new(),
        }
    }

    /// Suffix -> MIME overrides used to decide text vs binary.
    pub fn with_mime_types(mut self, mime_types: BTreeMap<String, String>) -> Self {
        self.mime_types = mime_types;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of a store key, if it stays under `root`.
    pub fn resolve(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() {
            return None;
        }
        let full = self.root.join(key).clean();
        full.starts_with(&self.root).then_some(full)
    }
}

#[async_trait]
impl Producer for FsProducer {
    async fn produce(
        &self,
        path: &str,
        current: Option<TreeNode>,
        store: &Store,
    ) -> ProduceResult<Option<Content>> {
        let key = path::normalize(path);
        let Some(file) = self.resolve(&key) else {
            return Ok(None);
        };

        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(current.and_then(TreeNode::into_content));
            }
            Err(err) if err.kind() == ErrorKind::IsADirectory => return Ok(None),
            Err(err) if file.is_dir() => {
                tracing::trace!(path = %file.display(), error = %err, "skipping directory");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let content = if util::is_text(&key, &self.mime_types) {
            match String::from_utf8(bytes) {
                Ok(text) => Content::Text(text),
                Err(err) => Content::Binary(err.into_bytes()),
            }
        } else {
            Content::Binary(bytes)
        };

        let saved = store.save(Artifact::new(key, content));
        Ok(Some(saved.data.clone()))
    }
}
