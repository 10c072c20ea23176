//! The virtual build tree store.
//!
//! A [`Store`] owns three structures, all keyed by key-form paths
//! (see [`crate::path`]):
//!
//! - the **origin index**: origin path -> artifact
//! - the **output index**: output path (hash-renamed, suffix-stripped) -> artifact
//! - the **tree**: nested projection of artifact content by output path
//!
//! [`Store::save`] is the only mutator and updates all three under a single
//! write lock, so readers never observe an artifact in one index but not the
//! other. There is no versioning: a second save under the same key replaces the
//! first, and concurrent [`Store::load`] calls for the same path each run the
//! producer, with whichever save lands last winning. The store is meant to be
//! owned by one build/server session and shared behind an `Arc`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::artifact::Artifact;
use crate::content::Content;
use crate::namehash::Namehash;
use crate::path;
use crate::producer::{ProduceResult, Producer, TreeProducer};
use crate::tree::TreeNode;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

#[derive(Debug, Default)]
struct StoreInner {
    origins: FxIndexMap<String, Arc<Artifact>>,
    outputs: FxIndexMap<String, Arc<Artifact>>,
    tree: TreeNode,
}

/// In-memory store of produced artifacts.
pub struct Store {
    inner: RwLock<StoreInner>,
    namehash: Option<Namehash>,
    producer: Arc<dyn Producer>,
}

impl Store {
    /// Create a store backed by `producer`, with namehashing disabled.
    pub fn new<P>(producer: P) -> Self
    where
        P: Producer + 'static,
    {
        Self::from_shared(Arc::new(producer))
    }

    /// Create a store from an already shared producer.
    pub fn from_shared(producer: Arc<dyn Producer>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            namehash: None,
            producer,
        }
    }

    /// Enable content hashing, renaming and reference rewriting.
    pub fn with_namehash(mut self, namehash: Namehash) -> Self {
        self.namehash = Some(namehash);
        self
    }

    pub fn namehash(&self) -> Option<&Namehash> {
        self.namehash.as_ref()
    }

    /// Record an artifact.
    ///
    /// The output path defaults to the origin path and is normalized to a
    /// single leading `/`. With namehashing configured the content digest is
    /// always stored, and non-entry origins are renamed through the replacer.
    /// Returns the artifact as stored.
    pub fn save(&self, mut artifact: Artifact) -> Arc<Artifact> {
        let mut output_key = path::normalize(artifact.output_path());
        artifact.output_path = Some(format!("/{}", output_key));

        if let Some(namehash) = &self.namehash {
            let hash = namehash.digest(artifact.data.as_bytes());
            if let Some(renamed) = namehash.rename(&artifact.origin_path, &output_key, &hash) {
                output_key = path::normalize(path::strip_suffix(&renamed));
                artifact.output_path = Some(renamed);
            }
            artifact.hash = Some(hash);
        }

        let origin_key = path::normalize(&artifact.origin_path);
        let artifact = Arc::new(artifact);

        {
            let mut inner = self.inner.write();
            inner.origins.insert(origin_key, Arc::clone(&artifact));
            inner.outputs.insert(output_key.clone(), Arc::clone(&artifact));
            let segments = path::segments(&output_key);
            inner.tree.set(&segments, artifact.data.clone());
        }

        tracing::debug!(
            origin = %artifact.origin_path,
            output = %artifact.output_path(),
            hash = artifact.hash.as_deref().unwrap_or("-"),
            "saved artifact"
        );
        artifact
    }

    /// Tree projection at `path` without producing anything.
    ///
    /// An empty (or segment-less) path returns the whole tree.
    pub fn get_raw(&self, path: &str) -> Option<TreeNode> {
        let segments = path::segments(path);
        self.inner.read().tree.get(&segments).cloned()
    }

    /// Produce content for `path`.
    ///
    /// The producer runs on every call. When it returns content for an output
    /// path whose artifact is an entry document, references inside the content
    /// are rewritten to the final output paths of the artifacts they point at.
    ///
    /// # Errors
    ///
    /// Producer failures are returned unchanged. A path nobody produces is
    /// `Ok(None)`.
    pub async fn load(&self, path: &str) -> ProduceResult<Option<Content>> {
        let current = self.get_raw(path);
        let Some(content) = self.producer.produce(path, current, self).await? else {
            tracing::debug!(path, "nothing produced");
            return Ok(None);
        };
        Ok(Some(self.rewrite_references(path, content)))
    }

    fn rewrite_references(&self, path: &str, content: Content) -> Content {
        let Some(namehash) = self.namehash.as_ref().filter(|n| n.rewrites_references()) else {
            return content;
        };

        let output_key = path::normalize(path);
        let inner = self.inner.read();
        let Some(entry) = inner.outputs.get(&output_key) else {
            return content;
        };
        if !namehash.is_entry(&entry.origin_path) {
            return content;
        }
        let Some(text) = content.as_text() else {
            return content;
        };

        let base_dir = path::dirname(&output_key);
        let rewritten = match namehash.rewrite(text, &base_dir, |origin| {
            inner
                .origins
                .get(origin)
                .map(|artifact| artifact.output_path().to_string())
        }) {
            Cow::Borrowed(_) => None,
            Cow::Owned(text) => Some(text),
        };

        match rewritten {
            Some(text) => Content::Text(text),
            None => content,
        }
    }

    /// Stored content at `output_path` with references rewritten, without
    /// running the producer.
    ///
    /// This is what a build writes to disk: by the time every artifact has
    /// been saved, each reference in an entry document can be resolved.
    pub fn published(&self, output_path: &str) -> Option<Content> {
        let key = path::normalize(path::strip_suffix(output_path));
        let data = self.inner.read().outputs.get(&key)?.data.clone();
        Some(self.rewrite_references(&key, data))
    }

    /// Drop every artifact and the whole tree.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.origins.clear();
        inner.outputs.clear();
        inner.tree = TreeNode::new();
        tracing::debug!("store reset");
    }

    /// Artifact saved under `origin_path`.
    pub fn get_by_origin(&self, origin_path: &str) -> Option<Arc<Artifact>> {
        let key = path::normalize(origin_path);
        self.inner.read().origins.get(&key).cloned()
    }

    /// Artifact published at `output_path` (query and version suffix ignored).
    pub fn get_by_output(&self, output_path: &str) -> Option<Arc<Artifact>> {
        let key = path::normalize(path::strip_suffix(output_path));
        self.inner.read().outputs.get(&key).cloned()
    }

    /// Output index entries in save order, as `(key, artifact)`.
    pub fn outputs(&self) -> Vec<(String, Arc<Artifact>)> {
        self.inner
            .read()
            .outputs
            .iter()
            .map(|(key, artifact)| (key.clone(), Arc::clone(artifact)))
            .collect()
    }

    /// Origin path -> final output path, sorted by origin.
    pub fn manifest(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .origins
            .iter()
            .map(|(origin, artifact)| (origin.clone(), artifact.output_path().to_string()))
            .collect()
    }

    /// Number of entries in the output index.
    pub fn len(&self) -> usize {
        self.inner.read().outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(TreeProducer)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Store")
            .field("origins", &inner.origins.len())
            .field("outputs", &inner.outputs.len())
            .field("namehash", &self.namehash)
            .finish_non_exhaustive()
    }
}
