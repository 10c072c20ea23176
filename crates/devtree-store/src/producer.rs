//! The content-producing capability injected into a [`Store`].
//!
//! A producer is asked for a logical path every time [`Store::load`] runs. It
//! may read the store (including `load`ing dependencies) and `save` derived
//! artifacts before answering. Deduplication of repeated calls for the same
//! path is left to the producer.

use async_trait::async_trait;

use crate::content::Content;
use crate::store::Store;
use crate::tree::TreeNode;

/// Result type for producer calls.
///
/// Producer failures are opaque to the store and propagate unchanged to the
/// caller of [`Store::load`].
pub type ProduceResult<T> = anyhow::Result<T>;

/// Materializes content for logical paths.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use devtree_store::{Artifact, Content, ProduceResult, Producer, Store, TreeNode};
///
/// struct Banner;
///
/// #[async_trait]
/// impl Producer for Banner {
///     async fn produce(
///         &self,
///         path: &str,
///         _current: Option<TreeNode>,
///         store: &Store,
///     ) -> ProduceResult<Option<Content>> {
///         if path != "banner.txt" {
///             return Ok(None);
///         }
///         let saved = store.save(Artifact::new(path, "hello"));
///         Ok(Some(saved.data.clone()))
///     }
/// }
/// ```
#[async_trait]
pub trait Producer: Send + Sync {
    /// Produce content for `path`.
    ///
    /// `current` is the tree projection at `path` before this call (a file,
    /// a directory, or `None`). Return `Ok(None)` when this producer does not
    /// own the path.
    async fn produce(
        &self,
        path: &str,
        current: Option<TreeNode>,
        store: &Store,
    ) -> ProduceResult<Option<Content>>;
}

/// Serves whatever is already projected in the tree at the requested path.
///
/// Directories and missing paths produce nothing. This is the producer of
/// [`Store::default`], useful when artifacts are published only through
/// [`Store::save`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeProducer;

#[async_trait]
impl Producer for TreeProducer {
    async fn produce(
        &self,
        _path: &str,
        current: Option<TreeNode>,
        _store: &Store,
    ) -> ProduceResult<Option<Content>> {
        Ok(current.and_then(TreeNode::into_content))
    }
}
