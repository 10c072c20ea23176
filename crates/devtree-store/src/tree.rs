//! Hierarchical projection of saved artifacts.
//!
//! Every save writes the artifact's content at the segmented output path, so a
//! lookup of `css` yields a directory node holding everything saved under
//! `css/...`. Writes are last-write-wins at every level: saving a file where a
//! directory was replaces the directory, and saving beneath an existing file
//! turns that file into a directory.
//!
//! Directory maps are shared behind `Arc` and copied on write, so cloning a
//! subtree (as every [`Store::load`](crate::Store::load) does for the
//! producer) costs one reference count per level rather than a deep copy.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::content::Content;

/// A node in the virtual tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// Directory of child nodes keyed by segment name
    Dir(Arc<BTreeMap<String, TreeNode>>),
    /// Produced content
    File(Content),
}

impl Default for TreeNode {
    fn default() -> Self {
        TreeNode::Dir(Arc::default())
    }
}

impl TreeNode {
    /// Create an empty directory node.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, TreeNode::Dir(_))
    }

    /// Content of a file node.
    pub fn as_content(&self) -> Option<&Content> {
        match self {
            TreeNode::File(content) => Some(content),
            TreeNode::Dir(_) => None,
        }
    }

    /// Consume a file node into its content.
    pub fn into_content(self) -> Option<Content> {
        match self {
            TreeNode::File(content) => Some(content),
            TreeNode::Dir(_) => None,
        }
    }

    /// Children of a directory node.
    pub fn children(&self) -> Option<&BTreeMap<String, TreeNode>> {
        match self {
            TreeNode::Dir(children) => Some(children.as_ref()),
            TreeNode::File(_) => None,
        }
    }

    /// Look up the node at `segments`. An empty slice returns `self`.
    pub fn get(&self, segments: &[&str]) -> Option<&TreeNode> {
        let Some((first, rest)) = segments.split_first() else {
            return Some(self);
        };
        match self {
            TreeNode::Dir(children) => children.get(*first)?.get(rest),
            TreeNode::File(_) => None,
        }
    }

    /// Place `content` at `segments`, creating directories on the way.
    ///
    /// An empty slice is a no-op: the root is always a directory.
    pub fn set(&mut self, segments: &[&str], content: Content) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        if !self.is_dir() {
            *self = TreeNode::new();
        }
        let TreeNode::Dir(children) = self else {
            return;
        };
        let children = Arc::make_mut(children);
        if rest.is_empty() {
            children.insert((*first).to_string(), TreeNode::File(content));
        } else {
            children
                .entry((*first).to_string())
                .or_default()
                .set(rest, content);
        }
    }

    /// Number of file nodes beneath (and including) this node.
    pub fn file_count(&self) -> usize {
        match self {
            TreeNode::File(_) => 1,
            TreeNode::Dir(children) => children.values().map(TreeNode::file_count).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut root = TreeNode::new();
        root.set(&["css", "app.css"], Content::from("body{}"));

        let file = root.get(&["css", "app.css"]).unwrap();
        assert_eq!(file.as_content(), Some(&Content::from("body{}")));

        let dir = root.get(&["css"]).unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir.children().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_segments_return_root() {
        let mut root = TreeNode::new();
        root.set(&["a.js"], Content::from("a"));
        assert_eq!(root.get(&[]), Some(&root));
    }

    #[test]
    fn test_missing_path_is_none() {
        let mut root = TreeNode::new();
        root.set(&["a.js"], Content::from("a"));
        assert!(root.get(&["b.js"]).is_none());
        assert!(root.get(&["a.js", "deeper"]).is_none());
    }

    #[test]
    fn test_set_empty_is_noop() {
        let mut root = TreeNode::new();
        root.set(&[], Content::from("lost"));
        assert_eq!(root, TreeNode::new());
    }

    #[test]
    fn test_file_replaced_by_directory() {
        let mut root = TreeNode::new();
        root.set(&["lib"], Content::from("file"));
        root.set(&["lib", "index.js"], Content::from("nested"));

        assert!(root.get(&["lib"]).unwrap().is_dir());
        assert_eq!(root.file_count(), 1);
    }

    #[test]
    fn test_directory_replaced_by_file() {
        let mut root = TreeNode::new();
        root.set(&["lib", "index.js"], Content::from("nested"));
        root.set(&["lib"], Content::from("file"));

        assert_eq!(
            root.get(&["lib"]).unwrap().as_content(),
            Some(&Content::from("file"))
        );
    }

    #[test]
    fn test_clone_is_a_snapshot() {
        let mut root = TreeNode::new();
        root.set(&["css", "a.css"], Content::from("a"));
        let snapshot = root.clone();

        root.set(&["css", "b.css"], Content::from("b"));
        root.set(&["css", "a.css"], Content::from("changed"));

        assert_eq!(snapshot.file_count(), 1);
        assert_eq!(
            snapshot.get(&["css", "a.css"]).and_then(TreeNode::as_content),
            Some(&Content::from("a"))
        );
        assert_eq!(root.file_count(), 2);
    }

    #[test]
    fn test_clone_shares_directories() {
        let mut root = TreeNode::new();
        root.set(&["img", "logo.png"], Content::from(vec![1u8]));
        let snapshot = root.clone();

        match (&root, &snapshot) {
            (TreeNode::Dir(a), TreeNode::Dir(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("root is always a directory"),
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut root = TreeNode::new();
        root.set(&["a.js"], Content::from("one"));
        root.set(&["a.js"], Content::from("two"));
        assert_eq!(
            root.get(&["a.js"]).and_then(TreeNode::as_content),
            Some(&Content::from("two"))
        );
    }
}
