//! # devtree-store
//!
//! In-memory virtual build tree for front-end dev servers.
//!
//! The [`Store`] records every produced [`Artifact`] under its origin path and
//! its (optionally content-hashed) output path, projects the content into a
//! nested [`TreeNode`], and rewrites references inside entry documents so that
//! hash-renamed outputs stay linked.
//!
//! ## Quick Start
//!
//! ```
//! use devtree_store::{Artifact, Namehash, Replacer, Store};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let namehash = Namehash::builder()
//!     .entry(r"\.css$")
//!     .search_value(r"url\(([^)]*)\)")
//!     .replacer(Replacer::template("/[dir][name].[hash:8][ext]"))
//!     .build()?;
//! let store = Store::default().with_namehash(namehash);
//!
//! store.save(Artifact::new("a.css", "a { background: url(b.png) }"));
//! let png = store.save(Artifact::new("b.png", vec![0x89, 0x50, 0x4e, 0x47]));
//!
//! let css = store.load("a.css").await?.expect("a.css was saved");
//! assert_eq!(
//!     css.as_text(),
//!     Some(format!("a {{ background: url({}) }}", png.output_path()).as_str())
//! );
//! # Ok(()) }
//! ```
//!
//! Content is produced on demand by an injected [`Producer`]; the default
//! [`TreeProducer`] only serves what has already been saved.

pub mod artifact;
pub mod content;
pub mod error;
pub mod namehash;
pub mod path;
pub mod producer;
pub mod store;
pub mod tree;

pub use artifact::Artifact;
pub use content::Content;
pub use error::{Result, StoreError};
pub use namehash::{DIGEST_LEN, DigestAlgorithm, Namehash, NamehashBuilder, Replacer, ReplacerFn};
pub use producer::{ProduceResult, Producer, TreeProducer};
pub use store::Store;
pub use tree::TreeNode;
