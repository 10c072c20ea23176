//! # devtree-build
//!
//! Filesystem collaborators for [`devtree_store`]: a producer that reads a
//! project directory, a scanner and writer for one-shot builds, and a
//! watcher that keeps the store current and broadcasts [`BuildEvent`]s.
//!
//! ```no_run
//! use devtree_build::DevtreeBuilder;
//! use devtree_config::DevtreeConfig;
//!
//! # async fn example() -> devtree_build::Result<()> {
//! let config = DevtreeConfig::load(std::path::Path::new("."), None)?;
//! let builder = DevtreeBuilder::new(config)?;
//! let artifacts = builder.build().await?;
//! println!("built {artifacts} artifacts");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod input;
pub mod logging;
pub mod output;
pub mod producer;
pub mod util;
pub mod watcher;

pub use builder::{BuildEvent, DevtreeBuilder};
pub use error::{BuildError, Result};
pub use input::InputScanner;
pub use logging::{LogLevel, init_logging, init_logging_from_config, init_logging_with_filter};
pub use output::{MANIFEST_FILE, write_manifest, write_store_to, write_store_with};
pub use producer::FsProducer;
pub use watcher::{FileChange, FileWatcher};
