//! Configuration for devtree: the store's namehash settings plus the build
//! and watch options of the surrounding pipeline.

pub mod config;
pub mod error;
pub mod loading;
pub mod namehash;

pub use config::{BuildConfig, DevtreeConfig, WatchConfig};
pub use error::{ConfigError, Result};
pub use loading::{CONFIG_FILE, ENV_PREFIX};
pub use namehash::NamehashConfig;
