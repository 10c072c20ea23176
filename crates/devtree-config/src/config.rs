//! Top-level configuration structure.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::namehash::NamehashConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevtreeConfig {
    /// Project root; producers resolve logical paths against it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Build output directory
    #[serde(default = "default_dest")]
    pub dest: PathBuf,

    /// Cache-busting; disabled when absent
    #[serde(default)]
    pub namehash: Option<NamehashConfig>,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    /// File suffix -> MIME type overrides
    #[serde(default)]
    pub mime_types: BTreeMap<String, String>,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for DevtreeConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            dest: default_dest(),
            namehash: None,
            build: BuildConfig::default(),
            watch: WatchConfig::default(),
            mime_types: BTreeMap::new(),
            log_level: None,
        }
    }
}

impl DevtreeConfig {
    /// Create from serde_json::Value (for programmatic config)
    ///
    /// # Example
    ///
    /// ```
    /// use devtree_config::DevtreeConfig;
    /// use serde_json::json;
    ///
    /// let config = DevtreeConfig::from_value(json!({
    ///     "dest": "dist",
    ///     "namehash": {}
    /// }))
    /// .unwrap();
    ///
    /// assert_eq!(config.dest, std::path::PathBuf::from("dist"));
    /// assert!(config.namehash.is_some());
    /// ```
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            value: e.to_string(),
            hint: "Check field names and types".to_string(),
        })
    }

    /// Destination directory resolved against the root when relative.
    pub fn dest_dir(&self) -> PathBuf {
        if self.dest.is_absolute() {
            self.dest.clone()
        } else {
            self.root.join(&self.dest)
        }
    }
}

/// Build-mode settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Filename patterns to build; empty means everything
    #[serde(default)]
    pub include: Vec<String>,

    /// Filename patterns to skip
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Write `manifest.json` (origin -> output) next to the build output
    #[serde(default = "default_true")]
    pub manifest: bool,

    /// Replace files already present in the destination
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            manifest: true,
            overwrite: true,
        }
    }
}

/// File watching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Directory prefixes or `*.ext` patterns the watcher drops
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: default_debounce_ms(),
            ignore: default_ignore(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_dest() -> PathBuf {
    PathBuf::from("output")
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        "output".to_string(),
        "*.log".to_string(),
    ]
}
