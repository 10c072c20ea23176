//! Layered configuration loading.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};

use crate::config::DevtreeConfig;
use crate::error::{ConfigError, Result};

/// Conventional config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "devtree.toml";

/// Prefix of environment overrides (`DEVTREE_DEST`, `DEVTREE_WATCH__ENABLED`, ...).
pub const ENV_PREFIX: &str = "DEVTREE_";

impl DevtreeConfig {
    /// Load configuration from multiple sources.
    /// Priority: environment variables > config file > defaults
    ///
    /// `config_path` must exist when given; otherwise `devtree.toml` in `root`
    /// is used if present. `root` becomes the default project root.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let defaults = DevtreeConfig {
            root: root.to_path_buf(),
            ..DevtreeConfig::default()
        };
        let mut figment = Figment::new().merge(Serialized::defaults(defaults));

        if let Some(path) = Self::config_file(root, config_path)? {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::Extract(Box::new(e)))
    }

    fn config_file(root: &Path, config_path: Option<&Path>) -> Result<Option<PathBuf>> {
        match config_path {
            Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
            Some(path) => Err(ConfigError::NotFound(path.to_path_buf())),
            None => {
                let default_path = root.join(CONFIG_FILE);
                Ok(default_path.exists().then_some(default_path))
            }
        }
    }
}
