//! Serializable namehash settings.

use devtree_store::{DigestAlgorithm, Namehash, Replacer};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Cache-busting settings.
///
/// `search_value` patterns must capture the referenced path in group 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamehashConfig {
    /// Origin patterns that keep their name and get their references rewritten
    #[serde(default = "default_entries")]
    pub entries: Vec<String>,

    /// Reference patterns searched inside entry documents
    #[serde(default = "default_search_value")]
    pub search_value: Vec<String>,

    /// Output path template, see [`Replacer::Template`]. The default is
    /// root-absolute so rewritten references resolve the same from any
    /// document depth.
    #[serde(default = "default_replacer")]
    pub replacer: String,

    #[serde(default)]
    pub algorithm: DigestAlgorithm,
}

impl Default for NamehashConfig {
    fn default() -> Self {
        Self {
            entries: default_entries(),
            search_value: default_search_value(),
            replacer: default_replacer(),
            algorithm: DigestAlgorithm::default(),
        }
    }
}

impl NamehashConfig {
    /// Compile into the store's runtime form.
    ///
    /// An empty `replacer` disables renaming (and therefore rewriting) while
    /// keeping content digests.
    pub fn build(&self) -> Result<Namehash> {
        let mut builder = Namehash::builder()
            .entries(self.entries.iter().cloned())
            .search_values(self.search_value.iter().cloned())
            .algorithm(self.algorithm);
        if !self.replacer.is_empty() {
            builder = builder.replacer(Replacer::template(self.replacer.clone()));
        }
        Ok(builder.build()?)
    }
}

fn default_entries() -> Vec<String> {
    vec![r"index\.html?$".to_string()]
}

fn default_search_value() -> Vec<String> {
    vec![
        r#"\s(?:src|href)="([^"]*?)""#.to_string(),
        r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#.to_string(),
    ]
}

fn default_replacer() -> String {
    "/[dir][name].[hash:8][ext]".to_string()
}
