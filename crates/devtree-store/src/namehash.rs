//! Content hashing and reference rewriting.
//!
//! A [`Namehash`] does three things for the store:
//!
//! 1. **Digest** - a fixed-width (32 hex chars) digest of an artifact's raw
//!    bytes, computed before any renaming.
//! 2. **Rename** - the configured [`Replacer`] embeds that digest in the output
//!    path (`css/app.css` -> `css/app.1a2b3c4d.css`). Origins matching an
//!    `entries` pattern keep their name.
//! 3. **Rewrite** - when an entry document is loaded, every `search_value`
//!    match has its capture group 1 (a path relative to the document) resolved
//!    against the origin index and replaced by the referenced artifact's final
//!    output path.
//!
//! # Capture-group contract
//!
//! Each search pattern must expose the referenced path as capture group 1.
//! Only the byte range of that group is replaced; the rest of the match
//! (`url(`, quotes, attribute names) is left untouched. A match whose group 1
//! is absent or empty, or whose resolved path is not in the origin index, is
//! left as-is.
//!
//! # Example
//!
//! ```
//! use devtree_store::{Namehash, Replacer};
//!
//! let namehash = Namehash::builder()
//!     .entry(r"\.css$")
//!     .search_value(r"url\(([^)]*)\)")
//!     .replacer(Replacer::template("/[dir][name].[hash:8][ext]"))
//!     .build()
//!     .unwrap();
//!
//! let hash = namehash.digest(b"png bytes");
//! assert_eq!(hash.len(), 32);
//! assert!(namehash.is_entry("a.css"));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};
use crate::path;

/// Width of every digest, in hex characters.
pub const DIGEST_LEN: usize = 32;

/// Digest function used for content hashes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// BLAKE3, truncated to 128 bits
    #[default]
    Blake3,
    /// SHA-256, truncated to 128 bits
    Sha256,
}

impl DigestAlgorithm {
    /// Hex digest of `bytes`, exactly [`DIGEST_LEN`] characters wide.
    pub fn digest(&self, bytes: &[u8]) -> String {
        let mut hex = match self {
            DigestAlgorithm::Blake3 => blake3::hash(bytes).to_hex().to_string(),
            DigestAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        };
        hex.truncate(DIGEST_LEN);
        hex
    }
}

/// Signature of a custom replacer: `(output_path, hash) -> new output path`.
///
/// Returning `None` (or an empty string) keeps the original output path.
pub type ReplacerFn = dyn Fn(&str, &str) -> Option<String> + Send + Sync;

static TEMPLATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(dir|name|ext|hash)(?::(\d+))?\]").expect("template token pattern is valid")
});

/// Derives a hash-embedding output path.
#[derive(Clone)]
pub enum Replacer {
    /// Pattern with `[dir]`, `[name]`, `[ext]`, `[hash]` and `[hash:N]` tokens.
    ///
    /// `[dir]` includes its trailing `/` and `[ext]` its leading `.`, so
    /// `"/[dir][name].[hash:8][ext]"` turns `css/app.css` into `/css/app.1a2b3c4d.css`.
    /// Without the leading `/` the result is relative to whichever document
    /// references it.
    Template(String),
    /// Arbitrary function
    Custom(Arc<ReplacerFn>),
}

impl Replacer {
    pub fn template(template: impl Into<String>) -> Self {
        Replacer::Template(template.into())
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    {
        Replacer::Custom(Arc::new(f))
    }

    /// Apply to a key-form `output_path`. `None` means "keep the original".
    pub fn apply(&self, output_path: &str, hash: &str) -> Option<String> {
        let renamed = match self {
            Replacer::Template(template) => render_template(template, output_path, hash),
            Replacer::Custom(f) => f(output_path, hash)?,
        };
        (!renamed.is_empty()).then_some(renamed)
    }
}

impl fmt::Debug for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacer::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Replacer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn render_template(template: &str, output_path: &str, hash: &str) -> String {
    let (dir, file) = match output_path.rfind('/') {
        Some(idx) => output_path.split_at(idx + 1),
        None => ("", output_path),
    };
    // A leading dot (".env") is part of the name, not an extension.
    let (name, ext) = match file.rfind('.') {
        Some(idx) if idx > 0 => file.split_at(idx),
        _ => (file, ""),
    };

    TEMPLATE_TOKEN
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "dir" => dir.to_string(),
            "name" => name.to_string(),
            "ext" => ext.to_string(),
            _ => {
                let width = caps
                    .get(2)
                    .and_then(|w| w.as_str().parse::<usize>().ok())
                    .unwrap_or(hash.len());
                hash.chars().take(width).collect()
            }
        })
        .into_owned()
}

/// Compiled namehash configuration.
#[derive(Debug, Clone, Default)]
pub struct Namehash {
    entries: Vec<Regex>,
    search_values: Vec<Regex>,
    replacer: Option<Replacer>,
    algorithm: DigestAlgorithm,
}

impl Namehash {
    pub fn builder() -> NamehashBuilder {
        NamehashBuilder::default()
    }

    /// Whether `origin_path` matches any `entries` pattern.
    pub fn is_entry(&self, origin_path: &str) -> bool {
        self.entries.iter().any(|re| re.is_match(origin_path))
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn replacer(&self) -> Option<&Replacer> {
        self.replacer.as_ref()
    }

    pub fn digest(&self, bytes: &[u8]) -> String {
        self.algorithm.digest(bytes)
    }

    /// Reference rewriting needs a replacer; without one nothing is ever renamed.
    pub fn rewrites_references(&self) -> bool {
        self.replacer.is_some()
    }

    /// Hash-renamed output path for `origin_path`, or `None` when the origin is
    /// an entry, no replacer is configured, or the replacer declined.
    pub fn rename(&self, origin_path: &str, output_path: &str, hash: &str) -> Option<String> {
        if self.is_entry(origin_path) {
            return None;
        }
        self.replacer.as_ref()?.apply(output_path, hash)
    }

    /// Rewrite references inside `text`.
    ///
    /// `base_dir` is the key-form directory of the document being served;
    /// `lookup` maps a key-form origin path to the final output path of the
    /// artifact saved under it. Patterns run in declared order, each on the
    /// result of the previous one.
    pub fn rewrite<'a, F>(&self, text: &'a str, base_dir: &str, lookup: F) -> Cow<'a, str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut current = Cow::Borrowed(text);
        for re in &self.search_values {
            let replaced = re.replace_all(&current, |caps: &Captures| {
                rewrite_match(caps, base_dir, &lookup)
            });
            if let Cow::Owned(replaced) = replaced {
                current = Cow::Owned(replaced);
            }
        }
        current
    }
}

fn rewrite_match<F>(caps: &Captures, base_dir: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let Some(matched) = caps.get(0) else {
        return String::new();
    };
    let reference = match caps.get(1) {
        Some(group) if !group.as_str().is_empty() => group,
        _ => return matched.as_str().to_string(),
    };

    let target = path::resolve(base_dir, reference.as_str());
    let Some(output_path) = lookup(&target) else {
        return matched.as_str().to_string();
    };
    tracing::trace!(reference = reference.as_str(), %output_path, "rewrote reference");

    let text = matched.as_str();
    let from = reference.start() - matched.start();
    let to = reference.end() - matched.start();
    format!("{}{}{}", &text[..from], output_path, &text[to..])
}

/// Builder for [`Namehash`]; patterns are compiled in [`NamehashBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct NamehashBuilder {
    entries: Vec<String>,
    search_values: Vec<String>,
    replacer: Option<Replacer>,
    algorithm: DigestAlgorithm,
}

impl NamehashBuilder {
    /// Add an origin pattern exempt from renaming (and eligible for rewriting).
    pub fn entry(mut self, pattern: impl Into<String>) -> Self {
        self.entries.push(pattern.into());
        self
    }

    pub fn entries<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add a reference pattern; capture group 1 is the referenced path.
    pub fn search_value(mut self, pattern: impl Into<String>) -> Self {
        self.search_values.push(pattern.into());
        self
    }

    pub fn search_values<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_values
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn replacer(mut self, replacer: Replacer) -> Self {
        self.replacer = Some(replacer);
        self
    }

    pub fn algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Compile every pattern.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPattern`] for the first pattern that is not
    /// a valid regular expression.
    pub fn build(self) -> Result<Namehash> {
        Ok(Namehash {
            entries: compile_all(&self.entries)?,
            search_values: compile_all(&self.search_values)?,
            replacer: self.replacer,
            algorithm: self.algorithm,
        })
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| StoreError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn css_namehash() -> Namehash {
        Namehash::builder()
            .entry(r"\.css$")
            .search_value(r"url\(([^)]*)\)")
            .replacer(Replacer::template("[dir][name].[hash:8][ext]"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_digest_width() {
        assert_eq!(DigestAlgorithm::Blake3.digest(b"x").len(), DIGEST_LEN);
        assert_eq!(DigestAlgorithm::Sha256.digest(b"x").len(), DIGEST_LEN);
    }

    #[test]
    fn test_sha256_known_vector() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(
            DigestAlgorithm::Sha256.digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223"
        );
    }

    #[test]
    fn test_template_replacer() {
        let replacer = Replacer::template("[dir][name].[hash:8][ext]");
        assert_eq!(
            replacer.apply("css/b.png", "a1b2c3d4e5f6").as_deref(),
            Some("css/b.a1b2c3d4.png")
        );
        assert_eq!(
            replacer.apply("LICENSE", "a1b2c3d4e5f6").as_deref(),
            Some("LICENSE.a1b2c3d4")
        );
        assert_eq!(
            replacer.apply(".env", "a1b2c3d4").as_deref(),
            Some(".env.a1b2c3d4")
        );
    }

    #[test]
    fn test_template_full_hash_and_unknown_tokens() {
        let replacer = Replacer::template("[name]-[hash][ext]?[query]");
        assert_eq!(
            replacer.apply("a.js", "abcd").as_deref(),
            Some("a-abcd.js?[query]")
        );
    }

    #[test]
    fn test_custom_replacer_declines() {
        let replacer = Replacer::custom(|_, _| None);
        assert!(replacer.apply("a.js", "abcd").is_none());

        let empty = Replacer::custom(|_, _| Some(String::new()));
        assert!(empty.apply("a.js", "abcd").is_none());
    }

    #[test]
    fn test_rename_skips_entries() {
        let namehash = css_namehash();
        assert!(namehash.rename("a.css", "a.css", "abcdef0123").is_none());
        assert_eq!(
            namehash.rename("b.png", "b.png", "abcdef0123").as_deref(),
            Some("b.abcdef01.png")
        );
    }

    #[test]
    fn test_rewrite_replaces_only_group() {
        let namehash = css_namehash();
        let out = namehash.rewrite("a{background:url(b.png)}", "", |p| {
            (p == "b.png").then(|| "b.abcdef01.png".to_string())
        });
        assert_eq!(out, "a{background:url(b.abcdef01.png)}");
    }

    #[test]
    fn test_rewrite_resolves_against_base_dir() {
        let namehash = css_namehash();
        let out = namehash.rewrite("url(../img/b.png)", "css", |p| {
            (p == "img/b.png").then(|| "/img/b.1.png".to_string())
        });
        assert_eq!(out, "url(/img/b.1.png)");
    }

    #[test]
    fn test_rewrite_leaves_unresolved() {
        let namehash = css_namehash();
        let out = namehash.rewrite("url(https://cdn.example/x.png) url()", "", |_| None);
        assert_eq!(out, "url(https://cdn.example/x.png) url()");
    }

    #[test]
    fn test_rewrite_patterns_apply_in_order() {
        let namehash = Namehash::builder()
            .search_value(r#"src="([^"]*)""#)
            .search_value(r#"href="([^"]*)""#)
            .replacer(Replacer::template("[name].[hash:4][ext]"))
            .build()
            .unwrap();
        let out = namehash.rewrite(r#"<script src="a.js"></script><link href="a.css">"#, "", |p| {
            match p {
                "a.js" => Some("a.1111.js".to_string()),
                "a.css" => Some("a.2222.css".to_string()),
                _ => None,
            }
        });
        assert_eq!(
            out,
            r#"<script src="a.1111.js"></script><link href="a.2222.css">"#
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Namehash::builder().entry("(").build().unwrap_err();
        assert!(matches!(err, StoreError::InvalidPattern { ref pattern, .. } if pattern == "("));
    }

    #[test]
    fn test_entries_first_match_is_boolean() {
        let namehash = Namehash::builder()
            .entries([r"index\.html$", r"\.html$"])
            .build()
            .unwrap();
        assert!(namehash.is_entry("index.html"));
        assert!(namehash.is_entry("about.html"));
        assert!(!namehash.is_entry("app.js"));
    }
}
