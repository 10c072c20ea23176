//! Logical path handling shared by every store lookup.
//!
//! Paths inside the store are logical, not filesystem paths: a request path
//! such as `./css/app.css?v=3#top` and a producer-supplied `css\app.css` must
//! land on the same key. Everything here is allocation-light string work; no
//! function touches the filesystem and none of them fail. A path with no
//! filename segments simply normalizes to the empty string (the tree root).

use path_clean::PathClean;
use std::path::Path;

/// Characters that terminate the path portion of a request (query / fragment).
const QUERY_DELIMITERS: [char; 2] = ['?', '#'];

/// Characters that start a version-like suffix on a hash-renamed output path.
const SUFFIX_DELIMITERS: [char; 5] = ['!', '#', '*', '?', '='];

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\' || c == ',' || c.is_whitespace()
}

/// Remove one leading run of dots followed by a slash (`./`, `../`, `.../`).
fn strip_dot_prefix(path: &str) -> &str {
    let dots = path.len() - path.trim_start_matches('.').len();
    if dots > 0 && path[dots..].starts_with('/') {
        &path[dots + 1..]
    } else {
        path
    }
}

/// Split a path into its filename segments.
///
/// The query string and fragment are dropped, a single leading `./` (or any
/// `.../`) is removed, and the remainder is split on `/`, `\`, `,` and
/// whitespace. Empty segments never appear in the result.
///
/// ```
/// use devtree_store::path::segments;
///
/// assert_eq!(segments("./css//app.css?v=1"), vec!["css", "app.css"]);
/// assert!(segments("?only=query").is_empty());
/// ```
pub fn segments(path: &str) -> Vec<&str> {
    let path = path.split(QUERY_DELIMITERS).next().unwrap_or_default();
    strip_dot_prefix(path)
        .split(is_separator)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Normalize a path to the store's key form: segments joined by `/`, no
/// leading slash, no query or fragment.
pub fn normalize(path: &str) -> String {
    segments(path).join("/")
}

/// Directory portion of a path, in key form.
///
/// Unlike [`normalize`], the query is not stripped first, which keeps this
/// usable on already-normalized keys without a second pass.
pub fn dirname(path: &str) -> String {
    let parts: Vec<&str> = path.split(is_separator).filter(|s| !s.is_empty()).collect();
    match parts.split_last() {
        Some((_, dir)) => dir.join("/"),
        None => String::new(),
    }
}

/// Cut a hash-renamed output path at its first version-like suffix.
///
/// A replacer may return `app.1a2b3c4d.js?v=2`; the output index is keyed by
/// the part before any of `! # * ? =`.
pub fn strip_suffix(path: &str) -> &str {
    path.split(SUFFIX_DELIMITERS).next().unwrap_or_default()
}

/// Resolve `reference` relative to the directory `base_dir` and normalize
/// the result to key form.
///
/// `.` and `..` components are folded; a leading `/` on the reference does not
/// escape the base directory, matching how relative references in an entry
/// document are looked up.
///
/// ```
/// use devtree_store::path::resolve;
///
/// assert_eq!(resolve("css", "../img/logo.png"), "img/logo.png");
/// assert_eq!(resolve("", "./app.js"), "app.js");
/// ```
pub fn resolve(base_dir: &str, reference: &str) -> String {
    let reference = reference.split(QUERY_DELIMITERS).next().unwrap_or_default();
    let joined = if base_dir.is_empty() {
        reference.to_string()
    } else {
        format!("{}/{}", base_dir, reference)
    };
    let cleaned = Path::new(&joined).clean();
    normalize(&cleaned.to_string_lossy())
}

/// Key form with a single leading `/`, as exposed to consumers.
pub fn absolute(path: &str) -> String {
    format!("/{}", normalize(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_strip_query_and_fragment() {
        assert_eq!(segments("a/b.js?x=1#frag"), vec!["a", "b.js"]);
        assert_eq!(segments("a/b.js#frag?x"), vec!["a", "b.js"]);
    }

    #[test]
    fn test_segments_dot_prefix_removed_once() {
        assert_eq!(segments("./a.js"), vec!["a.js"]);
        assert_eq!(segments("../a.js"), vec!["a.js"]);
        assert_eq!(segments("./../a.js"), vec!["..", "a.js"]);
        assert_eq!(segments(".hidden/a.js"), vec![".hidden", "a.js"]);
    }

    #[test]
    fn test_segments_separator_class() {
        assert_eq!(segments("/a\\b,c d\te\nf"), vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_malformed_paths_are_root() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
        assert_eq!(normalize("  , \\ "), "");
        assert_eq!(normalize("#only"), "");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("css/app.css"), "css");
        assert_eq!(dirname("/a/b/c.js"), "a/b");
        assert_eq!(dirname("index.html"), "");
        assert_eq!(dirname(""), "");
    }

    #[test]
    fn test_strip_suffix() {
        assert_eq!(strip_suffix("app.1a2b.js?v=2"), "app.1a2b.js");
        assert_eq!(strip_suffix("app.js!raw"), "app.js");
        assert_eq!(strip_suffix("app.js"), "app.js");
    }

    #[test]
    fn test_resolve_parent_and_current() {
        assert_eq!(resolve("a/b", "../c.png"), "a/c.png");
        assert_eq!(resolve("a", "./c.png"), "a/c.png");
        assert_eq!(resolve("a", "/c.png"), "a/c.png");
        assert_eq!(resolve("", "c.png?v=1"), "c.png");
    }

    #[test]
    fn test_resolve_above_root_folds_one_level() {
        assert_eq!(resolve("a", "../../x.png"), "x.png");
    }

    #[test]
    fn test_absolute() {
        assert_eq!(absolute("a//b.js"), "/a/b.js");
        assert_eq!(absolute(""), "/");
    }
}
