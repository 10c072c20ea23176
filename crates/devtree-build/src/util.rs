//! Content-type and request helpers shared by producers and servers.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;

const DEFAULT_MIME: &str = "application/octet-stream";

static TEXT_MIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(html?|txt|javascript|json|css|xml|svg)\b").expect("valid text mime regex")
});

/// Guess the MIME type from the file suffix.
///
/// `overrides` is keyed by suffix without the dot and wins over the built-in
/// table. A path without a dot is treated as a bare suffix (`"json"` is JSON).
pub fn mime_type<'a>(path: &str, overrides: &'a BTreeMap<String, String>) -> &'a str {
    let suffix = path.rsplit('.').next().unwrap_or_default();
    if let Some(mime) = overrides.get(suffix) {
        return mime.as_str();
    }
    builtin_mime(&suffix.to_ascii_lowercase()).unwrap_or(DEFAULT_MIME)
}

fn builtin_mime(suffix: &str) -> Option<&'static str> {
    let mime = match suffix {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" | "cjs" => "application/javascript",
        "json" | "map" => "application/json",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Whether content at `path` should be handled as text.
pub fn is_text(path: &str, overrides: &BTreeMap<String, String>) -> bool {
    TEXT_MIME.is_match(mime_type(path, overrides))
}

/// Percent-decode a URL component. Invalid UTF-8 returns the input unchanged.
pub fn decode(input: &str) -> String {
    match percent_decode_str(input).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(err) => {
            tracing::warn!(input, error = %err, "could not percent-decode");
            input.to_string()
        }
    }
}

/// Parse a query string into key -> values, keeping first-seen key order.
///
/// A leading `?` is ignored.
pub fn query_params(search: &str) -> IndexMap<String, Vec<String>> {
    let search = search.strip_prefix('?').unwrap_or(search);
    let mut params: IndexMap<String, Vec<String>> = IndexMap::new();
    for (key, value) in url::form_urlencoded::parse(search.as_bytes()) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// Loose filename matching used by include/exclude lists.
///
/// `.` is literal, `*` matches any run and `,` separates alternatives. The
/// pattern is unanchored, so `"*.js"` matches anywhere in the string. A
/// pattern that does not compile never matches.
pub fn minimatch(input: &str, pattern: &str) -> bool {
    let source = pattern
        .replace('.', r"\.")
        .replace('*', ".*")
        .replace(',', "|");
    match Regex::new(&source) {
        Ok(re) => re.is_match(input),
        Err(err) => {
            tracing::debug!(pattern, error = %err, "ignoring invalid match pattern");
            false
        }
    }
}
