//! Artifact payloads.

use std::borrow::Cow;

/// Produced content: either text or raw bytes.
///
/// Both variants are hashable; digests are always taken over [`Content::as_bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Content {
    /// UTF-8 text (HTML, CSS, JavaScript, ...)
    Text(String),
    /// Opaque bytes (images, fonts, wasm, ...)
    Binary(Vec<u8>),
}

impl Content {
    /// Raw bytes of the payload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(s) => s.as_bytes(),
            Content::Binary(b) => b,
        }
    }

    /// Text view of the payload, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            Content::Binary(b) => std::str::from_utf8(b).ok(),
        }
    }

    /// Lossy text view, replacing invalid sequences.
    pub fn to_text_lossy(&self) -> Cow<'_, str> {
        match self {
            Content::Text(s) => Cow::Borrowed(s),
            Content::Binary(b) => String::from_utf8_lossy(b),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Content::Text(_))
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into owned bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Text(s) => s.into_bytes(),
            Content::Binary(b) => b,
        }
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Content::Binary(value)
    }
}

impl From<&[u8]> for Content {
    fn from(value: &[u8]) -> Self {
        Content::Binary(value.to_vec())
    }
}
