//! Error types for the store.
//!
//! Lookups never fail: a missing path is `None`, an unresolvable reference is
//! left in place, and a malformed path is the tree root. The only fallible
//! setup step is compiling namehash patterns.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An `entries` or `search_value` pattern is not a valid regular expression
    #[error("invalid namehash pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
