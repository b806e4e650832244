//! Cursor pagination over key-value and document backends.
//!
//! - [`token`]: opaque continuation token codec
//! - [`envelope`]: raw page to response envelope mapping

pub mod envelope;
pub mod token;

pub use envelope::{
    map_paginated_result, try_map_paginated_result, PageMetadata, PageRequest, PaginatedEnvelope,
    RawQueryOutput, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use token::{decode, encode, KeyAttribute, LastKey, PageToken};

/// Pagination errors.
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("Failed to encode continuation key: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("Invalid page token: {0}")]
    InvalidToken(String),

    #[error("Unsupported key attribute: {0}")]
    UnsupportedAttribute(String),
}

pub type Result<T> = std::result::Result<T, PaginationError>;

#[cfg(test)]
mod tests;
