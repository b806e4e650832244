//! Uniform paginated response envelope.

use serde::{Deserialize, Serialize};

use super::token::{self, LastKey, PageToken};
use super::{PaginationError, Result};

/// Default page size when the client does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Upper bound on page size.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Raw page as returned by a backend query or scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQueryOutput<I> {
    pub items: Option<Vec<I>>,
    pub last_evaluated_key: Option<LastKey>,
    pub count: Option<i64>,
    pub scanned_count: Option<i64>,
    pub consumed_capacity: Option<f64>,
}

impl<I> Default for RawQueryOutput<I> {
    fn default() -> Self {
        Self {
            items: None,
            last_evaluated_key: None,
            count: None,
            scanned_count: None,
            consumed_capacity: None,
        }
    }
}

impl<I> RawQueryOutput<I> {
    /// Page holding `items`, with no continuation.
    pub fn from_items(items: Vec<I>) -> Self {
        Self {
            items: Some(items),
            ..Self::default()
        }
    }

    pub fn with_last_key(mut self, last_key: LastKey) -> Self {
        self.last_evaluated_key = Some(last_key);
        self
    }
}

/// Count metadata copied from the raw page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_units: Option<f64>,
}

/// Paginated response. `next_token` is `None` exactly when no pages remain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedEnvelope<T> {
    pub items: Vec<T>,
    pub next_token: Option<PageToken>,
    pub metadata: PageMetadata,
}

/// Map a raw page into an envelope, preserving backend order.
pub fn map_paginated_result<I, T, F>(
    raw: RawQueryOutput<I>,
    mut mapper: F,
) -> Result<PaginatedEnvelope<T>>
where
    F: FnMut(I) -> T,
{
    try_map_paginated_result(raw, |item| Ok::<_, PaginationError>(mapper(item)))
}

/// Like [`map_paginated_result`], for mappers that can fail.
///
/// The first mapper error is returned as-is.
pub fn try_map_paginated_result<I, T, E, F>(
    raw: RawQueryOutput<I>,
    mapper: F,
) -> std::result::Result<PaginatedEnvelope<T>, E>
where
    F: FnMut(I) -> std::result::Result<T, E>,
    E: From<PaginationError>,
{
    let items = raw
        .items
        .unwrap_or_default()
        .into_iter()
        .map(mapper)
        .collect::<std::result::Result<Vec<T>, E>>()?;

    let next_token = raw
        .last_evaluated_key
        .as_ref()
        .map(token::encode)
        .transpose()?;

    let metadata = PageMetadata {
        count: raw.count.unwrap_or(items.len() as i64),
        scanned_count: raw.scanned_count,
        capacity_units: raw.consumed_capacity,
    };

    Ok(PaginatedEnvelope {
        items,
        next_token,
        metadata,
    })
}

/// Page request parsed from a client query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub next_token: Option<PageToken>,
}

impl PageRequest {
    /// Normalize client input: a missing or zero limit becomes
    /// [`DEFAULT_PAGE_LIMIT`], larger ones are capped at [`MAX_PAGE_LIMIT`],
    /// and a blank token means the first page.
    pub fn new(limit: Option<u32>, next_token: Option<String>) -> Self {
        let limit = match limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(n) => n.min(MAX_PAGE_LIMIT),
        };
        let next_token = next_token
            .filter(|t| !t.trim().is_empty())
            .map(PageToken::from);

        Self { limit, next_token }
    }

    /// First page of `limit` items.
    pub fn first(limit: u32) -> Self {
        Self::new(Some(limit), None)
    }

    /// Decoded start key, or `None` for the first page.
    pub fn start_key(&self) -> Result<Option<LastKey>> {
        self.next_token
            .as_ref()
            .map(|t| token::decode(t.as_str()))
            .transpose()
    }

    /// Stable fragment identifying this page, for cache keys.
    pub fn cache_fragment(&self) -> String {
        match &self.next_token {
            Some(t) => format!("{}:{}", self.limit, t),
            None => format!("{}:start", self.limit),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}
