//! Page parsing and next/prev link calculation
//!
//! ```rust
//! use trusty_cms::query::{paginate, PageSpec};
//!
//! let page = PageSpec::parse(Some("2"), Some("5"), 10);
//! let (skip, links) = paginate(12, &page);
//! assert_eq!(skip, 5);
//! assert_eq!(links.next.unwrap().page, 3);
//! assert_eq!(links.prev.unwrap().page, 1);
//! ```

use serde::{Deserialize, Serialize};

/// Requested page, both numbers at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    /// 1-based page number
    pub page: u64,
    /// Page size
    pub limit: u64,
}

impl PageSpec {
    /// Page spec with both values clamped to at least 1
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Lenient parse of the `page` and `limit` parameters
    ///
    /// Leading digits are used (`"3abc"` is 3). Absent, non-numeric and zero
    /// values fall back to the defaults; negative values clamp to 1. Parse
    /// failures never error.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: u64) -> Self {
        Self::new(
            lenient_int(page).unwrap_or(1),
            lenient_int(limit).unwrap_or(default_limit),
        )
    }

    /// Documents before this page
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// `Some(n)` for a usable positive number, `Some(1)` for negatives, `None` otherwise
fn lenient_int(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim_start();
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return None;
    }
    // overlong numbers saturate rather than fall back
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    match (negative, value) {
        (_, 0) => None,
        (true, _) => Some(1),
        (false, value) => Some(value),
    }
}

/// Link to a neighbouring page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    /// Page number
    pub page: u64,
    /// Page size
    pub limit: u64,
}

/// Neighbouring pages; serializes as `{}` when neither exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    /// Following page, when documents remain after this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    /// Preceding page, when this is not the first page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

/// Skip offset and neighbouring pages for `total` matching documents
pub fn paginate(total: u64, page: &PageSpec) -> (u64, PaginationResult) {
    let skip = page.skip();
    let end = page.page.saturating_mul(page.limit);

    let next = (end < total).then(|| PageLink {
        page: page.page + 1,
        limit: page.limit,
    });
    let prev = (skip > 0).then(|| PageLink {
        page: page.page - 1,
        limit: page.limit,
    });

    (skip, PaginationResult { next, prev })
}
