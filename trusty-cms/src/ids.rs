//! Type-safe identifiers using the TypeID specification
//!
//! Every stored document gets a TypeID whose prefix names its collection,
//! for example `blog_01h455vb4pex5vsknk084sn02q`. Identifiers use UUIDv7, so
//! ids generated later sort after ids generated earlier.
//!
//! Incoming requests are tagged with a [`RequestId`] (`req_…`) that is
//! propagated back in the `x-request-id` response header.
//!
//! ```rust
//! use trusty_cms::ids::{DocumentId, RequestId};
//!
//! let id = DocumentId::generate("blog");
//! assert!(id.as_str().starts_with("blog_"));
//!
//! let request_id = RequestId::new();
//! assert!(request_id.as_str().starts_with("req_"));
//! ```

use http::Request;
use mti::prelude::*;
use std::fmt;
use std::str::FromStr;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

/// Identifier of a stored document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(MagicTypeId);

impl DocumentId {
    /// Creates a new time-sortable id with the given collection prefix
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(prefix.create_type_id::<V7>())
    }

    /// Parses an id and checks that it carries the expected prefix
    pub fn parse(value: &str, expected_prefix: &str) -> Result<Self, IdError> {
        let mti = MagicTypeId::from_str(value).map_err(IdError::Parse)?;
        if mti.prefix().as_str() != expected_prefix {
            return Err(IdError::InvalidPrefix {
                expected: expected_prefix.to_string(),
                actual: mti.prefix().as_str().to_string(),
            });
        }
        Ok(Self(mti))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the prefix portion of the id.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0.to_string()
    }
}

/// A request identifier for log correlation, formatted `req_<uuidv7>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    /// The prefix used for request IDs
    pub const PREFIX: &'static str = "req";

    /// Creates a new request ID
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Returns the request ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::parse(s, Self::PREFIX).map(|id| Self(id.0))
    }
}

/// Error type for id parsing.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The value is not a valid TypeID.
    #[error("failed to parse id: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// The prefix was not the expected value.
    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        /// The expected prefix.
        expected: String,
        /// The actual prefix found.
        actual: String,
    },
}

/// Generates a [`RequestId`] for every request entering the router
///
/// Used with `tower_http::request_id::SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(id.as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}
