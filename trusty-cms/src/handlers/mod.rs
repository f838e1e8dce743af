//! HTTP-facing building blocks shared by every resource
//!
//! - [`Payload`] accepts JSON, URL-encoded and multipart bodies alike
//! - [`ApiError`] maps store, validation, query and media failures to status codes
//! - [`ItemResponse`], [`ListResponse`] and [`Deleted`] shape the success envelopes

pub mod error;
pub mod payload;
pub mod response;

pub use error::{ApiError, ApiErrorKind, ApiOperation, ErrorBody, ErrorDetail};
pub use payload::Payload;
pub use response::{Deleted, ItemResponse, ListResponse};
