//! Success envelopes
//!
//! ```json
//! { "success": true, "count": 5, "pagination": { "next": { "page": 3, "limit": 5 } }, "data": [ … ] }
//! { "success": true, "data": { … } }
//! ```
//!
//! `count` is the number of documents in `data`, not the filtered total.
//!
//! ```rust
//! use trusty_cms::handlers::{ItemResponse, ListResponse};
//! use trusty_cms::query::PaginationResult;
//!
//! let list = ListResponse::paginated(vec!["a", "b"], PaginationResult::default());
//! assert_eq!(list.count, 2);
//!
//! let created = ItemResponse::created("x").with_message("Contact submitted successfully!");
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::query::PaginationResult;

/// Single document envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemResponse<T> {
    /// Always true
    pub success: bool,
    /// Confirmation shown to the submitter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The document
    pub data: T,
    #[serde(skip)]
    status: StatusCodeSlot,
}

/// Status carried alongside the body without being serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatusCodeSlot(StatusCode);

impl Default for StatusCodeSlot {
    fn default() -> Self {
        Self(StatusCode::OK)
    }
}

impl<T> ItemResponse<T> {
    /// 200 OK envelope
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            status: StatusCodeSlot(StatusCode::OK),
        }
    }

    /// 201 Created envelope
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCodeSlot(StatusCode::CREATED),
            ..Self::new(data)
        }
    }

    /// Attach a confirmation message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// HTTP status this envelope is sent with
    pub fn status(&self) -> StatusCode {
        self.status.0
    }

    /// Transform the data while keeping the envelope
    pub fn map<U, F>(self, f: F) -> ItemResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ItemResponse {
            success: self.success,
            message: self.message,
            data: f(self.data),
            status: self.status,
        }
    }
}

impl<T: Serialize> IntoResponse for ItemResponse<T> {
    fn into_response(self) -> Response {
        (self.status.0, Json(self)).into_response()
    }
}

/// List envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListResponse<T> {
    /// Always true
    pub success: bool,
    /// Documents in `data`
    pub count: usize,
    /// Neighbouring pages, present on paginated listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationResult>,
    /// The documents
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    /// Envelope for one page of a paginated listing
    pub fn paginated(data: Vec<T>, pagination: PaginationResult) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination: Some(pagination),
            data,
        }
    }

    /// Envelope for an unpaginated listing
    pub fn all(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination: None,
            data,
        }
    }

    /// Transform every item while keeping the envelope
    pub fn map<U, F>(self, f: F) -> ListResponse<U>
    where
        F: FnMut(T) -> U,
    {
        ListResponse {
            success: self.success,
            count: self.count,
            pagination: self.pagination,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `{ "success": true, "data": {} }` after a delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deleted;

impl IntoResponse for Deleted {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "success": true, "data": {} });
        (StatusCode::OK, Json(body)).into_response()
    }
}
