//! API error type and the central error-to-response mapping
//!
//! Every handler returns `Result<_, ApiError>`. Store, validation, media and
//! query errors convert into `ApiError` with `?`, and `IntoResponse` renders
//! the envelope:
//!
//! ```json
//! { "success": false, "message": "No blog post found with id blog_123" }
//! ```
//!
//! Outside production the envelope also carries a `stack` field holding the
//! underlying error chain; see [`crate::middleware::error_detail`].
//!
//! ```rust
//! use trusty_cms::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("blog post", "blog_123");
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.message, "No blog post found with id blog_123");
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::media::MediaError;
use crate::query::QueryError;
use crate::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use crate::validation::{FieldError, ValidationErrors};

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing documents
    List,
    /// Getting a single document by id
    Get,
    /// Creating a document
    Create,
    /// Updating a document
    Update,
    /// Deleting a document
    Delete,
    /// Reading the request
    Request,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Request => write!(f, "request"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Document was not found
    NotFound,
    /// Unique value already taken
    AlreadyExists,
    /// Submitted document failed validation
    ValidationFailed,
    /// Invalid request format or parameters
    BadRequest,
    /// Media host or mail relay failed
    Upstream,
    /// Internal server error
    InternalError,
    /// Store temporarily unavailable
    ServiceUnavailable,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Upstream => write!(f, "upstream"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists | Self::ValidationFailed | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Upstream => StatusCode::BAD_GATEWAY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Client-facing message
    pub message: String,
    /// The type of document involved
    pub entity_type: Option<String>,
    /// The id involved
    pub entity_id: Option<String>,
    /// Per-field validation failures
    pub field_errors: Vec<FieldError>,
    /// Diagnostic detail, shown only outside production
    pub detail: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            field_errors: Vec::new(),
            detail: None,
        }
    }

    /// `No <resource> found with id <id>`
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        Self::new(
            ApiOperation::Get,
            ApiErrorKind::NotFound,
            format!("No {} found with id {}", entity_type, entity_id),
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Request, ApiErrorKind::BadRequest, message)
    }

    /// Create an already-exists error with a client-facing message
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Create, ApiErrorKind::AlreadyExists, message)
    }

    /// Create an upstream failure
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Request, ApiErrorKind::Upstream, message)
    }

    /// Create an internal error; the message is generic, the cause goes to `detail`
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ApiOperation::Request, ApiErrorKind::InternalError, "Server Error")
            .with_detail(detail)
    }

    /// Error for an arbitrary status code
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let kind = match status {
            StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
            StatusCode::BAD_GATEWAY => ApiErrorKind::Upstream,
            StatusCode::SERVICE_UNAVAILABLE => ApiErrorKind::ServiceUnavailable,
            s if s.is_client_error() => ApiErrorKind::BadRequest,
            _ => ApiErrorKind::InternalError,
        };
        Self::new(ApiOperation::Request, kind, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Attach diagnostic detail
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Whether the client may retry unchanged
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::ServiceUnavailable | ApiErrorKind::Upstream)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Response body for API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always false
    pub success: bool,
    /// Client-facing message
    pub message: String,
    /// Per-field validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    /// Diagnostic detail (non-production only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// The envelope with `stack` filled in, carried as a response extension
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub ErrorBody);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                detail = ?self.detail,
                retriable = self.is_retriable(),
                "API error: {}", self.message
            );
        } else {
            tracing::info!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                "Request rejected: {}", self.message
            );
        }

        let stack = self.detail.unwrap_or_else(|| {
            format!("{} error during {}: {}", self.kind, self.operation, self.message)
        });
        let body = ErrorBody {
            success: false,
            message: self.message,
            errors: self.field_errors,
            stack: None,
        };
        let detailed = ErrorBody {
            stack: Some(stack),
            ..body.clone()
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorDetail(detailed));
        response
    }
}

fn repository_operation_to_api_operation(op: RepositoryOperation) -> ApiOperation {
    match op {
        RepositoryOperation::FindById => ApiOperation::Get,
        RepositoryOperation::Find | RepositoryOperation::Count | RepositoryOperation::Expand => {
            ApiOperation::List
        }
        RepositoryOperation::Insert => ApiOperation::Create,
        RepositoryOperation::Replace => ApiOperation::Update,
        RepositoryOperation::Delete => ApiOperation::Delete,
        RepositoryOperation::Load | RepositoryOperation::Persist => ApiOperation::Request,
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let operation = repository_operation_to_api_operation(err.operation);
        let detail = err.to_string();

        let kind = match err.kind {
            RepositoryErrorKind::NotFound => ApiErrorKind::NotFound,
            RepositoryErrorKind::AlreadyExists => ApiErrorKind::AlreadyExists,
            RepositoryErrorKind::ValidationFailed => ApiErrorKind::ValidationFailed,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout => {
                ApiErrorKind::ServiceUnavailable
            }
            RepositoryErrorKind::StoreError
            | RepositoryErrorKind::SerializationError
            | RepositoryErrorKind::Other => ApiErrorKind::InternalError,
        };

        // internal details stay in `detail`
        let message = match kind {
            ApiErrorKind::ServiceUnavailable => "Service temporarily unavailable".to_string(),
            ApiErrorKind::InternalError => "Server Error".to_string(),
            ApiErrorKind::AlreadyExists => match (&err.entity_id, err.message.split('\'').nth(1)) {
                (Some(value), Some(field)) => format!("A document with {} '{}' already exists", field, value),
                _ => err.message.clone(),
            },
            _ => err.message.clone(),
        };

        Self {
            operation,
            kind,
            message,
            entity_type: err.entity_type,
            entity_id: err.entity_id,
            field_errors: Vec::new(),
            detail: Some(detail),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors.to_string();
        let mut error = Self::new(ApiOperation::Request, ApiErrorKind::ValidationFailed, message);
        error.field_errors = errors.errors().to_vec();
        error
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::BadRequest, err.to_string())
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::TooLarge { .. } => Self::bad_request(err.to_string()),
            other => Self::upstream("Image upload failed").with_detail(other.to_string()),
        }
    }
}
