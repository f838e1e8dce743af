//! Document store error types
//!
//! ```rust
//! use trusty_cms::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("blog post", "blog_123");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert_eq!(error.entity_id.as_deref(), Some("blog_123"));
//! ```

use std::fmt;

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Finding a single document by id
    FindById,
    /// Finding documents matching a filter
    Find,
    /// Counting documents matching a filter
    Count,
    /// Inserting a new document
    Insert,
    /// Replacing an existing document
    Replace,
    /// Deleting a document
    Delete,
    /// Loading snapshots at start-up
    Load,
    /// Writing a collection snapshot
    Persist,
    /// Expanding references into related documents
    Expand,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::Find => write!(f, "find"),
            Self::Count => write!(f, "count"),
            Self::Insert => write!(f, "insert"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
            Self::Load => write!(f, "load"),
            Self::Persist => write!(f, "persist"),
            Self::Expand => write!(f, "expand"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Document was not found
    NotFound,
    /// A unique field already holds this value
    AlreadyExists,
    /// Document failed validation
    ValidationFailed,
    /// Store is unreachable
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Underlying store failure
    StoreError,
    /// Serialization or deserialization error
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::StoreError => write!(f, "store_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of document involved (e.g. "blog post")
    pub entity_type: Option<String>,
    /// The id or unique value involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new store error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// A document with this id does not exist
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        Self {
            operation: RepositoryOperation::FindById,
            kind: RepositoryErrorKind::NotFound,
            message: format!("No {} found with id {}", entity_type, entity_id),
            entity_type: Some(entity_type),
            entity_id: Some(entity_id),
        }
    }

    /// A unique field collides with an existing document
    ///
    /// `field` names the unique field and `value` the colliding value.
    pub fn already_exists(
        collection: impl Into<String>,
        field: &str,
        value: impl Into<String>,
    ) -> Self {
        let value = value.into();
        Self {
            operation: RepositoryOperation::Insert,
            kind: RepositoryErrorKind::AlreadyExists,
            message: format!("Duplicate value for unique field '{}'", field),
            entity_type: Some(collection.into()),
            entity_id: Some(value),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Insert,
            RepositoryErrorKind::ValidationFailed,
            message,
        )
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Find,
            RepositoryErrorKind::ConnectionFailed,
            message,
        )
    }

    /// Create a timeout error
    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    /// Create a generic store failure
    pub fn store_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::StoreError, message)
    }

    /// Create a serialization error
    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
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
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Transient errors that may succeed on retry
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_error(RepositoryOperation::Find, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_resource() {
        let error = RepositoryError::not_found("team member", "team_42");
        assert_eq!(error.message, "No team member found with id team_42");
        assert_eq!(error.kind, RepositoryErrorKind::NotFound);
        assert_eq!(error.entity_type.as_deref(), Some("team member"));
    }

    #[test]
    fn test_display_includes_entity_context() {
        let error = RepositoryError::already_exists("users", "email", "a@b.co");
        assert_eq!(
            error.to_string(),
            "Repository already_exists error during insert: Duplicate value for unique field 'email' [users: a@b.co]"
        );
    }

    #[test]
    fn test_with_operation() {
        let error = RepositoryError::connection_failed("data dir missing")
            .with_operation(RepositoryOperation::Persist);
        assert_eq!(error.operation, RepositoryOperation::Persist);
        assert!(error.is_retriable());
        assert!(!RepositoryError::not_found("blog post", "x").is_retriable());
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(RepositoryOperation::FindById.to_string(), "find_by_id");
        assert_eq!(RepositoryOperation::Expand.to_string(), "expand");
        assert_eq!(RepositoryErrorKind::StoreError.to_string(), "store_error");
    }
}
