//! Store and relation-loading traits
//!
//! Both traits are object-safe so that [`AppState`](crate::state::AppState)
//! can hold them as `Arc<dyn …>` and tests can inject fakes.

use async_trait::async_trait;

use super::error::RepositoryError;
use super::filter::{Document, FilterDescriptor};
use super::options::FindOptions;

/// Result type for store operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Collection-oriented document store
///
/// Documents are JSON objects carrying a string `id` field. Collections are
/// created on first insert.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents matching `filter`, sorted, windowed then projected
    async fn find(
        &self,
        collection: &str,
        filter: &FilterDescriptor,
        options: &FindOptions,
    ) -> RepositoryResult<Vec<Document>>;

    /// Number of documents matching `filter`
    async fn count(&self, collection: &str, filter: &FilterDescriptor) -> RepositoryResult<u64>;

    /// Single document by id
    async fn find_by_id(&self, collection: &str, id: &str) -> RepositoryResult<Option<Document>>;

    /// Insert a new document
    ///
    /// Fails with `AlreadyExists` when the id or a unique field collides.
    async fn insert(&self, collection: &str, document: Document) -> RepositoryResult<Document>;

    /// Replace the document with the given id, returning the stored version
    ///
    /// Returns `Ok(None)` when no such document exists.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> RepositoryResult<Option<Document>>;

    /// Remove a document, returning it if it existed
    async fn delete(&self, collection: &str, id: &str) -> RepositoryResult<Option<Document>>;

    /// Liveness check used by the readiness endpoint
    async fn ping(&self) -> RepositoryResult<()>;
}

/// Resolves reference fields into richer related data
///
/// Expansion is optional enrichment: callers fall back to the unexpanded
/// documents when it fails.
#[async_trait]
pub trait RelationLoader: Send + Sync {
    /// Name of the expanded relation, for logs
    fn relation(&self) -> &str;

    /// Returns the documents with the relation expanded
    async fn expand(&self, documents: &[Document]) -> RepositoryResult<Vec<Document>>;
}
