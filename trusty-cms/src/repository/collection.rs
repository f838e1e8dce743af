//! Typed access to one collection
//!
//! [`Collection`] turns the untyped [`DocumentStore`] into a store of one
//! [`Resource`] type, converting between structs and documents and raising
//! `NotFound` errors that name the resource.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::error::{RepositoryError, RepositoryOperation};
use super::filter::{Document, FilterDescriptor};
use super::options::{FindOptions, SortSpec};
use super::traits::{DocumentStore, RepositoryResult};

/// A document type stored in its own collection
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name in the store
    const COLLECTION: &'static str;
    /// Human name used in messages ("blog post")
    const LABEL: &'static str;
    /// TypeID prefix of generated ids
    const ID_PREFIX: &'static str;

    /// The document id
    fn id(&self) -> &str;
}

/// Typed handle over a [`DocumentStore`] collection
pub struct Collection<R> {
    store: Arc<dyn DocumentStore>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> Collection<R> {
    /// Wraps a store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _resource: PhantomData,
        }
    }

    /// Document by id, if present
    pub async fn get(&self, id: &str) -> RepositoryResult<Option<R>> {
        self.store
            .find_by_id(R::COLLECTION, id)
            .await?
            .map(|doc| decode::<R>(doc, RepositoryOperation::FindById))
            .transpose()
    }

    /// Document by id, or a `NotFound` error naming the resource
    pub async fn require(&self, id: &str) -> RepositoryResult<R> {
        self.get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(R::LABEL, id))
    }

    /// Raw document by id, or `NotFound`
    pub async fn require_document(&self, id: &str) -> RepositoryResult<Document> {
        self.store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(R::LABEL, id))
    }

    /// Every document matching `filter`
    pub async fn find(&self, filter: &FilterDescriptor, sort: SortSpec) -> RepositoryResult<Vec<R>> {
        let options = FindOptions::new().with_sort(sort);
        self.store
            .find(R::COLLECTION, filter, &options)
            .await?
            .into_iter()
            .map(|doc| decode::<R>(doc, RepositoryOperation::Find))
            .collect()
    }

    /// Every document in the collection
    pub async fn all(&self, sort: SortSpec) -> RepositoryResult<Vec<R>> {
        self.find(&FilterDescriptor::new(), sort).await
    }

    /// Stores a new entity
    pub async fn insert(&self, entity: &R) -> RepositoryResult<R> {
        let stored = self
            .store
            .insert(R::COLLECTION, encode(entity, RepositoryOperation::Insert)?)
            .await?;
        decode(stored, RepositoryOperation::Insert)
    }

    /// Overwrites an existing entity
    pub async fn save(&self, entity: &R) -> RepositoryResult<R> {
        let stored = self
            .store
            .replace(
                R::COLLECTION,
                entity.id(),
                encode(entity, RepositoryOperation::Replace)?,
            )
            .await?
            .ok_or_else(|| {
                RepositoryError::not_found(R::LABEL, entity.id())
                    .with_operation(RepositoryOperation::Replace)
            })?;
        decode(stored, RepositoryOperation::Replace)
    }

    /// Deletes by id, or `NotFound`
    pub async fn remove(&self, id: &str) -> RepositoryResult<()> {
        self.store
            .delete(R::COLLECTION, id)
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                RepositoryError::not_found(R::LABEL, id).with_operation(RepositoryOperation::Delete)
            })
    }
}

/// Struct to document
pub fn encode<R: Serialize>(entity: &R, operation: RepositoryOperation) -> RepositoryResult<Document> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RepositoryError::serialization_error(
            operation,
            "entity did not serialize to an object",
        )),
        Err(e) => Err(RepositoryError::serialization_error(operation, e.to_string())),
    }
}

/// Document to struct
pub fn decode<R: DeserializeOwned>(document: Document, operation: RepositoryOperation) -> RepositoryResult<R> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| RepositoryError::serialization_error(operation, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryStore, RepositoryErrorKind};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        text: String,
    }

    impl Resource for Note {
        const COLLECTION: &'static str = "notes";
        const LABEL: &'static str = "note";
        const ID_PREFIX: &'static str = "note";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn notes() -> Collection<Note> {
        Collection::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_roundtrip_and_save() {
        let notes = notes();
        let mut note = Note { id: "note_1".into(), text: "first".into() };
        notes.insert(&note).await.unwrap();

        note.text = "edited".into();
        notes.save(&note).await.unwrap();
        assert_eq!(notes.require("note_1").await.unwrap(), note);
        assert_eq!(notes.all(SortSpec::default()).await.unwrap(), vec![note]);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let notes = notes();
        let err = notes.require("note_x").await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.message, "No note found with id note_x");

        let err = notes.remove("note_x").await.unwrap_err();
        assert_eq!(err.operation, RepositoryOperation::Delete);

        let ghost = Note { id: "note_y".into(), text: String::new() };
        assert_eq!(notes.save(&ghost).await.unwrap_err().kind, RepositoryErrorKind::NotFound);
    }
}
