//! In-memory document store with optional JSON snapshots
//!
//! Each collection is a vector of documents kept in insertion order behind
//! its own `tokio::sync::RwLock`. Writers to one collection queue on a
//! per-collection mutex, so a slow write never stalls other collections.
//!
//! When opened on a data directory, every write rewrites
//! `<data_dir>/<collection>.json` through a temporary file and an atomic
//! rename. The snapshot is serialized under the read lock and written with
//! no document lock held; readers keep seeing the previous state until the
//! file is on disk and the new vector is swapped in.
//!
//! ```rust,ignore
//! let store = MemoryStore::open("/var/lib/trusty-cms")
//!     .await?
//!     .with_unique("blog_posts", "slug")
//!     .with_unique("users", "email");
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::error::{RepositoryError, RepositoryOperation};
use super::filter::{Document, FilterDescriptor};
use super::options::FindOptions;
use super::traits::{DocumentStore, RepositoryResult};

#[derive(Debug, Default)]
struct Collection {
    documents: RwLock<Vec<Document>>,
    /// Held for the whole of a write, snapshot included
    writer: Mutex<()>,
}

impl Collection {
    fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
            writer: Mutex::new(()),
        }
    }
}

/// Process-local [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    unique_fields: HashMap<String, Vec<String>>,
    data_dir: Option<PathBuf>,
}

impl MemoryStore {
    /// Empty, non-persistent store
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a persistent store, loading any `*.json` snapshots in `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> RepositoryResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            RepositoryError::connection_failed(format!(
                "cannot create data directory {}: {}",
                dir.display(),
                e
            ))
            .with_operation(RepositoryOperation::Load)
        })?;

        let mut collections = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| load_error(&dir, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| load_error(&dir, e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let documents = read_snapshot(&path).await?;
            tracing::info!(
                collection = name,
                documents = documents.len(),
                "Loaded collection snapshot"
            );
            collections.insert(name.to_string(), Arc::new(Collection::with_documents(documents)));
        }

        Ok(Self {
            collections: RwLock::new(collections),
            unique_fields: HashMap::new(),
            data_dir: Some(dir),
        })
    }

    /// Declares a field whose values must be unique within a collection
    #[must_use]
    pub fn with_unique(mut self, collection: &str, field: &str) -> Self {
        self.unique_fields
            .entry(collection.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    async fn existing(&self, collection: &str) -> Option<Arc<Collection>> {
        self.collections.read().await.get(collection).cloned()
    }

    async fn collection(&self, collection: &str) -> Arc<Collection> {
        if let Some(found) = self.existing(collection).await {
            return found;
        }
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .clone()
    }

    fn check_unique(
        &self,
        collection: &str,
        documents: &[Document],
        candidate: &Document,
        candidate_id: &str,
    ) -> RepositoryResult<()> {
        let Some(fields) = self.unique_fields.get(collection) else {
            return Ok(());
        };
        for field in fields {
            let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let collides = documents
                .iter()
                .filter(|doc| document_id(doc) != Some(candidate_id))
                .any(|doc| doc.get(field) == Some(value));
            if collides {
                return Err(RepositoryError::already_exists(
                    collection,
                    field,
                    value_label(value),
                ));
            }
        }
        Ok(())
    }

    fn snapshot(&self, documents: &[Document]) -> RepositoryResult<Option<Vec<u8>>> {
        if self.data_dir.is_none() {
            return Ok(None);
        }
        serde_json::to_vec_pretty(documents).map(Some).map_err(|e| {
            RepositoryError::serialization_error(RepositoryOperation::Persist, e.to_string())
        })
    }

    /// Writes a serialized snapshot; the caller holds the collection's writer
    async fn persist(&self, collection: &str, body: Option<Vec<u8>>) -> RepositoryResult<()> {
        let (Some(dir), Some(body)) = (&self.data_dir, body) else {
            return Ok(());
        };
        let target = dir.join(format!("{collection}.json"));
        let staging = dir.join(format!("{collection}.json.tmp"));

        let write = async {
            tokio::fs::write(&staging, &body).await?;
            tokio::fs::rename(&staging, &target).await
        };
        write.await.map_err(|e| {
            tracing::error!(
                operation = %RepositoryOperation::Persist,
                collection,
                error = %e,
                "Failed to write collection snapshot"
            );
            RepositoryError::store_error(
                RepositoryOperation::Persist,
                format!("cannot write {}: {}", target.display(), e),
            )
        })
    }
}

fn load_error(dir: &Path, e: std::io::Error) -> RepositoryError {
    RepositoryError::store_error(
        RepositoryOperation::Load,
        format!("cannot read {}: {}", dir.display(), e),
    )
}

async fn read_snapshot(path: &Path) -> RepositoryResult<Vec<Document>> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        RepositoryError::store_error(
            RepositoryOperation::Load,
            format!("cannot read {}: {}", path.display(), e),
        )
    })?;
    let documents: Vec<Document> = serde_json::from_slice(&raw).map_err(|e| {
        RepositoryError::serialization_error(
            RepositoryOperation::Load,
            format!("{}: {}", path.display(), e),
        )
    })?;
    if documents.iter().any(|doc| document_id(doc).is_none()) {
        return Err(RepositoryError::serialization_error(
            RepositoryOperation::Load,
            format!("{}: every document needs a string id", path.display()),
        ));
    }
    Ok(documents)
}

fn document_id(document: &Document) -> Option<&str> {
    document.get("id").and_then(Value::as_str)
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &FilterDescriptor,
        options: &FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        let Some(handle) = self.existing(collection).await else {
            return Ok(Vec::new());
        };
        let documents = handle.documents.read().await;

        let mut matched: Vec<&Document> = documents.iter().filter(|doc| filter.matches(doc)).collect();
        if !options.sort.is_empty() {
            // stable: equal keys keep insertion order
            matched.sort_by(|a, b| options.sort.compare(a, b));
        }

        let window = matched.into_iter().skip(to_usize(options.skip));
        let page: Vec<Document> = match options.limit {
            Some(limit) => window
                .take(to_usize(limit))
                .map(|doc| options.projection.apply(doc.clone()))
                .collect(),
            None => window.map(|doc| options.projection.apply(doc.clone())).collect(),
        };
        Ok(page)
    }

    async fn count(&self, collection: &str, filter: &FilterDescriptor) -> RepositoryResult<u64> {
        let Some(handle) = self.existing(collection).await else {
            return Ok(0);
        };
        let documents = handle.documents.read().await;
        Ok(documents.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> RepositoryResult<Option<Document>> {
        let Some(handle) = self.existing(collection).await else {
            return Ok(None);
        };
        let documents = handle.documents.read().await;
        Ok(documents.iter().find(|doc| document_id(doc) == Some(id)).cloned())
    }

    async fn insert(&self, collection: &str, document: Document) -> RepositoryResult<Document> {
        let id = document_id(&document)
            .ok_or_else(|| RepositoryError::validation_failed("document is missing a string id"))?
            .to_string();

        let handle = self.collection(collection).await;
        let _writer = handle.writer.lock().await;
        let (next, body) = {
            let existing = handle.documents.read().await;
            if existing.iter().any(|doc| document_id(doc) == Some(id.as_str())) {
                return Err(RepositoryError::already_exists(collection, "id", id));
            }
            self.check_unique(collection, &existing, &document, &id)?;

            let mut next = existing.clone();
            next.push(document.clone());
            let body = self.snapshot(&next)?;
            (next, body)
        };
        self.persist(collection, body).await?;
        *handle.documents.write().await = next;

        tracing::debug!(collection, entity_id = %id, "Inserted document");
        Ok(document)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        mut document: Document,
    ) -> RepositoryResult<Option<Document>> {
        document.insert("id".to_string(), Value::String(id.to_string()));

        let Some(handle) = self.existing(collection).await else {
            return Ok(None);
        };
        let _writer = handle.writer.lock().await;
        let (next, body) = {
            let existing = handle.documents.read().await;
            let Some(position) = existing.iter().position(|doc| document_id(doc) == Some(id)) else {
                return Ok(None);
            };
            self.check_unique(collection, &existing, &document, id)
                .map_err(|e| e.with_operation(RepositoryOperation::Replace))?;

            let mut next = existing.clone();
            next[position] = document.clone();
            let body = self.snapshot(&next)?;
            (next, body)
        };
        self.persist(collection, body).await?;
        *handle.documents.write().await = next;

        tracing::debug!(collection, entity_id = %id, "Replaced document");
        Ok(Some(document))
    }

    async fn delete(&self, collection: &str, id: &str) -> RepositoryResult<Option<Document>> {
        let Some(handle) = self.existing(collection).await else {
            return Ok(None);
        };
        let _writer = handle.writer.lock().await;
        let (next, removed, body) = {
            let existing = handle.documents.read().await;
            let Some(position) = existing.iter().position(|doc| document_id(doc) == Some(id)) else {
                return Ok(None);
            };

            let mut next = existing.clone();
            let removed = next.remove(position);
            let body = self.snapshot(&next)?;
            (next, removed, body)
        };
        self.persist(collection, body).await?;
        *handle.documents.write().await = next;

        tracing::debug!(collection, entity_id = %id, "Deleted document");
        Ok(Some(removed))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        if let Some(dir) = &self.data_dir {
            tokio::fs::metadata(dir).await.map_err(|e| {
                RepositoryError::connection_failed(format!(
                    "data directory {} unavailable: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Projection, RepositoryErrorKind, SortSpec};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (i, category) in ["design", "tech", "design", "design"].iter().enumerate() {
            store
                .insert(
                    "posts",
                    doc(json!({ "id": format!("p{i}"), "category": category, "order": i % 2 })),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_find_filters_sorts_and_windows() {
        let store = seeded().await;
        let filter = FilterDescriptor::new().with_eq("category", "design");
        let options = FindOptions::new()
            .with_sort(SortSpec::parse("order"))
            .with_window(1, Some(2));

        let page = store.find("posts", &filter, &options).await.unwrap();
        let ids: Vec<_> = page.iter().map(|d| d["id"].as_str().unwrap().to_string()).collect();
        // order 0: p0, p2; order 1: p3. Ties keep insertion order.
        assert_eq!(ids, vec!["p2", "p3"]);
        assert_eq!(store.count("posts", &filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_projection_applied() {
        let store = seeded().await;
        let options = FindOptions::new().with_projection(Projection::parse("order").unwrap());
        let page = store.find("posts", &FilterDescriptor::new(), &options).await.unwrap();
        assert_eq!(page[0], doc(json!({ "id": "p0", "order": 0 })));
    }

    #[tokio::test]
    async fn test_unique_fields() {
        let store = MemoryStore::new().with_unique("users", "email");
        store
            .insert("users", doc(json!({ "id": "u1", "email": "a@b.co" })))
            .await
            .unwrap();
        let err = store
            .insert("users", doc(json!({ "id": "u2", "email": "a@b.co" })))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);

        // replacing a document with its own value is fine
        let replaced = store
            .replace("users", "u1", doc(json!({ "email": "a@b.co", "name": "A" })))
            .await
            .unwrap();
        assert!(replaced.is_some());
    }

    #[tokio::test]
    async fn test_missing_documents() {
        let store = seeded().await;
        assert!(store.find_by_id("posts", "nope").await.unwrap().is_none());
        assert!(store.delete("posts", "nope").await.unwrap().is_none());
        assert!(store.replace("ghosts", "p0", Document::new()).await.unwrap().is_none());
        assert_eq!(store.delete("posts", "p1").await.unwrap().unwrap()["category"], "tech");
        assert_eq!(store.count("posts", &FilterDescriptor::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_snapshots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = MemoryStore::open(dir.path()).await.unwrap();
            store
                .insert("services", doc(json!({ "id": "svc_1", "title": "Audit" })))
                .await
                .unwrap();
            store
                .insert("services", doc(json!({ "id": "svc_2", "title": "Build" })))
                .await
                .unwrap();
            store.delete("services", "svc_1").await.unwrap();
        }

        let reopened = MemoryStore::open(dir.path()).await.unwrap();
        let all = reopened
            .find("services", &FilterDescriptor::new(), &FindOptions::new())
            .await
            .unwrap();
        assert_eq!(all, vec![doc(json!({ "id": "svc_2", "title": "Build" }))]);
        assert!(reopened.ping().await.is_ok());
        assert!(!dir.path().join("services.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_pending_write_blocks_neither_readers_nor_other_collections() {
        let store = seeded().await;
        let posts = store.existing("posts").await.unwrap();
        let in_flight = posts.writer.lock().await;

        let within = Duration::from_secs(1);
        let page = timeout(within, store.find("posts", &FilterDescriptor::new(), &FindOptions::new()))
            .await
            .expect("reads proceed while a write is pending")
            .unwrap();
        assert_eq!(page.len(), 4);
        timeout(within, store.insert("team", doc(json!({ "id": "t1" }))))
            .await
            .expect("other collections accept writes")
            .unwrap();

        // same-collection writers queue behind the pending one
        assert!(timeout(Duration::from_millis(50), store.delete("posts", "p0")).await.is_err());
        drop(in_flight);
        assert!(store.delete("posts", "p0").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_writes_all_reach_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path()).await.unwrap());
        let writes: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert("projects", doc(json!({ "id": format!("prj_{i}") })))
                        .await
                })
            })
            .collect();
        for write in writes {
            write.await.unwrap().unwrap();
        }

        let reopened = MemoryStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.count("projects", &FilterDescriptor::new()).await.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("team.json"), b"{not json").unwrap();
        let err = MemoryStore::open(dir.path()).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::SerializationError);
    }
}
