//! Runs a compiled query against the store
//!
//! The page fetch and the count use the same filter and run concurrently.
//! Relation expansion is optional: when the loader fails, the unexpanded page
//! is returned and the outcome records [`Enrichment::Degraded`].

use crate::repository::{
    Document, DocumentStore, FilterDescriptor, FindOptions, RelationLoader, RepositoryResult,
};

/// What happened to relation expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    /// Relations were expanded
    Applied,
    /// Nothing to expand
    Skipped,
    /// Expansion failed; documents are unexpanded
    Degraded(String),
}

impl Enrichment {
    /// True when expansion failed
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// One page of documents plus the total matching the filter
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Sorted, windowed, projected and possibly expanded documents
    pub items: Vec<Document>,
    /// Documents matching the filter across all pages
    pub total: u64,
    /// Result of relation expansion
    pub enrichment: Enrichment,
}

/// Fetches one window of `collection` and the filtered total
pub async fn execute(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &FilterDescriptor,
    options: &FindOptions,
    loader: Option<&dyn RelationLoader>,
) -> RepositoryResult<QueryOutcome> {
    let (items, total) = tokio::try_join!(
        store.find(collection, filter, options),
        store.count(collection, filter),
    )?;

    let (items, enrichment) = enrich(items, loader).await;
    if let Enrichment::Degraded(reason) = &enrichment {
        tracing::warn!(
            collection,
            relation = loader.map(|l| l.relation()).unwrap_or_default(),
            reason = %reason,
            "Relation expansion failed; returning unexpanded documents"
        );
    }

    tracing::debug!(
        collection,
        filter = %filter,
        sort = %options.sort,
        skip = options.skip,
        returned = items.len(),
        total,
        "Executed list query"
    );

    Ok(QueryOutcome {
        items,
        total,
        enrichment,
    })
}

/// Best-effort relation expansion
pub async fn enrich(
    documents: Vec<Document>,
    loader: Option<&dyn RelationLoader>,
) -> (Vec<Document>, Enrichment) {
    let Some(loader) = loader else {
        return (documents, Enrichment::Skipped);
    };
    if documents.is_empty() {
        return (documents, Enrichment::Skipped);
    }
    match loader.expand(&documents).await {
        Ok(expanded) if expanded.len() == documents.len() => (expanded, Enrichment::Applied),
        Ok(expanded) => {
            let reason = format!(
                "loader returned {} documents for {}",
                expanded.len(),
                documents.len()
            );
            (documents, Enrichment::Degraded(reason))
        }
        Err(e) => (documents, Enrichment::Degraded(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryStore, RepositoryError, RepositoryOperation, SortSpec};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Uppercase;

    #[async_trait]
    impl RelationLoader for Uppercase {
        fn relation(&self) -> &str {
            "title"
        }

        async fn expand(&self, documents: &[Document]) -> RepositoryResult<Vec<Document>> {
            Ok(documents
                .iter()
                .cloned()
                .map(|mut doc| {
                    let upper = doc["title"].as_str().unwrap_or_default().to_uppercase();
                    doc.insert("title".into(), Value::String(upper));
                    doc
                })
                .collect())
        }
    }

    struct Broken;

    #[async_trait]
    impl RelationLoader for Broken {
        fn relation(&self) -> &str {
            "author"
        }

        async fn expand(&self, _documents: &[Document]) -> RepositoryResult<Vec<Document>> {
            Err(RepositoryError::connection_failed("users unavailable")
                .with_operation(RepositoryOperation::Expand))
        }
    }

    async fn store_with(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            let doc = json!({ "id": format!("d{i:02}"), "title": format!("t{i}"), "rank": i });
            store
                .insert("docs", doc.as_object().cloned().unwrap())
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_total_counts_filtered_documents() {
        let store = store_with(12).await;
        let filter = FilterDescriptor::from_json(&json!({ "rank": { "gte": "2" } })).unwrap();
        let options = FindOptions::new()
            .with_sort(SortSpec::parse("-rank"))
            .with_window(0, Some(3));

        let outcome = execute(&store, "docs", &filter, &options, None).await.unwrap();
        assert_eq!(outcome.total, 10);
        let ranks: Vec<_> = outcome.items.iter().map(|d| d["rank"].as_u64().unwrap()).collect();
        assert_eq!(ranks, vec![11, 10, 9]);
        assert_eq!(outcome.enrichment, Enrichment::Skipped);
    }

    #[tokio::test]
    async fn test_expansion_applied() {
        let store = store_with(2).await;
        let outcome = execute(&store, "docs", &FilterDescriptor::new(), &FindOptions::new(), Some(&Uppercase))
            .await
            .unwrap();
        assert_eq!(outcome.enrichment, Enrichment::Applied);
        assert_eq!(outcome.items[0]["title"], "T0");
    }

    #[tokio::test]
    async fn test_failed_expansion_degrades() {
        let store = store_with(3).await;
        let outcome = execute(&store, "docs", &FilterDescriptor::new(), &FindOptions::new(), Some(&Broken))
            .await
            .unwrap();
        assert!(outcome.enrichment.is_degraded());
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.items[0]["title"], "t0");
    }

    #[tokio::test]
    async fn test_empty_page_skips_expansion() {
        let store = store_with(0).await;
        let outcome = execute(&store, "docs", &FilterDescriptor::new(), &FindOptions::new(), Some(&Broken))
            .await
            .unwrap();
        assert_eq!(outcome.enrichment, Enrichment::Skipped);
        assert_eq!(outcome.total, 0);
    }
}
