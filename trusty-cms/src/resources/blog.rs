//! `/api/blog`

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{create, list_page, remove, update};
use crate::handlers::{ApiError, ApiOperation, ItemResponse, ListResponse};
use crate::models::{BlogPost, User};
use crate::query::{enrich, AdHocFilter, ListRules, QueryParams};
use crate::repository::{
    Document, DocumentStore, FilterDescriptor, FindOptions, Projection, RelationLoader,
    RepositoryOperation, RepositoryResult, Resource, SortSpec,
};
use crate::state::AppState;

/// Listing rules for `GET /api/blog`
pub const LIST_RULES: ListRules = ListRules {
    default_sort: "-createdAt",
    ad_hoc: &[
        AdHocFilter::Exact {
            param: "category",
            field: "category",
        },
        AdHocFilter::AnyOf {
            param: "tags",
            field: "tags",
        },
    ],
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create::<BlogPost>))
        .route("/category/{name}", get(posts_in_category))
        .route("/tag/{name}", get(posts_with_tag))
        .route(
            "/{id}",
            get(get_post).put(update::<BlogPost>).delete(remove::<BlogPost>),
        )
        .route("/{id}/publish", put(toggle_publish))
}

/// Replaces an `author` holding a user id with `{ id, name }`
pub struct AuthorLoader {
    store: Arc<dyn DocumentStore>,
}

impl AuthorLoader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RelationLoader for AuthorLoader {
    fn relation(&self) -> &str {
        "author"
    }

    async fn expand(&self, documents: &[Document]) -> RepositoryResult<Vec<Document>> {
        let mut ids: Vec<Value> = documents
            .iter()
            .filter_map(|doc| doc.get("author").and_then(Value::as_str))
            .filter(|author| author.starts_with(User::ID_PREFIX))
            .map(|author| Value::String(author.to_string()))
            .collect();
        ids.dedup();
        if ids.is_empty() {
            return Ok(documents.to_vec());
        }

        let filter = FilterDescriptor::new().with_any_of("id", ids);
        let options = FindOptions::new().with_projection(Projection::Include(vec!["name".to_string()]));
        let users = self
            .store
            .find(User::COLLECTION, &filter, &options)
            .await
            .map_err(|e| e.with_operation(RepositoryOperation::Expand))?;

        let names: HashMap<&str, &Value> = users
            .iter()
            .filter_map(|user| Some((user.get("id")?.as_str()?, user.get("name")?)))
            .collect();

        Ok(documents
            .iter()
            .cloned()
            .map(|mut doc| {
                let author = doc.get("author").and_then(Value::as_str).and_then(|id| {
                    names.get(id).map(|name| json!({ "id": id, "name": name }))
                });
                if let Some(author) = author {
                    doc.insert("author".to_string(), author);
                }
                doc
            })
            .collect())
    }
}

async fn list_posts(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<ListResponse<Document>, ApiError> {
    let loader = AuthorLoader::new(Arc::clone(state.store()));
    list_page::<BlogPost>(&state, &params, &LIST_RULES, Some(&loader)).await
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ItemResponse<Document>, ApiError> {
    let document = state.collection::<BlogPost>().require_document(&id).await?;
    let loader = AuthorLoader::new(Arc::clone(state.store()));
    let (mut expanded, _) = enrich(vec![document], Some(&loader)).await;
    let document = expanded.pop().unwrap_or_default();
    Ok(ItemResponse::new(document))
}

async fn posts_in_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<ListResponse<Document>, ApiError> {
    matching_posts(&state, FilterDescriptor::new().with_eq("category", name)).await
}

async fn posts_with_tag(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<ListResponse<Document>, ApiError> {
    matching_posts(&state, FilterDescriptor::new().with_any_of("tags", vec![Value::String(name)])).await
}

/// Every post matching `filter`, newest first, authors expanded when possible
async fn matching_posts(state: &AppState, filter: FilterDescriptor) -> Result<ListResponse<Document>, ApiError> {
    let options = FindOptions::new().with_sort(SortSpec::parse("-createdAt"));
    let documents = state
        .store()
        .find(BlogPost::COLLECTION, &filter, &options)
        .await
        .map_err(|e| ApiError::from(e).with_operation(ApiOperation::List))?;

    let loader = AuthorLoader::new(Arc::clone(state.store()));
    let (documents, enrichment) = enrich(documents, Some(&loader)).await;
    if enrichment.is_degraded() {
        tracing::warn!(collection = BlogPost::COLLECTION, ?enrichment, "Author expansion failed");
    }
    Ok(ListResponse::all(documents))
}

async fn toggle_publish(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ItemResponse<BlogPost>, ApiError> {
    let posts = state.collection::<BlogPost>();
    let mut post = posts.require(&id).await?;
    post.toggle_published();
    let stored = posts.save(&post).await?;
    tracing::info!(entity_id = %id, published = stored.published, "Toggled publication");
    Ok(ItemResponse::new(stored))
}
