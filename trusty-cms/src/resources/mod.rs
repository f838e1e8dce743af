//! HTTP routes, one module per resource
//!
//! Handlers shared by several resources are generic over the resource type
//! and live here; anything resource-specific sits in the resource's module.

pub mod blog;
pub mod contacts;
pub mod projects;
pub mod services;
pub mod subsidiaries;
pub mod team;
pub mod testimonials;
pub mod users;

use axum::{
    extract::{Path, State},
    Router,
};

use crate::handlers::{ApiError, ApiOperation, Deleted, ItemResponse, ListResponse, Payload};
use crate::models::Model;
use crate::query::{self, ListQuery, ListRules, QueryParams};
use crate::repository::{Document, RelationLoader, Resource, SortSpec};
use crate::state::AppState;

/// Every resource router under `/api`
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/blog", blog::routes())
        .nest("/api/services", services::routes())
        .nest("/api/contact", contacts::routes())
        .nest("/api/testimonials", testimonials::routes())
        .nest("/api/team", team::routes())
        .nest("/api/subsidiaries", subsidiaries::routes())
        .nest("/api/projects", projects::routes())
        .nest("/api/users", users::routes())
}

/// `GET /` through the list engine
pub(crate) async fn list_page<R: Resource>(
    state: &AppState,
    params: &QueryParams,
    rules: &ListRules,
    loader: Option<&dyn RelationLoader>,
) -> Result<ListResponse<Document>, ApiError> {
    let query = ListQuery::compile(params, rules, state.config().listing.default_limit)?;
    let page = query::list(state.store().as_ref(), R::COLLECTION, &query, loader)
        .await
        .map_err(|e| ApiError::from(e).with_operation(ApiOperation::List))?;
    Ok(ListResponse::paginated(page.items, page.pagination))
}

/// `GET /` returning the whole collection in insertion order
pub(crate) async fn list_all<R: Resource>(State(state): State<AppState>) -> Result<ListResponse<R>, ApiError> {
    let items = state
        .collection::<R>()
        .all(SortSpec::default())
        .await
        .map_err(|e| ApiError::from(e).with_operation(ApiOperation::List))?;
    Ok(ListResponse::all(items))
}

/// `GET /{id}`
pub(crate) async fn fetch<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ItemResponse<R>, ApiError> {
    let item = state.collection::<R>().require(&id).await?;
    Ok(ItemResponse::new(item))
}

/// `POST /`: validate, upload, then insert
pub(crate) async fn create<M: Model>(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<ItemResponse<M>, ApiError> {
    let mut entity = M::from_payload(&payload).map_err(|e| ApiError::from(e).with_operation(ApiOperation::Create))?;
    attach_uploads(&state, &payload, &mut entity).await?;
    let stored = state.collection::<M>().insert(&entity).await?;
    tracing::info!(collection = M::COLLECTION, entity_id = stored.id(), "Created document");
    Ok(ItemResponse::created(stored))
}

/// `PUT /{id}`: apply, validate, upload, then save
pub(crate) async fn update<M: Model>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<ItemResponse<M>, ApiError> {
    let collection = state.collection::<M>();
    let mut entity = collection.require(&id).await?;
    entity
        .apply(&payload)
        .map_err(|e| ApiError::from(e).with_operation(ApiOperation::Update))?;
    attach_uploads(&state, &payload, &mut entity).await?;
    let stored = collection.save(&entity).await?;
    tracing::info!(collection = M::COLLECTION, entity_id = %id, "Updated document");
    Ok(ItemResponse::new(stored))
}

/// `DELETE /{id}`
pub(crate) async fn remove<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Deleted, ApiError> {
    state.collection::<R>().remove(&id).await?;
    tracing::info!(collection = R::COLLECTION, entity_id = %id, "Deleted document");
    Ok(Deleted)
}

/// Uploads the body's files for each of the model's upload slots
///
/// A slot over its file limit fails the request before anything is
/// uploaded. Nothing is attached unless every upload succeeds.
pub(crate) async fn attach_uploads<M: Model>(
    state: &AppState,
    payload: &Payload,
    entity: &mut M,
) -> Result<(), ApiError> {
    for slot in M::UPLOADS {
        let received = payload.files(slot.field).count();
        if received > slot.max_count {
            tracing::info!(
                collection = M::COLLECTION,
                field = slot.field,
                received,
                max = slot.max_count,
                "Rejected upload over the file limit"
            );
            return Err(ApiError::bad_request(format!(
                "Too many files for {}: at most {} allowed",
                slot.field, slot.max_count
            )));
        }
    }

    let mut uploaded = Vec::with_capacity(M::UPLOADS.len());
    for slot in M::UPLOADS {
        let mut urls = Vec::new();
        for file in payload.files(slot.field) {
            let url = state.media().store(file, slot.folder).await.map_err(|e| {
                tracing::error!(
                    operation = "upload",
                    backend = state.media().backend(),
                    collection = M::COLLECTION,
                    entity_id = entity.id(),
                    field = slot.field,
                    error = %e,
                    "Upload failed"
                );
                ApiError::from(e)
            })?;
            urls.push(url);
        }
        if !urls.is_empty() {
            uploaded.push((slot.field, urls));
        }
    }
    for (field, urls) in uploaded {
        entity.attach(field, urls);
    }
    Ok(())
}
