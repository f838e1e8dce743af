//! `/api/subsidiaries`

use axum::{extract::State, routing::get, Router};

use super::{attach_uploads, fetch, list_all, remove, update};
use crate::handlers::{ApiError, ApiOperation, ItemResponse, Payload};
use crate::models::{Model, Subsidiary};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all::<Subsidiary>).post(create_subsidiary))
        .route(
            "/{id}",
            get(fetch::<Subsidiary>)
                .put(update::<Subsidiary>)
                .delete(remove::<Subsidiary>),
        )
}

/// A logo upload is mandatory on create
async fn create_subsidiary(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<ItemResponse<Subsidiary>, ApiError> {
    if payload.file(Subsidiary::LOGO_FIELD).is_none() {
        return Err(ApiError::bad_request("Logo image is required").with_operation(ApiOperation::Create));
    }

    let mut subsidiary =
        Subsidiary::from_payload(&payload).map_err(|e| ApiError::from(e).with_operation(ApiOperation::Create))?;
    attach_uploads(&state, &payload, &mut subsidiary).await?;
    subsidiary
        .validate()
        .map_err(|e| ApiError::from(e).with_operation(ApiOperation::Create))?;

    let stored = state.collection::<Subsidiary>().insert(&subsidiary).await?;
    tracing::info!(entity_id = %stored.id, "Created subsidiary");
    Ok(ItemResponse::created(stored))
}
