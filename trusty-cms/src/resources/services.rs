//! `/api/services`

use axum::{extract::State, routing::get, Router};

use super::{create, fetch, list_page, remove, update};
use crate::handlers::{ApiError, ListResponse};
use crate::models::Service;
use crate::query::{ListRules, QueryParams};
use crate::repository::Document;
use crate::state::AppState;

/// Listing rules for `GET /api/services`
pub const LIST_RULES: ListRules = ListRules {
    default_sort: "order",
    ad_hoc: &[],
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(create::<Service>))
        .route(
            "/{id}",
            get(fetch::<Service>).put(update::<Service>).delete(remove::<Service>),
        )
}

async fn list_services(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<ListResponse<Document>, ApiError> {
    list_page::<Service>(&state, &params, &LIST_RULES, None).await
}
