//! `/api/projects`

use axum::{routing::get, Router};

use super::{create, fetch, list_all, remove, update};
use crate::models::Project;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all::<Project>).post(create::<Project>))
        .route(
            "/{id}",
            get(fetch::<Project>).put(update::<Project>).delete(remove::<Project>),
        )
}
