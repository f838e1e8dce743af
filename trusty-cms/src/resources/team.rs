//! `/api/team`

use axum::{routing::get, Router};

use super::{create, fetch, list_all, remove, update};
use crate::models::TeamMember;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all::<TeamMember>).post(create::<TeamMember>))
        .route(
            "/{id}",
            get(fetch::<TeamMember>)
                .put(update::<TeamMember>)
                .delete(remove::<TeamMember>),
        )
}
