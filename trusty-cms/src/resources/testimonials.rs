//! `/api/testimonials`

use axum::{extract::State, routing::get, Router};

use super::{create, fetch, list_page, remove, update};
use crate::handlers::{ApiError, ListResponse};
use crate::models::Testimonial;
use crate::query::{AdHocFilter, ListRules, QueryParams};
use crate::repository::Document;
use crate::state::AppState;

/// Listing rules for `GET /api/testimonials`; `featured=true` keeps featured ones only
pub const LIST_RULES: ListRules = ListRules {
    default_sort: "order",
    ad_hoc: &[AdHocFilter::Flag {
        param: "featured",
        field: "featured",
    }],
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_testimonials).post(create::<Testimonial>))
        .route(
            "/{id}",
            get(fetch::<Testimonial>)
                .put(update::<Testimonial>)
                .delete(remove::<Testimonial>),
        )
}

async fn list_testimonials(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<ListResponse<Document>, ApiError> {
    list_page::<Testimonial>(&state, &params, &LIST_RULES, None).await
}
