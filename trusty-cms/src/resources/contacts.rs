//! `/api/contact`

use axum::{extract::State, routing::get, Router};
use std::sync::Arc;

use super::{fetch, list_page, remove, update};
use crate::handlers::{ApiError, ApiOperation, ItemResponse, ListResponse, Payload};
use crate::mail;
use crate::models::{Contact, Model};
use crate::query::{AdHocFilter, ListRules, QueryParams};
use crate::repository::Document;
use crate::state::AppState;

/// Listing rules for `GET /api/contact`
pub const LIST_RULES: ListRules = ListRules {
    default_sort: "-createdAt",
    ad_hoc: &[AdHocFilter::Exact {
        param: "status",
        field: "status",
    }],
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(submit_contact))
        .route(
            "/{id}",
            get(fetch::<Contact>).put(update::<Contact>).delete(remove::<Contact>),
        )
}

async fn list_contacts(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<ListResponse<Document>, ApiError> {
    list_page::<Contact>(&state, &params, &LIST_RULES, None).await
}

/// Stores the submission, then notifies the operators in the background
async fn submit_contact(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<ItemResponse<Contact>, ApiError> {
    let contact = Contact::from_payload(&payload).map_err(|e| ApiError::from(e).with_operation(ApiOperation::Create))?;
    let stored = state.collection::<Contact>().insert(&contact).await?;
    tracing::info!(entity_id = %stored.id, "Contact submitted");

    if let Some(mailer) = state.mailer() {
        tokio::spawn(mail::dispatch(Arc::clone(mailer), stored.notification()));
    }

    Ok(ItemResponse::created(stored).with_message("Contact submitted successfully!"))
}
