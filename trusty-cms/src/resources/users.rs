//! `/api/users`

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};

use super::remove;
use crate::handlers::{ApiError, ApiOperation, ItemResponse, ListResponse, Payload};
use crate::models::{PublicUser, Registration, User};
use crate::repository::{FilterDescriptor, RepositoryErrorKind, SortSpec};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/register", post(register))
        .route("/{id}", get(get_user).delete(remove::<User>))
}

async fn list_users(State(state): State<AppState>) -> Result<ListResponse<PublicUser>, ApiError> {
    let users = state
        .collection::<User>()
        .all(SortSpec::default())
        .await
        .map_err(|e| ApiError::from(e).with_operation(ApiOperation::List))?;
    Ok(ListResponse::all(users).map(PublicUser::from))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ItemResponse<PublicUser>, ApiError> {
    let user = state.collection::<User>().require(&id).await?;
    Ok(ItemResponse::new(PublicUser::from(user)))
}

async fn register(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<ItemResponse<PublicUser>, ApiError> {
    let registration =
        Registration::from_payload(&payload).map_err(|e| ApiError::from(e).with_operation(ApiOperation::Create))?;

    let users = state.collection::<User>();
    let taken = users
        .find(&FilterDescriptor::new().with_eq("email", registration.email.clone()), SortSpec::default())
        .await?;
    if !taken.is_empty() {
        return Err(email_taken());
    }

    let user = tokio::task::spawn_blocking(move || registration.into_user())
        .await
        .map_err(|e| ApiError::internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let stored = users.insert(&user).await.map_err(|e| match e.kind {
        RepositoryErrorKind::AlreadyExists => email_taken(),
        _ => ApiError::from(e),
    })?;
    tracing::info!(entity_id = %stored.id, "Registered user");

    Ok(ItemResponse::created(PublicUser::from(stored)).with_message("Account created successfully!"))
}

fn email_taken() -> ApiError {
    ApiError::already_exists("Email already exists")
}
