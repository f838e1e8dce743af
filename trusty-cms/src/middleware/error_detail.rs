//! Diagnostic detail on error responses
//!
//! [`ApiError`](crate::handlers::ApiError) always renders the client-safe
//! envelope and attaches the full one, `stack` included, as an
//! [`ErrorDetail`] response extension. Outside production this middleware
//! swaps the full envelope in; in production the extension is dropped.
//! The decision reads the state's own configuration, so two routers built
//! for different environments never see each other's setting.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};

use crate::handlers::ErrorDetail;
use crate::state::AppState;

/// Middleware function for axum
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn error_detail(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let Some(ErrorDetail(detailed)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };
    if state.config().service.is_production() {
        return response;
    }

    match serde_json::to_vec(&detailed) {
        Ok(bytes) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to render error detail");
            response
        }
    }
}
