//! Health check handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::state::AppState;

/// Liveness response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,

    /// Service name
    pub service: String,

    /// Crate version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Readiness response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether every required dependency is reachable
    pub ready: bool,

    /// Service name
    pub service: String,

    /// Per-dependency status
    pub dependencies: HashMap<String, DependencyStatus>,
}

/// Status of one dependency
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Whether the dependency answered
    pub healthy: bool,

    /// Detail for operators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness check
///
/// Returns 200 as long as the process can answer.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check
///
/// Pings the document store; 503 when it is unavailable. The media backend
/// and mailer are reported but never block readiness.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let mut dependencies = HashMap::new();

    let store_ready = match state.store().ping().await {
        Ok(()) => {
            dependencies.insert(
                "store".to_string(),
                DependencyStatus {
                    healthy: true,
                    message: Some("Available".to_string()),
                },
            );
            true
        }
        Err(e) => {
            tracing::error!(operation = %e.operation, kind = %e.kind, "Store health check failed: {}", e);
            dependencies.insert(
                "store".to_string(),
                DependencyStatus {
                    healthy: false,
                    message: Some(e.message.clone()),
                },
            );
            false
        }
    };

    dependencies.insert(
        "media".to_string(),
        DependencyStatus {
            healthy: true,
            message: Some(format!("Backend: {}", state.media().backend())),
        },
    );
    dependencies.insert(
        "mail".to_string(),
        DependencyStatus {
            healthy: true,
            message: Some(
                if state.mailer().is_some() {
                    "Configured"
                } else {
                    "Not configured"
                }
                .to_string(),
            ),
        },
    );

    let status = if store_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadinessResponse {
        ready: store_ready,
        service: state.config().service.name.clone(),
        dependencies,
    };

    (status, Json(response))
}
