//! HTTP server with graceful shutdown

use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::{Config, MediaBackend},
    error::Result,
    health,
    middleware::{error_detail, sensitive_headers_layer, RequestTracking},
    resources,
    state::AppState,
};

/// Full application router with the middleware stack applied
///
/// Layers are listed outermost first. Locally stored uploads are served
/// under the configured public path.
pub fn app(state: AppState) -> Result<Router> {
    let config = state.config().clone();
    let tracking = RequestTracking::new(&config.middleware.request_id_header)?;

    let mut router = resources::routes()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness));

    if config.media.backend == MediaBackend::Local {
        router = router.nest_service(
            &config.media.public_path,
            ServeDir::new(&config.media.upload_dir),
        );
    }

    let mut app = router
        .layer(from_fn_with_state(state.clone(), error_detail))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.middleware.body_limit_bytes()));

    if config.middleware.catch_panic {
        app = app.layer(CatchPanicLayer::new());
    }

    app = app
        .layer(tracking.request_id_layer())
        .layer(tracking.propagation_layer())
        .layer(sensitive_headers_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(RequestBodyLimitLayer::new(config.middleware.body_limit_bytes()))
        .layer(TimeoutLayer::with_status_code(
            http::StatusCode::REQUEST_TIMEOUT,
            config.service.timeout(),
        ));

    if config.middleware.compression {
        app = app.layer(CompressionLayer::new());
    }

    Ok(app.layer(cors_layer(&config.middleware.cors_mode)))
}

/// Server instance
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Binds the configured port and serves until SIGINT or SIGTERM
    pub async fn serve(self) -> Result<()> {
        let config = self.state.config().clone();
        let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));

        tracing::info!("Starting {} on {}", config.service.name, addr);
        log_middleware_config(&config);

        let app = app(self.state)?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    pub fn config(&self) -> &Config {
        self.state.config()
    }
}

fn log_middleware_config(config: &Config) {
    tracing::info!("Middleware configuration:");
    tracing::info!("  - Panic recovery: {}", config.middleware.catch_panic);
    tracing::info!("  - Request ID header: {}", config.middleware.request_id_header);
    tracing::info!("  - Request body limit: {} MB", config.middleware.body_limit_mb);
    tracing::info!("  - Compression: {}", config.middleware.compression);
    tracing::info!("  - CORS mode: {}", config.middleware.cors_mode);
    tracing::info!("  - Request timeout: {} seconds", config.service.timeout_secs);
    tracing::info!("  - Media backend: {:?}", config.media.backend);
    tracing::info!(
        "  - Contact notifications: {}",
        if config.mail.is_some() { "enabled" } else { "disabled" }
    );
}

fn cors_layer(mode: &str) -> CorsLayer {
    match mode {
        "permissive" => {
            tracing::debug!("Enabling permissive CORS");
            CorsLayer::permissive()
        }
        "restrictive" | "disabled" => {
            tracing::debug!("Restrictive CORS (default deny)");
            CorsLayer::new()
        }
        _ => {
            tracing::warn!("Unknown CORS mode: {}, defaulting to permissive", mode);
            CorsLayer::permissive()
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::repository::MemoryStore;
    use std::sync::Arc;

    async fn test_state() -> AppState {
        AppState::builder()
            .config(Config::default())
            .store(Arc::new(MemoryStore::new()))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = app(test_state().await).unwrap();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let app = app(test_state().await).unwrap();
        let response = app
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "req-from-client")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-from-client");
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let app = app(test_state().await).unwrap();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(id.starts_with("req_"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = app(test_state().await).unwrap();
        let response = app
            .oneshot(Request::get("/api/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
