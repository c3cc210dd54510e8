//! # relboard HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (no envelope, never authenticated)
//! - `GET /api/hashreleases?projectId=` - List hashreleases
//! - `GET /api/hashreleases/{id}` - One hashrelease
//! - `GET /api/releases?projectId=` - List releases
//! - `GET /api/releases/{id}` - One release
//! - `PATCH /api/releases/{id}/step` - Set a step's status
//! - `POST /api/releases/{id}/step/advance` - Cycle a step to its next status
//! - `GET /api/dashboard` - Recent activity per project
//!
//! CORS, rate limiting, authentication and the body limit come from the
//! `[server]` section of the configuration.

mod error;
mod handlers;
mod middleware;
mod types;

pub use error::{ApiError, ApiResult};
pub use handlers::{
    advance_step_handler, dashboard_handler, get_hashrelease_handler, get_release_handler,
    health_handler, list_hashreleases_handler, list_releases_handler, update_step_handler,
};
pub use middleware::{ApiKey, GlobalRateLimiter, create_rate_limiter};
pub use types::{AdvanceStepRequest, ApiResponse, HealthResponse, ListQuery, StepUpdateRequest};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use mockable::DefaultClock;
use relboard_core::{RelboardError, ReleaseService};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// The service type the server runs, reading the system clock.
pub type Service = ReleaseService<DefaultClock>;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
}

impl AppState {
    #[must_use]
    pub fn new(service: Service) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PATCH, Method::OPTIONS];

/// Build the CORS layer from `cors_origins`.
///
/// - `None`: localhost only
/// - `["*"]`: every origin
/// - otherwise the listed origins; if none parse, localhost only
fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    match origins {
        Some([only]) if only == "*" => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => build_localhost_cors(),
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if an API key is configured)
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let cors = build_cors_layer(server.cors_origins.as_deref());

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/api/hashreleases",
            get(handlers::list_hashreleases_handler),
        )
        .route(
            "/api/hashreleases/{id}",
            get(handlers::get_hashrelease_handler),
        )
        .route("/api/releases", get(handlers::list_releases_handler))
        .route("/api/releases/{id}", get(handlers::get_release_handler))
        .route(
            "/api/releases/{id}/step",
            patch(handlers::update_step_handler),
        )
        .route(
            "/api/releases/{id}/step/advance",
            post(handlers::advance_step_handler),
        )
        .route("/api/dashboard", get(handlers::dashboard_handler));

    match server.api_key() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                ApiKey::new(key),
                middleware::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set [server] api_key or RELBOARD_API_KEY to enable authentication."
            );
        }
    }

    if server.rate_limit > 0 {
        tracing::info!(
            "Rate limiting enabled: {} requests/second",
            server.rate_limit
        );
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(server.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(
            server.body_limit_bytes,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind and serve until Ctrl+C.
pub async fn run_server(service: Service, server: &ServerConfig) -> Result<(), RelboardError> {
    let addr = server.bind_addr();
    let router = create_router(AppState::new(service), server);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelboardError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("relboard HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelboardError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use relboard_core::MemoryStore;
    use tower::ServiceExt;

    fn router(server: &ServerConfig) -> Router {
        let service = ReleaseService::new(Arc::new(MemoryStore::new()), Arc::new(DefaultClock), 5);
        create_router(AppState::new(service), server)
    }

    #[tokio::test]
    async fn health_bypasses_auth() {
        let server = ServerConfig {
            api_key: Some("s3cret".to_string()),
            ..ServerConfig::default()
        };
        let response = router(&server)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(&server)
            .oneshot(Request::get("/api/releases").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let server = ServerConfig {
            body_limit_bytes: 16,
            ..ServerConfig::default()
        };
        let body = format!(r#"{{"stepName":"{}"}}"#, "x".repeat(64));
        let response = router(&server)
            .oneshot(
                Request::post("/api/releases/v1/step/advance")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
