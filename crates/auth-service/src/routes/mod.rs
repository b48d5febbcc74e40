//! HTTP routes for the task API auth layer.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::token_authority::TokenAuthority;
use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use common::session_renewal::{REFRESH_SIGNAL_HEADER, RENEWAL_PATH};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<TokenAuthority>,
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness check (public)
/// - `/metrics` - Prometheus metrics (public)
/// - `/api/renovar-token` - Token renewal (authenticates the bearer itself)
/// - `/api/jwt-status` - Rotation status (public, not mounted in production)
/// - `/api/me` - Current subject (requires authentication)
/// - CORS exposing `X-Token-Refresh-Available` to browser clients
/// - TraceLayer, 30 second timeout, HTTP metrics (outermost)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        authority: state.authority.clone(),
    });

    let mut public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(RENEWAL_PATH, post(handlers::handle_renew_token));

    if !state.config.posture.is_production() {
        public_routes = public_routes.route("/api/jwt-status", get(handlers::handle_jwt_status));
    }

    let public_routes = public_routes.with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. CorsLayer - answers preflight, exposes the refresh header
    // 4. http_metrics_middleware (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(REFRESH_SIGNAL_HEADER)])
}
