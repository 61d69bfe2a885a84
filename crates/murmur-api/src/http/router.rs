//! Axum router configuration with middleware.
//!
//! Middleware: CORS (single origin, credentials allowed), request tracing,
//! and a request timeout that also bounds the WebSocket handshake.

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(err) => {
            tracing::warn!(
                origin = %allowed_origin,
                error = %err,
                "invalid allowed_origin, CORS disabled"
            );
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::ws::ws_handler))
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/health", get(handlers::health::health_check))
        .layer(TimeoutLayer::new(state.config.handshake_timeout()))
        .layer(cors_layer(&state.config.allowed_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
