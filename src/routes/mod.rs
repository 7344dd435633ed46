pub mod admin;
pub mod auth;
pub mod docs;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth as auth_mw, cors::mini_app_cors, rate_limit};
use crate::AppState;

pub fn app_router(state: AppState, public_rps: u32) -> Router {
    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(docs::openapi_json))
        .route("/api/auth/verify", post(auth::verify));

    let telegram_api = Router::new()
        .route("/api/auth/me", get(auth::me).post(auth::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_mw::require_telegram_user,
        ));

    // Layers run bottom-up: identity first, then the admin check.
    let admin_api = Router::new()
        .route("/api/admin/session", get(admin::session))
        .route_layer(axum::middleware::from_fn(auth_mw::require_admin))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_mw::require_telegram_user,
        ));

    Router::new()
        .merge(public_api)
        .merge(telegram_api)
        .merge(admin_api)
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(public_rps),
            rate_limit::rps_middleware,
        ))
        .with_state(state)
        .layer(mini_app_cors())
        .layer(TraceLayer::new_for_http())
}
