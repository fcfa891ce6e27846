//src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod common;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;

pub fn router(app_state: AppState) -> Router {
    // Rotas de alerta (protegidas pelo middleware)
    let alert_routes = Router::new()
        .route("/", post(handlers::alerts::trigger_alert))
        .route("/active-summary", get(handlers::alerts::get_active_summary))
        .route("/{id}/responses", post(handlers::alerts::submit_response))
        .route("/{id}/close", post(handlers::alerts::close_alert))
        .route("/{id}/status", get(handlers::alerts::get_event_status))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let me_routes = Router::new()
        .route("/", get(handlers::me::get_me))
        .route("/alerts", get(handlers::me::get_my_alerts))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let realtime_routes = Router::new()
        .route("/", get(handlers::realtime::realtime_socket))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/alerts", alert_routes)
        .nest("/api/me", me_routes)
        .nest("/api/realtime", realtime_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
