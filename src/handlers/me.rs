// src/handlers/me.rs

use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{alert::AlertEvent, auth::User},
};

// Handler da rota protegida /me
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// Alertas ativos da área do usuário que ele ainda não respondeu
pub async fn get_my_alerts(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<AlertEvent>>, AppError> {
    let pending = app_state.status_service.get_my_pending_alerts(&user).await?;
    Ok(Json(pending))
}
