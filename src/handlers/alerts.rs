// src/handlers/alerts.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        alert::{
            AlertEvent, CloseEventPayload, SubmissionOutcome, SubmitResponsePayload,
            TriggerAlertPayload, TriggerOutcome,
        },
        status::{ActiveSummary, EventStatusReport},
    },
};

// POST /api/alerts
pub async fn trigger_alert(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<TriggerAlertPayload>,
) -> Result<(StatusCode, Json<TriggerOutcome>), AppError> {
    if !user.is_supervisor() {
        return Err(AppError::forbidden("Only supervisors can trigger alerts"));
    }
    payload.validate().map_err(AppError::ValidationError)?;

    let area_id = payload.area_id.trim();
    if !user.can_see_area(area_id) {
        return Err(AppError::forbidden(format!(
            "Area '{}' is outside your supervised areas",
            area_id
        )));
    }

    let outcome = app_state
        .alert_service
        .trigger_alert(area_id, Some(user.id))
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// POST /api/alerts/{id}/responses
pub async fn submit_response(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<SubmitResponsePayload>,
) -> Result<(StatusCode, Json<SubmissionOutcome>), AppError> {
    // Notas são aparadas e limitadas no serviço
    let outcome = app_state
        .response_service
        .submit_response(&user, event_id, payload.status, payload.notes)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// POST /api/alerts/{id}/close (corpo opcional)
pub async fn close_alert(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
    payload: Option<Json<CloseEventPayload>>,
) -> Result<Json<AlertEvent>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate().map_err(AppError::ValidationError)?;

    let event = app_state
        .alert_service
        .close_event(&user, event_id, payload.reason.as_deref())
        .await?;

    Ok(Json(event))
}

// GET /api/alerts/{id}/status
pub async fn get_event_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventStatusReport>, AppError> {
    let report = app_state
        .status_service
        .get_event_status(event_id, &user)
        .await?;
    Ok(Json(report))
}

// GET /api/alerts/active-summary
pub async fn get_active_summary(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ActiveSummary>, AppError> {
    let summary = app_state.status_service.get_active_summary(&user).await?;
    Ok(Json(summary))
}
