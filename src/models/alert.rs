// src/models/alert.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Motivo gravado quando o evento é encerrado pela última resposta.
pub const AUTO_CLOSE_REASON: &str = "All members of the area have responded";

/// Motivo padrão do encerramento manual por um supervisor.
pub const MANUAL_CLOSE_REASON: &str = "Closed by supervisor";

pub const MAX_NOTES_LEN: usize = 500;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "response_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Ok,
    Help,
}

// --- Entidades ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub id: Uuid,
    pub area_id: String,
    pub triggered_at: DateTime<Utc>,
    pub triggered_by_user_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    // Ausente com completed_at preenchido => encerrado automaticamente
    pub completed_by_user_id: Option<Uuid>,
    pub completion_reason: Option<String>,
}

impl AlertEvent {
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }

    pub fn was_auto_closed(&self) -> bool {
        self.completed_at.is_some() && self.completed_by_user_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub status: ResponseStatus,
    pub notes: Option<String>,
    pub responded_at: DateTime<Utc>,
}

/// Linha a inserir; o id e o horário são definidos pelo serviço.
#[derive(Debug, Clone)]
pub struct NewResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub status: ResponseStatus,
    pub notes: Option<String>,
    pub responded_at: DateTime<Utc>,
}

/// Dados de encerramento aplicados numa única escrita condicional.
#[derive(Debug, Clone)]
pub struct EventCompletion {
    pub completed_at: DateTime<Utc>,
    pub completed_by_user_id: Option<Uuid>,
    pub reason: String,
}

/// Contagens de respostas de um evento por status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseCounts {
    pub ok: i64,
    pub help: i64,
}

impl ResponseCounts {
    pub fn total(&self) -> i64 {
        self.ok + self.help
    }
}

// --- Resultados dos serviços ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushStats {
    pub sent: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    pub event: AlertEvent,
    pub push_stats: PushStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub response: Response,
    // Preenchido somente quando esta resposta fechou o evento
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_event: Option<AlertEvent>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TriggerAlertPayload {
    #[validate(length(min = 1, max = 64, message = "areaId must be between 1 and 64 characters."))]
    pub area_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponsePayload {
    pub status: ResponseStatus,
    // Limite aplicado depois do trim, no serviço
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CloseEventPayload {
    #[validate(length(min = 1, max = 200, message = "reason must be between 1 and 200 characters."))]
    pub reason: Option<String>,
}
