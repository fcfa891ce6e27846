// src/models/status.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::alert::{AlertEvent, ResponseCounts, ResponseStatus};

// Situação de um membro diante de um evento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusLabel {
    Ok,
    Help,
    Pending,
}

impl From<ResponseStatus> for StatusLabel {
    fn from(status: ResponseStatus) -> Self {
        match status {
            ResponseStatus::Ok => StatusLabel::Ok,
            ResponseStatus::Help => StatusLabel::Help,
        }
    }
}

/// Contadores de progresso de um evento.
///
/// `responded` nunca passa de `total_users` e `pending = total_users - responded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total_users: i64,
    pub responded: i64,
    pub pending: i64,
    pub ok: i64,
    pub help: i64,
    pub is_complete: bool,
}

impl StatusCounts {
    pub fn compute(total_users: i64, counts: ResponseCounts) -> Self {
        let total_users = total_users.max(0);
        let responded = counts.total().min(total_users);
        let pending = total_users - responded;
        Self {
            total_users,
            responded,
            pending,
            ok: counts.ok,
            help: counts.help,
            is_complete: pending == 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatus {
    pub user_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub status: StatusLabel,
    pub responded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatusReport {
    pub event: AlertEvent,
    pub counts: StatusCounts,
    pub members: Vec<MemberStatus>,
}

// --- Resumo dos eventos ativos ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: AlertEvent,
    pub total_users: i64,
    pub responded: i64,
    pub pending: i64,
    pub ok: i64,
    pub help: i64,
    pub is_complete: bool,
    // Sem limiar de tempo: ativo e incompleto já é "atrasado"
    pub is_overdue: bool,
}

impl EventSummary {
    pub fn new(event: AlertEvent, counts: StatusCounts) -> Self {
        let is_overdue = event.is_active() && !counts.is_complete;
        Self {
            event,
            total_users: counts.total_users,
            responded: counts.responded,
            pending: counts.pending,
            ok: counts.ok,
            help: counts.help,
            is_complete: counts.is_complete,
            is_overdue,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSummary {
    pub area_id: String,
    pub active_events: Vec<EventSummary>,
    pub total_users: i64,
    pub responded: i64,
    pub pending: i64,
    pub ok: i64,
    pub help: i64,
}

impl AreaSummary {
    /// Consolida os eventos ativos de uma área.
    ///
    /// Eventos sobrepostos contam a mesma população, então `responded` é limitado a `total_users`.
    pub fn rollup(area_id: String, population: i64, active_events: Vec<EventSummary>) -> Self {
        let total_users = population.max(0);
        let responded_sum: i64 = active_events.iter().map(|e| e.responded).sum();
        let responded = responded_sum.min(total_users);
        Self {
            area_id,
            total_users,
            responded,
            pending: total_users - responded,
            ok: active_events.iter().map(|e| e.ok).sum(),
            help: active_events.iter().map(|e| e.help).sum(),
            active_events,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    pub total_users: i64,
    pub responded: i64,
    pub pending: i64,
    pub ok: i64,
    pub help: i64,
    pub active_areas: i64,
    pub active_events: i64,
}

impl SummaryTotals {
    pub fn from_areas(areas: &[AreaSummary]) -> Self {
        areas.iter().fold(Self::default(), |mut acc, area| {
            acc.total_users += area.total_users;
            acc.responded += area.responded;
            acc.pending += area.pending;
            acc.ok += area.ok;
            acc.help += area.help;
            acc.active_areas += 1;
            acc.active_events += area.active_events.len() as i64;
            acc
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSummary {
    pub areas: Vec<AreaSummary>,
    pub totals: SummaryTotals,
    pub generated_at: DateTime<Utc>,
}
