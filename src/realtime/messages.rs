// src/realtime/messages.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::alert::{AlertEvent, Response, ResponseStatus};

/// Mensagens enviadas do servidor para os clientes conectados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RealtimeMessage {
    NewAlert {
        event_id: Uuid,
        area_id: String,
        triggered_at: DateTime<Utc>,
    },
    ResponseUpdate {
        event_id: Uuid,
        user_id: Uuid,
        status: ResponseStatus,
        timestamp: DateTime<Utc>,
    },
    EventCompleted {
        event_id: Uuid,
        area_id: String,
        completed_at: DateTime<Utc>,
        auto_closed: bool,
    },
    Pong,
}

impl RealtimeMessage {
    pub fn new_alert(event: &AlertEvent) -> Self {
        RealtimeMessage::NewAlert {
            event_id: event.id,
            area_id: event.area_id.clone(),
            triggered_at: event.triggered_at,
        }
    }

    pub fn response_update(response: &Response) -> Self {
        RealtimeMessage::ResponseUpdate {
            event_id: response.event_id,
            user_id: response.user_id,
            status: response.status,
            timestamp: response.responded_at,
        }
    }

    /// `None` se o evento ainda estiver ativo.
    pub fn event_completed(event: &AlertEvent) -> Option<Self> {
        event.completed_at.map(|completed_at| RealtimeMessage::EventCompleted {
            event_id: event.id,
            area_id: event.area_id.clone(),
            completed_at,
            auto_closed: event.completed_by_user_id.is_none(),
        })
    }
}

/// Comandos que o cliente envia pelo WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    JoinSupervisors,
    JoinArea { area_id: String },
    LeaveArea { area_id: String },
    Ping,
}

/// Grupo de destino de uma publicação.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Audience {
    Supervisors,
    Area(String),
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Supervisors => write!(f, "supervisors"),
            Audience::Area(area_id) => write!(f, "area-{}", area_id),
        }
    }
}
