// src/services/response_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CheckinStore, CheckinTransaction},
    models::{
        alert::{
            EventCompletion, NewResponse, ResponseStatus, SubmissionOutcome, AUTO_CLOSE_REASON,
            MAX_NOTES_LEN,
        },
        auth::User,
    },
    realtime::{Audience, RealtimeMessage, RealtimePublisher},
};

#[derive(Clone)]
pub struct ResponseService {
    store: Arc<dyn CheckinStore>,
    publisher: Arc<dyn RealtimePublisher>,
}

impl ResponseService {
    pub fn new(store: Arc<dyn CheckinStore>, publisher: Arc<dyn RealtimePublisher>) -> Self {
        Self { store, publisher }
    }

    fn normalize_notes(notes: Option<String>) -> Result<Option<String>, AppError> {
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if let Some(n) = &notes {
            if n.chars().count() > MAX_NOTES_LEN {
                return Err(AppError::InvalidInput(format!(
                    "notes must be at most {} characters",
                    MAX_NOTES_LEN
                )));
            }
        }
        Ok(notes)
    }

    // --- SUBMIT RESPONSE ---
    pub async fn submit_response(
        &self,
        caller: &User,
        event_id: Uuid,
        status: ResponseStatus,
        notes: Option<String>,
    ) -> Result<SubmissionOutcome, AppError> {
        let notes = Self::normalize_notes(notes)?;

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.store.begin().await?;

        // 1. Carrega e trava o evento. O lock serializa submissões concorrentes
        //    do mesmo evento, inclusive a decisão de encerramento.
        let event = tx.lock_event(event_id).await?.ok_or(AppError::EventNotFound)?;

        // 2. O alerta só vale para membros da área do evento
        if !caller.is_member_of(&event.area_id) {
            return Err(AppError::forbidden("This alert does not apply to you"));
        }

        // 3. Resposta existente é verificada antes de qualquer contagem
        if tx.find_response(caller.id, event_id).await?.is_some() {
            return Err(AppError::DuplicateResponse);
        }

        // 4. Insere (a constraint única continua sendo a última barreira)
        let response = tx
            .insert_response(&NewResponse {
                id: Uuid::new_v4(),
                user_id: caller.id,
                event_id,
                status,
                notes,
                responded_at: Utc::now(),
            })
            .await?;

        // 5. Recalcula dentro da mesma transação e encerra se todos responderam
        let mut completed_event = None;
        if event.is_active() {
            let population = tx.count_members_in_area(&event.area_id).await?;
            let responded = tx.count_responses(event_id).await?;

            if responded >= population {
                let completion = EventCompletion {
                    completed_at: Utc::now(),
                    completed_by_user_id: None,
                    reason: AUTO_CLOSE_REASON.to_string(),
                };
                completed_event = tx.complete_event(event_id, &completion).await?;
            }
        }

        // 6. Commit
        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(
            %event_id,
            user_id = %caller.id,
            status = ?status,
            "Resposta registrada"
        );

        // Pós-commit, best-effort
        self.publisher
            .publish(&Audience::Supervisors, &RealtimeMessage::response_update(&response));

        if let Some(event) = &completed_event {
            tracing::info!(%event_id, area_id = %event.area_id, "✅ Evento encerrado automaticamente");
            if let Some(message) = RealtimeMessage::event_completed(event) {
                self.publisher.publish_all(
                    &[Audience::Supervisors, Audience::Area(event.area_id.clone())],
                    &message,
                );
            }
        }

        Ok(SubmissionOutcome {
            response,
            completed_event,
        })
    }
}
