// src/services/alert_service.rs

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CheckinStore, CheckinTransaction},
    models::{
        alert::{AlertEvent, EventCompletion, PushStats, TriggerOutcome, MANUAL_CLOSE_REASON},
        auth::User,
    },
    realtime::{Audience, RealtimeMessage, RealtimePublisher},
    services::{area_directory::AreaDirectory, push::PushNotifier},
};

#[derive(Clone)]
pub struct AlertService {
    store: Arc<dyn CheckinStore>,
    areas: Arc<dyn AreaDirectory>,
    push: Arc<dyn PushNotifier>,
    publisher: Arc<dyn RealtimePublisher>,
    push_timeout: Duration,
}

impl AlertService {
    pub fn new(
        store: Arc<dyn CheckinStore>,
        areas: Arc<dyn AreaDirectory>,
        push: Arc<dyn PushNotifier>,
        publisher: Arc<dyn RealtimePublisher>,
        push_timeout: Duration,
    ) -> Self {
        Self {
            store,
            areas,
            push,
            publisher,
            push_timeout,
        }
    }

    // --- TRIGGER ALERT ---
    // A autorização (papel e escopo) é responsabilidade de quem chama.
    pub async fn trigger_alert(
        &self,
        area_id: &str,
        triggered_by_user_id: Option<Uuid>,
    ) -> Result<TriggerOutcome, AppError> {
        // 1. Valida a área no diretório
        let area_id = area_id.trim();
        if area_id.is_empty() {
            return Err(AppError::InvalidInput("areaId is required".into()));
        }
        // Falha do diretório é de colaborador externo: Upstream, nunca Internal
        let known = self.areas.is_known_area(area_id).await.map_err(|e| match e {
            AppError::Upstream(_) => e,
            other => {
                tracing::error!(%area_id, "Falha no diretório de áreas: {:?}", other);
                AppError::Upstream(format!("area directory unavailable: {}", other))
            }
        })?;
        if !known {
            return Err(AppError::UnknownArea(area_id.to_string()));
        }

        // 2. Cria o evento (ativo)
        let event = self
            .store
            .create_event(area_id, triggered_by_user_id, Utc::now())
            .await?;
        tracing::info!(event_id = %event.id, %area_id, "🚨 Alerta disparado");

        // 3. Publica. Falha aqui não desfaz o evento criado.
        let message = RealtimeMessage::new_alert(&event);
        let delivered = self.publisher.publish_all(
            &[Audience::Supervisors, Audience::Area(event.area_id.clone())],
            &message,
        );
        tracing::debug!(event_id = %event.id, delivered, "new-alert publicado");

        // 4. Push best-effort: erro vira contador + log, nunca erro da chamada
        let push_stats = self.request_push(&event).await;

        Ok(TriggerOutcome { event, push_stats })
    }

    async fn request_push(&self, event: &AlertEvent) -> PushStats {
        let attempt = tokio::time::timeout(
            self.push_timeout,
            self.push.notify_area(&event.area_id, event.id),
        )
        .await;

        match attempt {
            Ok(Ok(stats)) => {
                tracing::info!(event_id = %event.id, sent = stats.sent, failed = stats.failed, "Push solicitado");
                stats
            }
            Ok(Err(e)) => {
                tracing::warn!(event_id = %event.id, "Falha no push: {}", e);
                PushStats { sent: 0, failed: 1 }
            }
            Err(_) => {
                tracing::warn!(event_id = %event.id, timeout = ?self.push_timeout, "Push excedeu o tempo limite");
                PushStats { sent: 0, failed: 1 }
            }
        }
    }

    // --- CLOSE EVENT (encerramento manual) ---
    pub async fn close_event(
        &self,
        caller: &User,
        event_id: Uuid,
        reason: Option<&str>,
    ) -> Result<AlertEvent, AppError> {
        if !caller.is_supervisor() {
            return Err(AppError::forbidden("Only supervisors can close alerts"));
        }

        let mut tx = self.store.begin().await?;

        // Mesmo lock de linha da submissão: fechamento manual e automático se excluem
        let event = tx.lock_event(event_id).await?.ok_or(AppError::EventNotFound)?;
        if !caller.can_see_area(&event.area_id) {
            return Err(AppError::forbidden("This alert is outside your supervised areas"));
        }
        if !event.is_active() {
            return Err(AppError::EventAlreadyCompleted);
        }

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(MANUAL_CLOSE_REASON);
        let completion = EventCompletion {
            completed_at: Utc::now(),
            completed_by_user_id: Some(caller.id),
            reason: reason.to_string(),
        };
        let closed = tx
            .complete_event(event_id, &completion)
            .await?
            .ok_or(AppError::EventAlreadyCompleted)?;

        tx.commit().await?;
        tracing::info!(%event_id, closed_by = %caller.id, "Evento encerrado manualmente");

        if let Some(message) = RealtimeMessage::event_completed(&closed) {
            self.publisher.publish_all(
                &[Audience::Supervisors, Audience::Area(closed.area_id.clone())],
                &message,
            );
        }

        Ok(closed)
    }
}
