// src/services/push.rs

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::{common::error::AppError, models::alert::PushStats};

/// Colaborador de entrega de push aos dispositivos da área.
#[async_trait]
pub trait PushNotifier: Send + Sync {
    async fn notify_area(&self, area_id: &str, event_id: Uuid) -> Result<PushStats, AppError>;
}

// Sem gateway configurado: apenas registra o pedido
#[derive(Debug, Clone, Default)]
pub struct LoggingPushNotifier;

#[async_trait]
impl PushNotifier for LoggingPushNotifier {
    async fn notify_area(&self, area_id: &str, event_id: Uuid) -> Result<PushStats, AppError> {
        tracing::info!(%area_id, %event_id, "Push não configurado, nenhuma notificação enviada");
        Ok(PushStats::default())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    area_id: &'a str,
    event_id: Uuid,
}

/// Gateway HTTP: `POST {url}` com `{areaId, eventId}`, resposta `{sent, failed}`.
#[derive(Debug, Clone)]
pub struct HttpPushGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpPushGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Upstream(format!("push client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PushNotifier for HttpPushGateway {
    async fn notify_area(&self, area_id: &str, event_id: Uuid) -> Result<PushStats, AppError> {
        let response = self
            .client
            .post(&self.url)
            .json(&PushRequest { area_id, event_id })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("push gateway unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "push gateway answered {}",
                response.status()
            )));
        }

        response
            .json::<PushStats>()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid push gateway reply: {}", e)))
    }
}
