// src/db/store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        alert::{AlertEvent, EventCompletion, NewResponse, Response, ResponseCounts},
        auth::User,
    },
};

/// Fronteira de persistência usada pelos serviços.
///
/// Leituras simples vão direto ao store; tudo que decide o ciclo de vida de um
/// evento passa por uma [`CheckinTransaction`].
#[async_trait]
pub trait CheckinStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// Membros (role MEMBER) cuja área de origem é `area_id`.
    async fn members_in_area(&self, area_id: &str) -> Result<Vec<User>, AppError>;

    async fn count_members_in_area(&self, area_id: &str) -> Result<i64, AppError>;

    async fn create_event(
        &self,
        area_id: &str,
        triggered_by_user_id: Option<Uuid>,
        triggered_at: DateTime<Utc>,
    ) -> Result<AlertEvent, AppError>;

    async fn find_event(&self, event_id: Uuid) -> Result<Option<AlertEvent>, AppError>;

    async fn active_events_in_area(&self, area_id: &str) -> Result<Vec<AlertEvent>, AppError>;

    async fn responses_for_event(&self, event_id: Uuid) -> Result<Vec<Response>, AppError>;

    async fn response_counts(&self, event_id: Uuid) -> Result<ResponseCounts, AppError>;

    async fn responses_by_user(&self, user_id: Uuid, event_ids: &[Uuid]) -> Result<Vec<Response>, AppError>;

    async fn begin(&self) -> Result<Box<dyn CheckinTransaction>, AppError>;
}

/// Unidade de trabalho atômica e isolada.
///
/// Contrato: `lock_event` serializa todas as transações que tocam o mesmo
/// evento até o commit (ou o drop, que desfaz tudo).
#[async_trait]
pub trait CheckinTransaction: Send {
    async fn lock_event(&mut self, event_id: Uuid) -> Result<Option<AlertEvent>, AppError>;

    async fn find_response(&mut self, user_id: Uuid, event_id: Uuid) -> Result<Option<Response>, AppError>;

    /// Violação de unicidade (user, evento) vira `AppError::DuplicateResponse`.
    async fn insert_response(&mut self, new_response: &NewResponse) -> Result<Response, AppError>;

    async fn count_members_in_area(&mut self, area_id: &str) -> Result<i64, AppError>;

    async fn count_responses(&mut self, event_id: Uuid) -> Result<i64, AppError>;

    /// Escrita condicional: só aplica se o evento ainda estiver ativo.
    /// Retorna `None` quando outro caminho já encerrou o evento.
    async fn complete_event(
        &mut self,
        event_id: Uuid,
        completion: &EventCompletion,
    ) -> Result<Option<AlertEvent>, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
