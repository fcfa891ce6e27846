// src/db/pg_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        store::{CheckinStore, CheckinTransaction},
        AlertRepository, ResponseRepository, UserRepository,
    },
    models::{
        alert::{AlertEvent, EventCompletion, NewResponse, Response, ResponseCounts},
        auth::User,
    },
    services::area_directory::AreaDirectory,
};

// Store durável: compõe os repositórios sobre a mesma pool
#[derive(Clone)]
pub struct PgCheckinStore {
    pool: PgPool,
    users: UserRepository,
    alerts: AlertRepository,
    responses: ResponseRepository,
}

impl PgCheckinStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            alerts: AlertRepository::new(pool.clone()),
            responses: ResponseRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CheckinStore for PgCheckinStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        self.users.find_by_id(user_id).await
    }

    async fn members_in_area(&self, area_id: &str) -> Result<Vec<User>, AppError> {
        self.users.list_members_in_area(area_id).await
    }

    async fn count_members_in_area(&self, area_id: &str) -> Result<i64, AppError> {
        self.users.count_members_in_area(&self.pool, area_id).await
    }

    async fn create_event(
        &self,
        area_id: &str,
        triggered_by_user_id: Option<Uuid>,
        triggered_at: DateTime<Utc>,
    ) -> Result<AlertEvent, AppError> {
        self.alerts.create_event(area_id, triggered_by_user_id, triggered_at).await
    }

    async fn find_event(&self, event_id: Uuid) -> Result<Option<AlertEvent>, AppError> {
        self.alerts.find_by_id(event_id).await
    }

    async fn active_events_in_area(&self, area_id: &str) -> Result<Vec<AlertEvent>, AppError> {
        self.alerts.list_active_in_area(area_id).await
    }

    async fn responses_for_event(&self, event_id: Uuid) -> Result<Vec<Response>, AppError> {
        self.responses.list_for_event(event_id).await
    }

    async fn response_counts(&self, event_id: Uuid) -> Result<ResponseCounts, AppError> {
        self.responses.counts_for_event(event_id).await
    }

    async fn responses_by_user(&self, user_id: Uuid, event_ids: &[Uuid]) -> Result<Vec<Response>, AppError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.responses.list_for_user(user_id, event_ids).await
    }

    async fn begin(&self) -> Result<Box<dyn CheckinTransaction>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCheckinTransaction {
            tx,
            users: self.users.clone(),
            alerts: self.alerts.clone(),
            responses: self.responses.clone(),
        }))
    }
}

#[async_trait]
impl AreaDirectory for PgCheckinStore {
    async fn is_known_area(&self, area_id: &str) -> Result<bool, AppError> {
        self.alerts.area_exists(area_id).await
    }
}

// Se a transação for descartada sem commit, o sqlx faz rollback automático (drop)
pub struct PgCheckinTransaction {
    tx: Transaction<'static, Postgres>,
    users: UserRepository,
    alerts: AlertRepository,
    responses: ResponseRepository,
}

#[async_trait]
impl CheckinTransaction for PgCheckinTransaction {
    async fn lock_event(&mut self, event_id: Uuid) -> Result<Option<AlertEvent>, AppError> {
        self.alerts.lock_for_update(&mut *self.tx, event_id).await
    }

    async fn find_response(&mut self, user_id: Uuid, event_id: Uuid) -> Result<Option<Response>, AppError> {
        self.responses.find_for_user(&mut *self.tx, user_id, event_id).await
    }

    async fn insert_response(&mut self, new_response: &NewResponse) -> Result<Response, AppError> {
        self.responses.insert(&mut *self.tx, new_response).await
    }

    async fn count_members_in_area(&mut self, area_id: &str) -> Result<i64, AppError> {
        self.users.count_members_in_area(&mut *self.tx, area_id).await
    }

    async fn count_responses(&mut self, event_id: Uuid) -> Result<i64, AppError> {
        self.responses.count_for_event(&mut *self.tx, event_id).await
    }

    async fn complete_event(
        &mut self,
        event_id: Uuid,
        completion: &EventCompletion,
    ) -> Result<Option<AlertEvent>, AppError> {
        self.alerts.mark_completed(&mut *self.tx, event_id, completion).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
