// src/db/alert_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::alert::{AlertEvent, EventCompletion},
};

#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura"
    // ---

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AlertEvent>, AppError> {
        let event = sqlx::query_as::<_, AlertEvent>("SELECT * FROM alert_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    pub async fn list_active_in_area(&self, area_id: &str) -> Result<Vec<AlertEvent>, AppError> {
        let events = sqlx::query_as::<_, AlertEvent>(
            r#"
            SELECT * FROM alert_events
            WHERE area_id = $1 AND completed_at IS NULL
            ORDER BY triggered_at ASC
            "#,
        )
        .bind(area_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn area_exists(&self, area_id: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM areas WHERE id = $1)")
            .bind(area_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    // ---
    // Funções de "Escrita"
    // ---

    /// Cria o evento já ativo (completed_at nulo).
    pub async fn create_event(
        &self,
        area_id: &str,
        triggered_by_user_id: Option<Uuid>,
        triggered_at: DateTime<Utc>,
    ) -> Result<AlertEvent, AppError> {
        let event = sqlx::query_as::<_, AlertEvent>(
            r#"
            INSERT INTO alert_events (id, area_id, triggered_at, triggered_by_user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(area_id)
        .bind(triggered_at)
        .bind(triggered_by_user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    /// Trava a linha do evento até o fim da transação.
    pub async fn lock_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<AlertEvent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let event = sqlx::query_as::<_, AlertEvent>(
            "SELECT * FROM alert_events WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(event)
    }

    // Só um escritor vence: a condição `completed_at IS NULL` garante isso
    pub async fn mark_completed<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        completion: &EventCompletion,
    ) -> Result<Option<AlertEvent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let event = sqlx::query_as::<_, AlertEvent>(
            r#"
            UPDATE alert_events
            SET completed_at = $2, completed_by_user_id = $3, completion_reason = $4
            WHERE id = $1 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(completion.completed_at)
        .bind(completion.completed_by_user_id)
        .bind(&completion.reason)
        .fetch_optional(executor)
        .await?;
        Ok(event)
    }
}
