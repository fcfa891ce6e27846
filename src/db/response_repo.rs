// src/db/response_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::alert::{NewResponse, Response, ResponseCounts},
};

#[derive(Clone)]
pub struct ResponseRepository {
    pool: PgPool,
}

impl ResponseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Response>, AppError> {
        let responses = sqlx::query_as::<_, Response>(
            "SELECT * FROM responses WHERE event_id = $1 ORDER BY responded_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(responses)
    }

    pub async fn counts_for_event(&self, event_id: Uuid) -> Result<ResponseCounts, AppError> {
        let (ok, help) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'OK') AS ok,
                COUNT(*) FILTER (WHERE status = 'HELP') AS help
            FROM responses
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ResponseCounts { ok, help })
    }

    pub async fn list_for_user(&self, user_id: Uuid, event_ids: &[Uuid]) -> Result<Vec<Response>, AppError> {
        let responses = sqlx::query_as::<_, Response>(
            "SELECT * FROM responses WHERE user_id = $1 AND event_id = ANY($2)",
        )
        .bind(user_id)
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(responses)
    }

    // ---
    // Funções transacionais
    // ---

    pub async fn find_for_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Response>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let response = sqlx::query_as::<_, Response>(
            "SELECT * FROM responses WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(executor)
        .await?;
        Ok(response)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        new_response: &NewResponse,
    ) -> Result<Response, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Response>(
            r#"
            INSERT INTO responses (id, user_id, event_id, status, notes, responded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new_response.id)
        .bind(new_response.user_id)
        .bind(new_response.event_id)
        .bind(new_response.status)
        .bind(new_response.notes.as_deref())
        .bind(new_response.responded_at)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // A constraint única é a última barreira contra respostas duplicadas
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateResponse;
                }
            }
            e.into()
        })
    }

    pub async fn count_for_event<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM responses WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }
}
