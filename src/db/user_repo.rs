// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{common::error::AppError, models::auth::User};

// O repositório de usuários. O diretório é externo: aqui só existem leituras.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Membros de uma área (supervisores ficam fora da população)
    pub async fn list_members_in_area(&self, area_id: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE area_id = $1 AND role = 'MEMBER' ORDER BY name ASC",
        )
        .bind(area_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    // Contagem usada tanto nas leituras quanto dentro da transação de resposta
    pub async fn count_members_in_area<'e, E>(
        &self,
        executor: E,
        area_id: &str,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE area_id = $1 AND role = 'MEMBER'",
        )
        .bind(area_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }
}
