// src/services/auth.rs

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CheckinStore,
    models::auth::{Claims, User},
};

// Identidade: valida o token e resolve o usuário no diretório.
// A emissão de credenciais é de outro sistema; `create_token` existe para operação e testes.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn CheckinStore>,
    jwt_secret: String,
}

impl TokenService {
    pub fn new(store: Arc<dyn CheckinStore>, jwt_secret: String) -> Self {
        Self { store, jwt_secret }
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.store
            .find_user(token_data.claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
