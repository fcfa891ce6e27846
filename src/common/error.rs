// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// Categoria estável do erro, exposta no corpo da resposta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Forbidden,
    Unauthorized,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("One or more fields are invalid")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unknown area '{0}'")]
    UnknownArea(String),

    #[error("Alert event not found")]
    EventNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("You already responded to this event")]
    DuplicateResponse,

    #[error("This event is already completed")]
    EventAlreadyCompleted,

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid or missing authentication token")]
    InvalidToken,

    #[error("Upstream collaborator failed: {0}")]
    Upstream(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` carrega o contexto de falhas inesperadas.
    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) | AppError::UnknownArea(_) => {
                ErrorKind::Validation
            }
            AppError::EventNotFound | AppError::UserNotFound => ErrorKind::NotFound,
            AppError::DuplicateResponse | AppError::EventAlreadyCompleted => ErrorKind::Conflict,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::InvalidToken | AppError::JwtError(_) => ErrorKind::Unauthorized,
            AppError::Upstream(_) => ErrorKind::Upstream,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        let body = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": kind.as_str(),
                    "message": self.to_string(),
                    "details": details,
                })
            }
            // Erros internos: o detalhe vai para o log, nunca para o cliente.
            e if kind == ErrorKind::Internal => {
                tracing::error!("Internal server error: {:?}", e);
                json!({
                    "error": kind.as_str(),
                    "message": "An unexpected error occurred.",
                })
            }
            e => json!({
                "error": kind.as_str(),
                "message": e.to_string(),
            }),
        };

        (kind.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_response_reads_as_already_responded() {
        let err = AppError::DuplicateResponse;
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "You already responded to this event");
    }

    #[test]
    fn kinds_map_to_http_status() {
        assert_eq!(AppError::EventNotFound.kind().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::forbidden("no").kind().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::UnknownArea("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(AppError::Upstream("push".into()).kind().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).kind().as_str(),
            "internal"
        );
    }
}
