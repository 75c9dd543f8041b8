use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use camara_gateway::auth::AuthError;
use camara_gateway::emitter::EmitError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Token inválido ou expirado")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Erro interno do servidor")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Directory(inner) => Self::Internal(inner),
            e if e.is_forbidden() => Self::Forbidden("Acesso negado"),
            _ => Self::Unauthorized,
        }
    }
}

impl From<EmitError> for ApiError {
    fn from(e: EmitError) -> Self {
        match e {
            EmitError::PautaNotFound(_) => Self::NotFound("Pauta não encontrada"),
            EmitError::SpeakerNotFound(_) => Self::NotFound("Orador não encontrado"),
            EmitError::Store(inner) => Self::Internal(inner),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(e) => {
                error!("internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
