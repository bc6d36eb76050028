use axum::extract::rejection::BytesRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::types::api::ErrorResponse;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized { realm: String },
    #[error("not found")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("failed to read request body")]
    Body { source: BytesRejection },
    #[error("invalid paste id")]
    InvalidId,
    #[error("paste id already taken")]
    IdCollision,
    #[error("insufficient storage")]
    InsufficientStorage,
    #[error("id generation failed")]
    Randomness { source: rand::Error },
    #[error("rendering paste failed")]
    Render {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("IO error")]
    IO { source: std::io::Error },
}

impl ApiError {
    pub fn render(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        ApiError::Render {
            source: Box::new(source),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Body { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidId => StatusCode::BAD_REQUEST,
            ApiError::IdCollision => StatusCode::CONFLICT,
            ApiError::InsufficientStorage => StatusCode::INSUFFICIENT_STORAGE,
            ApiError::Randomness { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::IO { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Unauthorized { realm } = &self {
            let challenge = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
                .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
            return (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, challenge)],
                "401 Unauthorized\n",
            )
                .into_response();
        }

        let status_code = self.status_code();
        if status_code.is_server_error() {
            match &self {
                ApiError::Randomness { source } => error!("{self}: {source}"),
                ApiError::Render { source } => error!("{self}: {source}"),
                ApiError::IO { source } => error!("{self}: {source}"),
                _ => error!("{self}"),
            }
        }

        (
            status_code,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => ApiError::NotFound,
            std::io::ErrorKind::AlreadyExists => ApiError::IdCollision,
            std::io::ErrorKind::StorageFull => ApiError::InsufficientStorage,
            _ => ApiError::IO { source },
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(source: BytesRejection) -> Self {
        if source.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::Body { source }
        }
    }
}

impl From<rand::Error> for ApiError {
    fn from(source: rand::Error) -> Self {
        ApiError::Randomness { source }
    }
}

impl From<syntect::Error> for ApiError {
    fn from(source: syntect::Error) -> Self {
        ApiError::render(source)
    }
}

impl From<ansi_to_html::Error> for ApiError {
    fn from(source: ansi_to_html::Error) -> Self {
        ApiError::render(source)
    }
}
