//! Error types for the HTTP API.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cardscan_store::StoreError;
use serde::Serialize;
use tracing::error;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid JSON body")]
    InvalidJson(#[from] JsonRejection),

    #[error("Invalid query string")]
    InvalidQuery(#[from] QueryRejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidJson(_) | ApiError::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(StoreError::Configuration(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(err) if err.is_conflict() => StatusCode::CONFLICT,
            ApiError::Store(StoreError::Remote { .. } | StoreError::Transport(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Store(StoreError::Codec(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::InvalidJson(rejection) => Some(rejection.body_text()),
            ApiError::InvalidQuery(rejection) => Some(rejection.body_text()),
            ApiError::Store(StoreError::Remote { status, .. }) => {
                Some(format!("remote store responded with status {}", status))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
