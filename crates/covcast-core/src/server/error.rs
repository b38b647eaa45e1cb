//! HTTP error type and the mapping from service errors to status codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use covcast_models::CacheError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::forecast::ForecastError;
use crate::validation::InvalidParameter;

/// Errors returned by REST handlers.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more request parameters failed validation.
    #[error("Invalid request parameters")]
    Unprocessable(Vec<InvalidParameter>),

    /// The upstream dataset could not be fetched.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    invalid: Vec<InvalidParameter>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let error = self.to_string();
        let invalid = match self {
            Self::Unprocessable(params) => params,
            _ => Vec::new(),
        };
        let body = ErrorBody { error, status: status.as_u16(), invalid };

        (status, Json(body)).into_response()
    }
}

impl From<ForecastError> for HttpError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::ModelUnavailable(_) => Self::NotFound(err.to_string()),
            ForecastError::Cache(CacheError::NotFound(_)) => Self::NotFound(err.to_string()),
            ForecastError::DataSource(_) => Self::ServiceUnavailable(err.to_string()),
            ForecastError::Model(_) | ForecastError::Task(_) => Self::Internal(err.to_string()),
        }
    }
}
