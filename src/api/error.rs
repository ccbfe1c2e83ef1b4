use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::application::AppError;
use crate::domain::ValidationErrors;

/// Seconds a client should wait before retrying after a storage failure.
const RETRY_AFTER_SECS: &str = "1";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("{message}")]
    Rejection { status: StatusCode, message: String },
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejection {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejection {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::App(AppError::MissingRequestId) => (
                StatusCode::BAD_REQUEST,
                AppError::MissingRequestId.to_string(),
                None,
            ),
            ApiError::App(AppError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid expense".to_string(),
                Some(errors),
            ),
            ApiError::App(AppError::TotalOverflow) => {
                warn!("Expense total overflowed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    AppError::TotalOverflow.to_string(),
                    None,
                )
            }
            ApiError::App(AppError::Storage(e)) => {
                error!(error = %format!("{:#}", e), "Storage failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage unavailable, retry the request".to_string(),
                    None,
                )
            }
            ApiError::Rejection { status, message } => (status, message, None),
        };

        let body = Json(ErrorBody {
            code: status.as_u16(),
            message,
            errors,
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(RETRY_AFTER_SECS),
            );
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
