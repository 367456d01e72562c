//! Actix Web error adapters for mineserve errors.
//!
//! This module provides implementations of Actix Web error traits
//! for the mineserve error types, allowing them to be used in Actix Web handlers.

use crate::error::Error;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::ConfigParse(_)
        | Error::ConfigInvalid(_)
        | Error::InvalidCommand(_)
        | Error::Properties(_) => StatusCode::BAD_REQUEST,
        Error::DirectoryNotFound(_) | Error::MissingArtifact(_) => StatusCode::NOT_FOUND,
        Error::DirectoryUnbound | Error::ServerRunning | Error::NotRunning => StatusCode::CONFLICT,
        Error::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_error(status_code: StatusCode, message: String) -> HttpResponse {
    HttpResponse::build(status_code)
        .content_type("application/json")
        .json(json!({
            "error": message,
            "code": status_code.as_u16()
        }))
}

// Implement ResponseError for our Error type
impl ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        error_status(self)
    }
}

/// Errors raised by the gateway itself, before reaching the core.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Core(#[from] Error),
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) => e.status_code(),
        }
    }
}
