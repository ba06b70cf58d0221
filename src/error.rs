use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::models::status::ApplicationStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid status transition from '{}' to '{to}'", display_status(.from))]
    InvalidTransition {
        from: Option<ApplicationStatus>,
        to: ApplicationStatus,
    },

    #[error("Offer with job title '{0}' already exists")]
    DuplicateOffer(String),

    #[error("Candidate '{email}' has already applied to offer #{offer_id}")]
    DuplicateApplication { offer_id: i64, email: String },

    /// Uniqueness violation reported by a repository, before the engine
    /// translates it into the entity-specific duplicate error.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_status(status: &Option<ApplicationStatus>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unset".to_string())
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            err @ Error::InvalidTransition { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            err @ (Error::DuplicateOffer(_)
            | Error::DuplicateApplication { .. }
            | Error::DuplicateKey(_)
            | Error::Conflict(_)) => (StatusCode::CONFLICT, err.to_string()),
            Error::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", err),
            ),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Error::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                Error::DuplicateKey(
                    db_err
                        .constraint()
                        .unwrap_or("unique constraint")
                        .to_string(),
                )
            }
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23503") => {
                Error::NotFound("Referenced resource not found".to_string())
            }
            other => Error::Database(other),
        }
    }
}
