use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// A required field of an inbound message is absent or unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    #[error("field `{0}` must not be empty")]
    Empty(&'static str),

    #[error("field `{field}` is not a valid identifier: {value:?}")]
    Malformed { field: &'static str, value: String },

    /// The request body could not be read as a message at all.
    #[error("unreadable request body: {0}")]
    Body(String),
}

impl ValidationError {
    /// Wire name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing(field) | ValidationError::Empty(field) => field,
            ValidationError::Malformed { field, .. } => field,
            ValidationError::Body(_) => "body",
        }
    }
}

/// The message store rejected a read or a write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("timestamp formatting error: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("corrupt row {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            // 400 senza body: il client sa già cosa ha mandato
            RelayError::Validation(e) => {
                tracing::debug!(field = e.field(), error = %e, "rejected chat message");
                StatusCode::BAD_REQUEST.into_response()
            }
            RelayError::Persistence(e) => {
                tracing::error!(error = %e, "message store failure");
                let body = todochat_core::Error::new("internal_error", "message store unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
