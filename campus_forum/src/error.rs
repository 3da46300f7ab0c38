use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

pub type ForumResult<T> = Result<T, ForumError>;

#[derive(Debug, Error)]
pub enum ForumError {
    /// The primary target does not exist or is no longer available.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("caller is not allowed to {action}")]
    Unauthorized { action: &'static str },

    /// A uniqueness constraint fired that the engine did not pre-check.
    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),
}

impl ForumError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn unauthorized(action: &'static str) -> Self {
        Self::Unauthorized { action }
    }

    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<sqlx::Error> for ForumError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return Self::Conflict(db_err.message().to_string());
            }
        }
        Self::Storage(err)
    }
}

impl IntoResponse for ForumError {
    fn into_response(self) -> Response {
        let status = match &self {
            ForumError::NotFound { .. } => StatusCode::NOT_FOUND,
            ForumError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            ForumError::Conflict(_) => StatusCode::CONFLICT,
            ForumError::Validation(_) => StatusCode::BAD_REQUEST,
            ForumError::Storage(e) => {
                error!(error = %e, "Storage failure while handling request");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal storage error" })),
                )
                    .into_response();
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ForumError::not_found("thread", "t1"), StatusCode::NOT_FOUND),
            (ForumError::unauthorized("delete this post"), StatusCode::FORBIDDEN),
            (ForumError::Conflict("dup".into()), StatusCode::CONFLICT),
            (ForumError::validation("bad status"), StatusCode::BAD_REQUEST),
            (ForumError::Storage(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn non_database_errors_are_storage() {
        let err: ForumError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ForumError::Storage(_)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn not_found_message_names_target() {
        let err = ForumError::not_found("article", "a123");
        assert_eq!(err.to_string(), "article a123 not found");
    }
}
