use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Env error: {0}")]
    EnvError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    // Unique violations on `constraint` surface as Conflict, everything else
    // stays a database error
    pub fn from_write(err: sqlx::Error, constraint: &str, conflict: &str, context: &str) -> Self {
        let violated = err.as_database_error().and_then(|d| d.constraint());
        Self::classify_write(violated, constraint, conflict, || format!("{}: {}", context, err))
    }

    fn classify_write(
        violated: Option<&str>,
        constraint: &str,
        conflict: &str,
        describe: impl FnOnce() -> String,
    ) -> Self {
        if violated == Some(constraint) {
            AppError::Conflict(conflict.to_string())
        } else {
            AppError::DatabaseError(describe())
        }
    }

    pub fn to_response(&self) -> (StatusCode, String) {
        match self {
            AppError::JwtError(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::EnvError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            // Query text can leak schema details, keep it in the logs only
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database operation failed".into(),
            ),
            AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected server error".into(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        }
    }
}
