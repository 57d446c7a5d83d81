use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Response, Scribe};
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// A single rejected input field, reported in the `details` array of
/// validation error responses.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness conflicts (duplicate slug). Reported as 400, not 409,
    /// matching the original API contract.
    #[error("{0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("AI request failed: {0}")]
    Ai(String),

    #[error("AI response could not be parsed: {0}")]
    AiParse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    /// Validation failure with a single offending field.
    pub fn invalid(field: &str, message: &str) -> Self {
        AppError::Validation {
            message: "invalid request data".to_string(),
            details: vec![FieldError::new(field, message)],
        }
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        AppError::Validation {
            message: "invalid request data".to_string(),
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl Scribe for AppError {
    fn render(self, res: &mut Response) {
        let status = self.status();
        let details = match &self {
            AppError::Validation { details, .. } => Some(details.clone()),
            _ => None,
        };
        res.status_code(status);
        res.render(Json(ErrorBody {
            success: false,
            error: self.to_string(),
            details,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_error_taxonomy() {
        assert_eq!(
            AppError::invalid("title", "required").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("slug taken".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("post not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Ai("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
