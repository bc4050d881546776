use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Every failure a handler can report back to the caller.
///
/// Nothing is retried. Store failures are logged and reported generically,
/// everything else carries a message meant for the user.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal Server Error")]
    Store(#[from] sqlx::Error),

    #[error("Internal Server Error")]
    Internal(#[source] anyhow::Error),

    #[error("System settings have not been loaded yet, please try again")]
    SettingsNotLoaded,

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("No check-in found for today")]
    NoCheckIn,

    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("Already checked out today")]
    AlreadyCheckedOut,

    #[error("Request not found or already processed")]
    AlreadyDecided,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SettingsNotLoaded
            | AppError::LocationUnavailable(_)
            | AppError::NoCheckIn
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyCheckedIn
            | AppError::AlreadyCheckedOut
            | AppError::AlreadyDecided
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Store(e) => tracing::error!(error = %e, "Store operation failed"),
            AppError::Internal(e) => tracing::error!(error = %e, "Internal failure"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prerequisite_failures_are_client_errors() {
        assert_eq!(AppError::NoCheckIn.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::SettingsNotLoaded.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AlreadyCheckedIn.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn store_failures_hide_details() {
        let err = AppError::Store(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn no_check_in_message() {
        assert_eq!(AppError::NoCheckIn.to_string(), "No check-in found for today");
    }
}
