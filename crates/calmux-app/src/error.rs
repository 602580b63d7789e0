use salvo::http::StatusCode;
use thiserror::Error;

use calmux_core::error::CoreError;
use calmux_service::ServiceError;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    CoreError(#[from] CoreError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    /// HTTP status for this error, per the failure taxonomy.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(err) => match err {
                ServiceError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::UnsupportedSource(_) => StatusCode::NOT_IMPLEMENTED,
                ServiceError::UpstreamTooLarge { .. } => StatusCode::BAD_REQUEST,
                ServiceError::UpstreamUnavailable { .. } | ServiceError::UpstreamMalformed(_) => {
                    StatusCode::BAD_GATEWAY
                }
                ServiceError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::CoreError(core) => core_status(core),
            },
            Self::CoreError(core) => core_status(core),
        }
    }
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
        CoreError::InvalidConfiguration(_) | CoreError::InvariantViolation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Writes an error onto the response: status from the taxonomy, detail as
/// a plain-text body.
pub fn render_error(res: &mut salvo::Response, err: &AppError) {
    tracing::debug!(error = %err, status = %err.status_code(), "Request failed");
    res.status_code(err.status_code());
    res.render(err.to_string());
}
