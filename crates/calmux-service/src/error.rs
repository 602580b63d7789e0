use thiserror::Error;

/// Service layer errors - the aggregation failure taxonomy
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    CoreError(#[from] calmux_core::error::CoreError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Upstream payload too large: {detail} (limit {limit} bytes)")]
    UpstreamTooLarge { limit: u64, detail: String },

    #[error("Upstream unavailable ({status:?}): {detail}")]
    UpstreamUnavailable {
        status: Option<u16>,
        detail: String,
    },

    #[error("Upstream calendar malformed: {0}")]
    UpstreamMalformed(#[from] calmux_ical::IcalError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
