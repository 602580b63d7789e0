use thiserror::Error;

/// Errors raised while parsing a calendar payload.
#[derive(Error, Debug)]
pub enum IcalError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("payload contains no content lines")]
    Empty,

    #[error("no VCALENDAR envelope found at line {line}")]
    MissingEnvelope { line: usize },

    #[error("END:{found} at line {line} does not close {expected}")]
    MismatchedComponent {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("END without open component at line {line}")]
    UnexpectedEnd { line: usize },

    #[error("unterminated {component} component")]
    UnterminatedComponent { component: String },

    #[error("content after END:VCALENDAR at line {line}")]
    TrailingContent { line: usize },
}

pub type IcalResult<T> = std::result::Result<T, IcalError>;
