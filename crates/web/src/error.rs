use std::error::Error;

use http::StatusCode;
use thiserror::Error;

/// The error type handlers and middleware return.
///
/// The router never catches it; the server turns it into a response.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Failures while reading or decoding a request body.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("body exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to read body: {reason}")]
    Read { reason: String },

    #[error("body is not valid utf-8")]
    InvalidUtf8,

    #[error("invalid json body: {source}")]
    InvalidJson {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid form body: {source}")]
    InvalidForm {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("unsupported content type: expected {expected}")]
    UnsupportedMediaType { expected: &'static str },
}

impl BodyError {
    pub fn read<S: ToString>(str: S) -> Self {
        Self::Read { reason: str.to_string() }
    }

    /// The status a client should see when this error reaches the server.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Read { .. } | Self::InvalidUtf8 | Self::InvalidJson { .. } | Self::InvalidForm { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

/// A route pattern that can not be compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("pattern '{pattern}' must start with '/'")]
    MissingLeadingSlash { pattern: String },

    #[error("pattern '{pattern}' has an empty parameter name")]
    EmptyParamName { pattern: String },

    #[error("pattern '{pattern}' has an invalid parameter name '{name}'")]
    InvalidParamName { pattern: String, name: String },

    #[error("pattern '{pattern}' captures '{name}' more than once")]
    DuplicateParam { pattern: String, name: String },

    #[error("pattern '{pattern}' has a wildcard before its last segment")]
    WildcardNotLast { pattern: String },
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,

    #[error("address must be set")]
    MissingAddress,

    #[error("invalid address: {source}")]
    InvalidAddress {
        #[from]
        source: std::io::Error,
    },
}
