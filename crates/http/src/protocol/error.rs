use std::io;
use thiserror::Error;

/// Why serving a connection failed.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to read request: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("failed to write response: {source}")]
    Send {
        #[from]
        source: SendError,
    },
}

/// Failures while reading a request off the wire.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("request head is {current_size} bytes, more than the {max_size} allowed")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("request has more than {max_num} headers")]
    TooManyHeaders { max_num: usize },

    #[error("malformed header: {reason}")]
    InvalidHeader { reason: String },

    #[error("unsupported http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("malformed request method")]
    InvalidMethod,

    #[error("malformed request target")]
    InvalidUri,

    #[error("malformed content-length: {reason}")]
    InvalidContentLength { reason: String },

    #[error("transfer-encoding is not supported, only content-length framed bodies are")]
    UnsupportedTransferEncoding,

    #[error("a request head arrived while the previous body was still being read")]
    UnexpectedHead,

    #[error("payload arrived before any request head")]
    MissingHead,

    #[error("body ended {missing} bytes short of its declared {declared}")]
    IncompleteBody { declared: u64, missing: u64 },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Failures while writing a response.
#[derive(Error, Debug)]
pub enum SendError {
    /// The response body failed or disagreed with the length announced in the head.
    #[error("invalid response body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
