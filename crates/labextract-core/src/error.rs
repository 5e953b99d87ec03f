//! Error types for labextract.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    UnsupportedType(String),

    #[error("{0}")]
    InvalidUpload(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    InvalidDocument(String),

    #[error("Missing multipart field '{0}'")]
    MissingFile(String),

    #[error("Rate limit exceeded, retry later")]
    RateLimited,

    #[error("{0}")]
    Parser(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("{0}")]
    Llm(String),

    #[error("Internal Server Error, could not create tmp file.")]
    TempFile(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code this error maps to at the API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnsupportedType(_) | Self::InvalidUpload(_) | Self::InvalidDocument(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::MissingFile(_) => 422,
            Self::RateLimited => 429,
            _ => 500,
        }
    }

    /// Whether the caller is at fault. Client errors are never retried.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Whether the message is already classified and should reach the caller
    /// verbatim, without the generic server-error prefix.
    pub fn is_classified(&self) -> bool {
        self.is_client_error() || matches!(self, Self::Parser(_) | Self::TempFile(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
