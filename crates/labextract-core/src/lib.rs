//! labextract core — configuration, errors, request types, known-test allow-list.

pub mod config;
pub mod error;
pub mod prompts;
pub mod types;

pub use config::{EnvSource, LabExtractConfig, OcrSettings, ParserSettings};
pub use error::{Error, Result};
pub use known_tests::{filter_known_tests, KnownTests};
pub use prompts::Prompts;
pub use types::{ErrorResponse, LabResult, LabResultsResponse, Upload};
