//! Configuration read from the process environment and an optional `.env` file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Filename extensions accepted by `/extract` (lowercase, with the dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".jpg", ".jpeg", ".png", ".bmp", ".tiff"];

/// Image extensions routed to OCR.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".bmp", ".tiff"];

/// Declared content types accepted by `/extract`.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/bmp",
    "image/x-ms-bmp",
    "image/tiff",
];

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_MB: f64 = 10.0;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 10;
pub const DEFAULT_LLAMA_PARSE_BASE_URL: &str = "https://api.cloud.llamaindex.ai";

/// Settings for the hosted document-parsing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserSettings {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Upper bound on upload + polling + result download.
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_LLAMA_PARSE_BASE_URL.into(),
            timeout_secs: 180,
            poll_interval_ms: 1000,
        }
    }
}

/// Settings for the Tesseract OCR engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    pub command: PathBuf,
    pub language: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            command: PathBuf::from("tesseract"),
            language: "eng".into(),
        }
    }
}

/// Variable lookup over the process environment, falling back to values
/// from a `.env` file. The file never overrides a variable that is set.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    file_vars: HashMap<String, String>,
}

impl EnvSource {
    /// Find `.env` in the working directory or its parents. A missing or
    /// unreadable file leaves only the process environment.
    pub fn load() -> Self {
        match dotenvy::dotenv_iter() {
            Ok(iter) => match iter.collect::<std::result::Result<HashMap<_, _>, _>>() {
                Ok(file_vars) => {
                    info!("Loaded {} variables from .env", file_vars.len());
                    Self { file_vars }
                }
                Err(e) => {
                    warn!("Ignoring malformed .env file: {}", e);
                    Self::default()
                }
            },
            Err(e) if e.not_found() => {
                debug!("No .env file found, using the process environment only");
                Self::default()
            }
            Err(e) => {
                warn!("Failed to read .env file: {}", e);
                Self::default()
            }
        }
    }

    /// Read variables from a specific dotenv-format file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file_vars = dotenvy::from_path_iter(path)
            .and_then(|iter| iter.collect::<std::result::Result<HashMap<_, _>, _>>())
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self { file_vars })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.resolve(key, std::env::var(key).ok())
    }

    fn resolve(&self, key: &str, process: Option<String>) -> Option<String> {
        process.or_else(|| self.file_vars.get(key).cloned())
    }
}

/// Top-level labextract configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabExtractConfig {
    /// HTTP server port.
    pub port: u16,
    /// Maximum accepted upload size in MiB.
    pub max_upload_mb: f64,
    /// Requests admitted to `/extract` per minute across all clients. 0 disables limiting.
    pub rate_limit_per_minute: u32,
    /// Directory holding `field_extraction.txt` and `parsing_instruction.txt`.
    pub prompts_dir: PathBuf,
    /// Optional file of extra known test names, one per line.
    pub known_tests_file: Option<PathBuf>,
    pub parser: ParserSettings,
    pub ocr: OcrSettings,
}

impl Default for LabExtractConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            prompts_dir: PathBuf::from("prompts"),
            known_tests_file: None,
            parser: ParserSettings::default(),
            ocr: OcrSettings::default(),
        }
    }
}

impl LabExtractConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(env: &EnvSource) -> Result<Self> {
        Self::from_lookup(|key| env.get(key))
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let max_upload_mb = match lookup("MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|mb| mb.is_finite() && *mb > 0.0)
                .ok_or_else(|| {
                    Error::Config(format!("MAX_UPLOAD_MB must be a positive number, got '{}'", raw))
                })?,
            None => defaults.max_upload_mb,
        };

        let rate_limit_per_minute = lookup("RATE_LIMIT_PER_MINUTE")
            .and_then(|r| r.parse().ok())
            .unwrap_or(defaults.rate_limit_per_minute);

        let prompts_dir = lookup("PROMPTS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.prompts_dir);

        let known_tests_file = lookup("KNOWN_TESTS_FILE").map(PathBuf::from);

        let parser = ParserSettings {
            api_key: lookup("LLAMA_PARSE_API_KEY").filter(|k| !k.is_empty()),
            base_url: lookup("LLAMA_PARSE_BASE_URL").unwrap_or(defaults.parser.base_url),
            timeout_secs: lookup("LLAMA_PARSE_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.parser.timeout_secs),
            poll_interval_ms: defaults.parser.poll_interval_ms,
        };

        let ocr = OcrSettings {
            command: lookup("TESSERACT_CMD")
                .map(PathBuf::from)
                .unwrap_or(defaults.ocr.command),
            language: lookup("TESSERACT_LANG").unwrap_or(defaults.ocr.language),
        };

        Ok(Self {
            port,
            max_upload_mb,
            rate_limit_per_minute,
            prompts_dir,
            known_tests_file,
            parser,
            ocr,
        })
    }

    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        (self.max_upload_mb * 1024.0 * 1024.0) as u64
    }
}
