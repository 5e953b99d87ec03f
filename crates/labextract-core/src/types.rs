//! Request-scoped data: uploads and lab results.

use std::io::Cursor;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A file received over HTTP. Lives only for the duration of one request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    /// Seekable view over the uploaded bytes.
    pub content: Cursor<Bytes>,
}

impl Upload {
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            content: Cursor::new(data.into()),
        }
    }

    /// The full uploaded payload, independent of the read position.
    pub fn bytes(&self) -> &Bytes {
        self.content.get_ref()
    }

    /// Lowercased extension including the dot, e.g. `.pdf`.
    pub fn extension(&self) -> Option<String> {
        let name = self.filename.to_lowercase();
        name.rfind('.').map(|pos| name[pos..].to_string())
    }
}

/// One extracted lab test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabResult {
    pub test_name: String,
    pub value: String,
}

/// Successful `/extract` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabResultsResponse {
    pub lab_results: Vec<LabResult>,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
