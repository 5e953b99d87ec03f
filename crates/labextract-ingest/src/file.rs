//! Upload routing by filename extension.

use labextract_core::config::IMAGE_EXTENSIONS;
use labextract_core::{Error, Result};

/// Which extraction path an upload takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Parsed by the hosted document parser.
    Pdf,
    /// Read by OCR.
    Image,
}

impl UploadKind {
    /// Detect the upload kind from a filename (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self> {
        let name = filename.to_lowercase();
        if name.ends_with(".pdf") {
            Ok(Self::Pdf)
        } else if IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(*ext)) {
            Ok(Self::Image)
        } else {
            Err(Error::UnsupportedType(
                "Only PDF or image files are supported.".into(),
            ))
        }
    }
}
