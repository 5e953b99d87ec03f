//! labextract ingest — upload validation, PDF processing, document parsing, OCR.

pub mod file;
#[cfg(any(test, feature = "test-util"))]
pub mod fixtures;
pub mod ocr;
pub mod parser;
pub mod pdf;
pub mod validate;

pub use file::UploadKind;
pub use ocr::{OcrEngine, TesseractOcr};
pub use parser::{DocumentParser, LlamaParseClient, ParsedDocument};
pub use pdf::PdfProcessor;
pub use validate::{ExtensionValidator, MimeValidator, SizeValidator, ValidationChain, Validator};

use labextract_core::config::{ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES};
use labextract_core::LabExtractConfig;

/// The validation chain applied to every `/extract` upload:
/// extension, then MIME type, then size.
pub fn default_chain(config: &LabExtractConfig) -> ValidationChain {
    ValidationChain::default()
        .with(ExtensionValidator::new(ALLOWED_EXTENSIONS.iter().copied()))
        .with(MimeValidator::new(ALLOWED_MIME_TYPES.iter().copied()))
        .with(SizeValidator::new(config.max_upload_mb))
}
