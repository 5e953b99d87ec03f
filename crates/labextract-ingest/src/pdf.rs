//! PDF processing: temporary storage, sanity checks, hosted parsing.
//!
//! Lifecycle: `new` persists the upload (Created), `validate` inspects the
//! file (Validating), `extract_text` calls the parser (Extracting) and
//! consumes the processor, which deletes the temporary file (Cleaned-up).
//! The file is owned by a `NamedTempFile`, so it is also removed when the
//! processor is dropped on an early return or unwind.

use std::io::Write;
use std::path::Path;

use labextract_core::{Error, Result, Upload};
use lopdf::Document;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::parser::DocumentParser;

/// Validates and extracts text from one uploaded PDF.
pub struct PdfProcessor {
    tmp_file: NamedTempFile,
}

impl PdfProcessor {
    /// Persist the upload to a uniquely named temporary file.
    pub async fn new(upload: &Upload) -> Result<Self> {
        Self::new_in(upload, &std::env::temp_dir()).await
    }

    /// Like [`PdfProcessor::new`], placing the temporary file in `dir`.
    pub async fn new_in(upload: &Upload, dir: &Path) -> Result<Self> {
        let data = upload.bytes().clone();
        let dir = dir.to_path_buf();
        let tmp_file = tokio::task::spawn_blocking(move || persist(&data, &dir))
            .await
            .map_err(|e| Error::Internal(format!("Temporary file task failed: {}", e)))??;

        debug!(
            "Stored upload {} at {}",
            upload.filename,
            tmp_file.path().display()
        );
        Ok(Self { tmp_file })
    }

    /// Location of the temporary copy.
    pub fn path(&self) -> &Path {
        self.tmp_file.path()
    }

    /// Check that the file is a readable, unencrypted PDF with extractable text.
    pub async fn validate(&self) -> Result<()> {
        let path = self.path().to_path_buf();
        tokio::task::spawn_blocking(move || inspect_pdf(&path))
            .await
            .map_err(|e| Error::Internal(format!("PDF validation task failed: {}", e)))?
    }

    /// Validate the file, then return the parser's markdown for it.
    ///
    /// Validation errors are returned unchanged. Parser failures are
    /// reported as [`Error::Parser`]. The temporary file is deleted before
    /// this returns, whatever the outcome.
    pub async fn extract_text(
        self,
        parser: &dyn DocumentParser,
        instruction: &str,
    ) -> Result<String> {
        let result = self.run_extraction(parser, instruction).await;
        self.cleanup();
        result
    }

    async fn run_extraction(&self, parser: &dyn DocumentParser, instruction: &str) -> Result<String> {
        self.validate().await?;

        let documents = parser
            .parse(self.path(), instruction)
            .await
            .map_err(|e| match e {
                Error::Parser(_) => e,
                other => Error::Parser(other.to_string()),
            })?;

        documents
            .into_iter()
            .next()
            .map(|doc| doc.text)
            .ok_or_else(|| Error::Parser("Parser returned no documents".into()))
    }

    fn cleanup(self) {
        let path = self.path().to_path_buf();
        if let Err(e) = self.tmp_file.close() {
            warn!("Failed to remove temporary file {}: {}", path.display(), e);
        }
    }
}

fn persist(data: &[u8], dir: &Path) -> Result<NamedTempFile> {
    let mut tmp_file = tempfile::Builder::new()
        .prefix("labextract-")
        .suffix(".pdf")
        .tempfile_in(dir)
        .map_err(Error::TempFile)?;
    tmp_file
        .write_all(data)
        .and_then(|_| tmp_file.flush())
        .map_err(Error::TempFile)?;
    Ok(tmp_file)
}

/// The three sanity checks, in order: parseable, not password-protected, has text.
fn inspect_pdf(path: &Path) -> Result<()> {
    let mut document =
        Document::load(path).map_err(|_| Error::InvalidDocument("File is malformed.".into()))?;

    // An owner-password-only document opens with an empty user password.
    if document.is_encrypted() && document.decrypt("").is_err() {
        return Err(Error::InvalidDocument(
            "File is encrypted. Cannot process encrypted files.".into(),
        ));
    }

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(Error::InvalidDocument("PDF file is empty.".into()));
    }

    let has_text = pages.iter().any(|page| {
        document
            .extract_text(&[*page])
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false)
    });
    if !has_text {
        return Err(Error::InvalidDocument(
            "PDF file does not contain any readable text.".into(),
        ));
    }

    Ok(())
}
