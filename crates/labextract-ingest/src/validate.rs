//! Upload validators and the sequential validation chain.
//!
//! Each validator inspects an [`Upload`] and either accepts it or fails with
//! a client error. [`ValidationChain`] runs them in order and stops at the
//! first failure.

use std::io::{Seek, SeekFrom};

use labextract_core::{Error, Result, Upload};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A single check over an upload.
pub trait Validator: Send + Sync {
    /// Accept the upload or return the reason it is rejected.
    ///
    /// Takes `&mut` only so that stream-based checks can seek; the read
    /// position is restored before returning.
    fn validate(&self, upload: &mut Upload) -> Result<()>;
}

/// Filename must end with one of the allowed extensions (case-insensitive).
pub struct ExtensionValidator {
    allowed: Vec<String>,
}

impl ExtensionValidator {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|ext| ext.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Validator for ExtensionValidator {
    fn validate(&self, upload: &mut Upload) -> Result<()> {
        let filename = upload.filename.to_lowercase();
        if self.allowed.iter().any(|ext| filename.ends_with(ext.as_str())) {
            return Ok(());
        }
        Err(Error::InvalidUpload(format!(
            "Extension '{}' is not allowed",
            upload.filename
        )))
    }
}

/// Declared content type must be one of the allowed MIME types.
pub struct MimeValidator {
    allowed: Vec<String>,
}

impl MimeValidator {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for MimeValidator {
    fn validate(&self, upload: &mut Upload) -> Result<()> {
        match upload.content_type.as_deref() {
            Some(mime) if self.allowed.iter().any(|a| a == mime) => Ok(()),
            _ => Err(Error::InvalidUpload(format!(
                "MIME type must be one of {:?}",
                self.allowed
            ))),
        }
    }
}

/// Upload must be non-empty and no larger than the configured limit.
pub struct SizeValidator {
    max_bytes: u64,
}

impl SizeValidator {
    /// Limit expressed in MiB, fractional values allowed.
    pub fn new(max_mb: f64) -> Self {
        Self {
            max_bytes: (max_mb * BYTES_PER_MB) as u64,
        }
    }

    fn measure(upload: &mut Upload) -> Result<u64> {
        let stream = &mut upload.content;
        let original = stream.stream_position()?;
        let size = stream.seek(SeekFrom::End(0));
        // Restore even when measuring failed.
        stream.seek(SeekFrom::Start(original))?;
        Ok(size?)
    }
}

impl Validator for SizeValidator {
    fn validate(&self, upload: &mut Upload) -> Result<()> {
        let size = Self::measure(upload)?;

        if size > self.max_bytes {
            return Err(Error::PayloadTooLarge(format!(
                "File size is too large ({:.2} MB). File size must not exceed {} MB.",
                size as f64 / BYTES_PER_MB,
                self.max_bytes as f64 / BYTES_PER_MB
            )));
        }
        if size == 0 {
            return Err(Error::PayloadTooLarge("File must not be empty.".into()));
        }
        Ok(())
    }
}

/// Ordered list of validators; the first failure short-circuits.
#[derive(Default)]
pub struct ValidationChain {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationChain {
    /// Append a validator to the end of the chain.
    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Validator for ValidationChain {
    fn validate(&self, upload: &mut Upload) -> Result<()> {
        for validator in &self.validators {
            validator.validate(upload)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn upload(name: &str, mime: Option<&str>, data: Vec<u8>) -> Upload {
        Upload::new(name, mime.map(String::from), data)
    }

    #[test]
    fn test_extension_accepts_allowed() {
        let validator = ExtensionValidator::new(["pdf"]);
        assert!(validator.validate(&mut upload("test.pdf", None, b"Mock".to_vec())).is_ok());
        assert!(validator.validate(&mut upload("TEST.PDF", None, b"Mock".to_vec())).is_ok());
    }

    #[test]
    fn test_extension_rejects_others() {
        let validator = ExtensionValidator::new([".pdf", ".png"]);
        for name in ["test.txt", "pdf", "report.pdf.exe", "image.jpg"] {
            let err = validator
                .validate(&mut upload(name, None, b"Mock".to_vec()))
                .unwrap_err();
            assert_eq!(err.status_code(), 400, "{}", name);
            assert_eq!(err.to_string(), format!("Extension '{}' is not allowed", name));
        }
    }

    #[test]
    fn test_mime() {
        let validator = MimeValidator::new(["application/pdf"]);
        assert!(validator
            .validate(&mut upload("a.pdf", Some("application/pdf"), vec![1]))
            .is_ok());

        let err = validator
            .validate(&mut upload("a.pdf", Some("text/plain"), vec![1]))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = validator.validate(&mut upload("a.pdf", None, vec![1])).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_size_within_limit_restores_position() {
        let validator = SizeValidator::new(10.0);
        let mut up = upload("test.pdf", None, vec![b'0'; 1024 * 1024]);

        validator.validate(&mut up).unwrap();
        assert_eq!(up.content.position(), 0);

        let mut first = [0u8; 4];
        up.content.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"0000");
    }

    #[test]
    fn test_size_restores_non_zero_position() {
        let validator = SizeValidator::new(1.0);
        let mut up = upload("test.pdf", None, vec![7; 100]);
        up.content.set_position(42);

        validator.validate(&mut up).unwrap();
        assert_eq!(up.content.position(), 42);
    }

    #[test]
    fn test_size_too_large() {
        let validator = SizeValidator::new(0.5);
        let mut up = upload("test.pdf", None, vec![b'0'; 1024 * 1024]);

        let err = validator.validate(&mut up).unwrap_err();
        assert_eq!(err.status_code(), 413);
        assert_eq!(
            err.to_string(),
            "File size is too large (1.00 MB). File size must not exceed 0.5 MB."
        );
        assert_eq!(up.content.position(), 0);
    }

    #[test]
    fn test_size_exact_limit_is_accepted() {
        let validator = SizeValidator::new(1.0);
        let mut up = upload("test.png", None, vec![1; 1024 * 1024]);
        assert!(validator.validate(&mut up).is_ok());
    }

    #[test]
    fn test_size_empty() {
        let validator = SizeValidator::new(10.0);
        for name in ["empty.pdf", "empty.txt", "noext"] {
            let err = validator.validate(&mut upload(name, None, Vec::new())).unwrap_err();
            assert_eq!(err.status_code(), 413);
            assert_eq!(err.to_string(), "File must not be empty.");
        }
    }

    struct Counting(Arc<AtomicUsize>);

    impl Validator for Counting {
        fn validate(&self, _upload: &mut Upload) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_chain_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ValidationChain::default()
            .with(Counting(calls.clone()))
            .with(ExtensionValidator::new([".pdf"]))
            .with(Counting(calls.clone()));
        assert_eq!(chain.len(), 3);

        let err = chain
            .validate(&mut upload("notes.txt", Some("text/plain"), vec![1]))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        chain
            .validate(&mut upload("report.pdf", Some("application/pdf"), vec![1]))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_chain_reports_first_failure() {
        let chain = ValidationChain::default()
            .with(ExtensionValidator::new([".pdf"]))
            .with(SizeValidator::new(1.0));

        // Both checks would fail; only the extension error is reported.
        let err = chain.validate(&mut upload("empty.txt", None, Vec::new())).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
