//! Optical character recognition for image uploads.
//!
//! The default engine shells out to the `tesseract` binary. Images are
//! decoded first so that unreadable uploads fail before a process is spawned,
//! then normalised to PNG for the engine.

use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use image::ImageFormat;
use labextract_core::{Error, OcrSettings, Result};
use tokio::process::Command;
use tracing::debug;

/// Reads the text out of an in-memory image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn image_to_string(&self, image: &[u8]) -> Result<String>;
}

/// OCR through the Tesseract command-line tool.
pub struct TesseractOcr {
    settings: OcrSettings,
}

impl TesseractOcr {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }
}

/// Decode any supported image format and re-encode it as PNG.
fn normalise_to_png(data: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data)
        .map_err(|e| Error::Ocr(format!("cannot identify image file: {}", e)))?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::Ocr(format!("cannot re-encode image: {}", e)))?;
    Ok(png)
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn image_to_string(&self, image: &[u8]) -> Result<String> {
        let data = image.to_vec();
        let png = tokio::task::spawn_blocking(move || normalise_to_png(&data))
            .await
            .map_err(|e| Error::Internal(format!("image decoding task failed: {}", e)))??;

        let input = tempfile::Builder::new()
            .prefix("labextract-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(Error::TempFile)?;
        tokio::fs::write(input.path(), &png).await?;

        debug!(
            "Running {} on {} ({} bytes)",
            self.settings.command.display(),
            input.path().display(),
            png.len()
        );

        let output = Command::new(&self.settings.command)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.settings.language)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::Ocr(format!(
                    "failed to run {}: {}",
                    self.settings.command.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "{} exited with {}: {}",
                self.settings.command.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    fn engine(command: &str) -> TesseractOcr {
        TesseractOcr::new(OcrSettings {
            command: PathBuf::from(command),
            language: "eng".into(),
        })
    }

    #[test]
    fn test_normalise_png() {
        let png = normalise_to_png(&png_bytes()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[tokio::test]
    async fn test_rejects_non_image() {
        let err = engine("tesseract")
            .image_to_string(b"definitely not an image")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
        assert!(err.to_string().contains("cannot identify image file"));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let err = engine("/nonexistent/labextract/tesseract")
            .image_to_string(&png_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_passes_arguments_and_returns_stdout() {
        // `echo` prints its arguments, standing in for the engine.
        let text = engine("echo").image_to_string(&png_bytes()).await.unwrap();
        assert!(text.trim_end().ends_with(".png stdout -l eng"), "{}", text);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit() {
        let err = engine("false").image_to_string(&png_bytes()).await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
