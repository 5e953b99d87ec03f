//! Lab-report extraction routes: welcome, health, extract.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use labextract_chat::LAB_RESULTS_KEY;
use labextract_core::{filter_known_tests, Error, Upload};
use labextract_ingest::{PdfProcessor, UploadKind, Validator};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the report.
const FILE_FIELD: &str = "file";

const WELCOME_MESSAGE: &str =
    "Welcome to the Lab Results extraction API. POST a PDF or image to /extract.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/extract", post(extract))
}

/// GET / — welcome message.
async fn root() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

/// GET /health — liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /extract — validate the upload, pull its text, extract lab results.
async fn extract(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    state.check_rate_limit()?;

    let mut multipart = multipart.map_err(|rejection| {
        debug!("Request is not multipart: {}", rejection.body_text());
        Error::MissingFile(FILE_FIELD.into())
    })?;
    let mut upload = read_upload(&mut multipart).await?;
    info!(
        "Received {} ({} bytes, {})",
        upload.filename,
        upload.bytes().len(),
        upload.content_type.as_deref().unwrap_or("no content type")
    );

    state.validators.validate(&mut upload)?;

    let text = match UploadKind::from_filename(&upload.filename)? {
        UploadKind::Pdf => {
            PdfProcessor::new(&upload)
                .await?
                .extract_text(state.parser.as_ref(), &state.prompts.parsing_instruction)
                .await?
        }
        UploadKind::Image => state.ocr.image_to_string(upload.bytes()).await?,
    };
    debug!("Extracted {} chars from {}", text.len(), upload.filename);

    let mut fields = state.extractor.get_fields(&text).await?;
    if let Some(Value::Array(entries)) = fields.get_mut(LAB_RESULTS_KEY) {
        let returned = entries.len();
        *entries = filter_known_tests(std::mem::take(entries), &state.known_tests);
        info!(
            "Kept {} of {} lab results from {}",
            entries.len(),
            returned,
            upload.filename
        );
    }

    Ok(Json(Value::Object(fields)))
}

/// Read the `file` field into memory. Other fields are skipped.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            break;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        return Ok(Upload::new(filename, content_type, data));
    }
    Err(Error::MissingFile(FILE_FIELD.into()).into())
}
