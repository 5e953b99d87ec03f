//! Hosted document parsing (LlamaParse-compatible API).
//!
//! The service works in three steps: upload the file to create a job, poll
//! the job until it finishes, then download the markdown result.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use labextract_core::{Error, ParserSettings, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// One document returned by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub text: String,
}

/// Converts a document on disk into structured text.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, path: &Path, instruction: &str) -> Result<Vec<ParsedDocument>>;
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarkdownResponse {
    markdown: String,
}

/// Client for the LlamaParse REST API.
pub struct LlamaParseClient {
    client: Client,
    settings: ParserSettings,
}

impl LlamaParseClient {
    pub fn new(settings: ParserSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.settings
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("LLAMA_PARSE_API_KEY is not set".into()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn upload(&self, api_key: &str, path: &Path, instruction: &str) -> Result<String> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| Error::Parser(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("parsing_instruction", instruction.to_string());

        let response = self
            .client
            .post(self.url("/api/parsing/upload"))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Parser(format!("Upload failed: {}", e)))?;

        let job: JobResponse = read_json(response).await?;
        debug!("Created parsing job {} ({:?})", job.id, job.status);
        Ok(job.id)
    }

    async fn wait_for_job(&self, api_key: &str, job_id: &str) -> Result<()> {
        let interval = Duration::from_millis(self.settings.poll_interval_ms);
        loop {
            let response = self
                .client
                .get(self.url(&format!("/api/parsing/job/{}", job_id)))
                .bearer_auth(api_key)
                .send()
                .await
                .map_err(|e| Error::Parser(format!("Job status request failed: {}", e)))?;

            let job: JobResponse = read_json(response).await?;
            match job.status.as_deref() {
                Some("SUCCESS") => return Ok(()),
                Some(status @ ("ERROR" | "CANCELED" | "CANCELLED")) => {
                    return Err(Error::Parser(format!(
                        "Parsing job {} finished with status {}",
                        job_id, status
                    )));
                }
                other => {
                    debug!("Parsing job {} status {:?}", job_id, other);
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    async fn fetch_markdown(&self, api_key: &str, job_id: &str) -> Result<String> {
        let response = self
            .client
            .get(self.url(&format!("/api/parsing/job/{}/result/markdown", job_id)))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| Error::Parser(format!("Result request failed: {}", e)))?;

        let result: MarkdownResponse = read_json(response).await?;
        Ok(result.markdown)
    }
}

#[async_trait]
impl DocumentParser for LlamaParseClient {
    async fn parse(&self, path: &Path, instruction: &str) -> Result<Vec<ParsedDocument>> {
        let api_key = self.api_key()?;
        let timeout = Duration::from_secs(self.settings.timeout_secs);

        let run = async {
            let job_id = self.upload(api_key, path, instruction).await?;
            self.wait_for_job(api_key, &job_id).await?;
            self.fetch_markdown(api_key, &job_id).await
        };

        let markdown = tokio::time::timeout(timeout, run).await.map_err(|_| {
            Error::Parser(format!(
                "Parsing timed out after {} seconds",
                self.settings.timeout_secs
            ))
        })??;

        Ok(vec![ParsedDocument { text: markdown }])
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Parser(format!("API error {}: {}", status, body)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Parser(format!("Invalid response from parsing service: {}", e)))
}
