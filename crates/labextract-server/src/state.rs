//! Shared application state.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use labextract_chat::{FieldExtractor, LLMConfig, LlmFieldExtractor};
use labextract_core::{Error, KnownTests, LabExtractConfig, Prompts, Result};
use labextract_ingest::{
    default_chain, DocumentParser, LlamaParseClient, OcrEngine, TesseractOcr, ValidationChain,
};
use tracing::info;

/// Global limiter shared by every `/extract` caller.
pub type RequestLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: LabExtractConfig,
    pub prompts: Prompts,
    pub validators: ValidationChain,
    pub known_tests: KnownTests,
    pub parser: Arc<dyn DocumentParser>,
    pub ocr: Arc<dyn OcrEngine>,
    pub extractor: Arc<dyn FieldExtractor>,
    limiter: Option<RequestLimiter>,
}

impl AppState {
    pub fn new(
        config: LabExtractConfig,
        prompts: Prompts,
        known_tests: KnownTests,
        parser: Arc<dyn DocumentParser>,
        ocr: Arc<dyn OcrEngine>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Self {
        let validators = default_chain(&config);
        let limiter = NonZeroU32::new(config.rate_limit_per_minute)
            .map(|per_minute| RateLimiter::direct(Quota::per_minute(per_minute)));

        Self {
            config,
            prompts,
            validators,
            known_tests,
            parser,
            ocr,
            extractor,
            limiter,
        }
    }

    /// Build state with the real parsing, OCR and LLM clients.
    pub fn from_config(config: LabExtractConfig, llm_config: LLMConfig) -> Result<Self> {
        let prompts = Prompts::load(&config.prompts_dir)?;

        let known_tests = match &config.known_tests_file {
            Some(path) => KnownTests::builtin_with_file(path)?,
            None => KnownTests::builtin(),
        };
        info!("Known-test allow-list has {} entries", known_tests.len());

        match llm_config.resolve_provider() {
            Some(selection) => info!(
                "Field extraction via {} ({})",
                selection.provider, selection.model
            ),
            None => tracing::warn!("No LLM provider configured; /extract will fail"),
        }
        if config.parser.api_key.is_none() {
            tracing::warn!("LLAMA_PARSE_API_KEY is not set; PDF uploads will fail");
        }

        let parser = Arc::new(LlamaParseClient::new(config.parser.clone()));
        let ocr = Arc::new(TesseractOcr::new(config.ocr.clone()));
        let extractor = Arc::new(LlmFieldExtractor::new(llm_config, prompts.clone()));

        Ok(Self::new(config, prompts, known_tests, parser, ocr, extractor))
    }

    /// Admit one request, or fail if the quota is exhausted.
    pub fn check_rate_limit(&self) -> Result<()> {
        match &self.limiter {
            Some(limiter) => limiter.check().map_err(|_| Error::RateLimited),
            None => Ok(()),
        }
    }
}
