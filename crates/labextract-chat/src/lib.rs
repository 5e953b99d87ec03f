//! Field extraction with external LLMs (OpenAI/Anthropic/Groq).
//!
//! Report text goes in, a JSON object with a `lab_results` list comes out.
//! LLM calls go to external APIs — no local model required.

pub mod config;
pub mod extract;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use extract::{FieldExtractor, LlmFieldExtractor, LAB_RESULTS_KEY};
pub use types::*;
