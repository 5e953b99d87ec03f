//! LLM provider configuration and selection.

use labextract_core::EnvSource;
use serde::{Deserialize, Serialize};

use crate::types::{LLMProvider, ProviderSelection};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// LLM configuration, read from the environment at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// `auto`, `openai`, `anthropic` or `groq`.
    pub preferred_provider: String,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub anthropic_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub groq_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_model: String,
    pub groq_model: String,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub groq_base_url: String,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: "auto".into(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
            groq_model: DEFAULT_GROQ_MODEL.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.into(),
            groq_base_url: DEFAULT_GROQ_BASE_URL.into(),
        }
    }
}

impl LLMConfig {
    /// Load config from env vars, falling back to defaults.
    pub fn from_env(env: &EnvSource) -> Self {
        Self::from_lookup(|key| env.get(key))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let key = |name: &str| lookup(name).filter(|k| !k.is_empty());

        Self {
            preferred_provider: lookup("LLM_PROVIDER")
                .map(|p| p.to_lowercase())
                .unwrap_or(defaults.preferred_provider),
            openai_api_key: key("OPENAI_API_KEY"),
            anthropic_api_key: key("ANTHROPIC_API_KEY"),
            groq_api_key: key("GROQ_API_KEY"),
            openai_model: lookup("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            anthropic_model: lookup("ANTHROPIC_MODEL").unwrap_or(defaults.anthropic_model),
            groq_model: lookup("GROQ_MODEL").unwrap_or(defaults.groq_model),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            anthropic_base_url: lookup("ANTHROPIC_BASE_URL").unwrap_or(defaults.anthropic_base_url),
            groq_base_url: lookup("GROQ_BASE_URL").unwrap_or(defaults.groq_base_url),
        }
    }

    fn select(&self, provider: LLMProvider) -> Option<ProviderSelection> {
        let (key, model, base_url) = match provider {
            LLMProvider::OpenAI => (&self.openai_api_key, &self.openai_model, &self.openai_base_url),
            LLMProvider::Anthropic => (
                &self.anthropic_api_key,
                &self.anthropic_model,
                &self.anthropic_base_url,
            ),
            LLMProvider::Groq => (&self.groq_api_key, &self.groq_model, &self.groq_base_url),
        };
        key.as_ref().map(|k| ProviderSelection {
            provider,
            model: model.clone(),
            api_key: k.clone(),
            base_url: base_url.clone(),
        })
    }

    /// Resolve which provider and model to use.
    pub fn resolve_provider(&self) -> Option<ProviderSelection> {
        // Explicit preference
        if self.preferred_provider != "auto" {
            return match self.preferred_provider.as_str() {
                "openai" => self.select(LLMProvider::OpenAI),
                "anthropic" => self.select(LLMProvider::Anthropic),
                "groq" => self.select(LLMProvider::Groq),
                _ => None,
            };
        }

        // Auto mode: OpenAI > Anthropic > Groq
        [LLMProvider::OpenAI, LLMProvider::Anthropic, LLMProvider::Groq]
            .into_iter()
            .find_map(|p| self.select(p))
    }
}
