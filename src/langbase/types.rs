use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::PricingConfig;
use crate::error::{LangbaseError, LangbaseResult};

/// Model installed on pipes provisioned at startup.
pub const DEFAULT_PIPE_MODEL: &str = "openai:gpt-4o-mini";

const DEFAULT_PIPE_TEMPERATURE: f64 = 0.7;
const DEFAULT_PIPE_MAX_TOKENS: u32 = 3000;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

/// One message of a pipe conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /v1/pipes/run`.
///
/// Sampling options travel as string `variables`, which the pipe templates
/// read by name.
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    pub name: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, String>,
}

impl PipeRequest {
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
            variables: HashMap::new(),
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Raw body of a pipe run response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PipeResponse {
    pub(crate) success: bool,
    pub(crate) completion: String,
    #[serde(rename = "threadId", default)]
    pub(crate) thread_id: Option<String>,
    #[serde(default)]
    pub(crate) raw: Option<RawResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawResponse {
    #[serde(default)]
    pub(crate) model: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub(crate) prompt_tokens: Option<u32>,
    #[serde(default)]
    pub(crate) completion_tokens: Option<u32>,
}

impl PipeResponse {
    /// Validate the envelope and keep what the engine consumes.
    pub(crate) fn into_run(self, pipe: &str) -> LangbaseResult<PipeRun> {
        if !self.success {
            return Err(LangbaseError::InvalidResponse {
                message: format!("pipe {} reported an unsuccessful run", pipe),
            });
        }

        let (model, usage) = match self.raw {
            Some(raw) => (raw.model, raw.usage.map(TokenUsage::from).unwrap_or_default()),
            None => (None, TokenUsage::default()),
        };

        Ok(PipeRun {
            completion: self.completion,
            thread_id: self.thread_id,
            model,
            usage,
        })
    }
}

/// A completed pipe run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeRun {
    pub completion: String,
    pub thread_id: Option<String>,
    pub model: Option<String>,
    pub usage: TokenUsage,
}

/// Tokens billed for one run; zero when the pipe did not report usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// USD cost at the configured per-million-token prices.
    pub fn cost(&self, pricing: &PricingConfig) -> f64 {
        (f64::from(self.prompt_tokens) * pricing.input_per_mtok
            + f64::from(self.completion_tokens) * pricing.output_per_mtok)
            / 1_000_000.0
    }
}

impl From<WireUsage> for TokenUsage {
    fn from(usage: WireUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens.unwrap_or(0),
            completion_tokens: usage.completion_tokens.unwrap_or(0),
        }
    }
}

/// Body of `POST /v1/pipes`: an upserted pipe with one system prompt.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePipeRequest {
    pub name: String,
    pub description: String,
    pub model: String,
    pub upsert: bool,
    pub temperature: f64,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

impl CreatePipeRequest {
    /// Pipe definition on [`DEFAULT_PIPE_MODEL`] that replaces any existing one.
    pub fn upsert(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            model: DEFAULT_PIPE_MODEL.to_string(),
            upsert: true,
            temperature: DEFAULT_PIPE_TEMPERATURE,
            max_tokens: DEFAULT_PIPE_MAX_TOKENS,
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// What the API reports about a created pipe.
#[derive(Debug, Clone, Deserialize)]
pub struct PipeSummary {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}
