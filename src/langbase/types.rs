use serde::{Deserialize, Serialize};

use crate::generation::extract_json_from_completion;
use crate::prompts::REASONING_STEP_PROMPT;

/// Message in a Langbase conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request to run a Langbase pipe
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    /// Pipe name (required by Langbase API)
    pub name: String,
    pub messages: Vec<Message>,
    /// Always false; steps are consumed whole
    pub stream: bool,
    /// Per-call completion cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl PipeRequest {
    /// Create a non-streaming request for `name`.
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
            max_tokens: None,
        }
    }

    /// Cap the completion length
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a Langbase pipe
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    pub success: bool,
    pub completion: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    pub raw: Option<RawResponse>,
}

/// Model details echoed by the pipe
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl PipeResponse {
    /// Completion tokens reported by the model, if any
    pub fn completion_tokens(&self) -> Option<u32> {
        self.raw
            .as_ref()
            .and_then(|raw| raw.usage.as_ref())
            .and_then(|usage| usage.completion_tokens)
    }
}

/// One generated reasoning step as returned by the step pipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResponse {
    pub step: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl StepResponse {
    /// Parse a step from pipe completion text.
    ///
    /// Accepts raw JSON or JSON inside a markdown code block; anything else
    /// is taken verbatim as the step with no confidence.
    pub fn from_completion(completion: &str) -> Self {
        if let Some(parsed) = extract_json_from_completion(completion)
            .ok()
            .and_then(|json| serde_json::from_str::<StepResponse>(json).ok())
        {
            return parsed;
        }

        Self {
            step: completion.trim().to_string(),
            confidence: None,
        }
    }
}

/// Definition of the step-generation pipe, sent to `POST /v1/pipes`.
///
/// Always upserts and always requests JSON output, so re-running setup
/// against an existing pipe updates it in place.
#[derive(Debug, Clone, Serialize)]
pub struct StepPipeDefinition {
    pub name: String,
    pub description: String,
    pub model: String,
    pub upsert: bool,
    pub json: bool,
    pub temperature: f64,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

impl StepPipeDefinition {
    /// Default model for step generation
    pub const DEFAULT_MODEL: &'static str = "openai:gpt-4o-mini";

    /// Completion cap baked into the pipe; per-call `max_tokens` may lower it.
    pub const DEFAULT_MAX_TOKENS: u32 = 400;

    /// Definition with the default model and the step system prompt.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "Generates one tutoring reasoning step per call".to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            upsert: true,
            json: true,
            temperature: 0.7,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            messages: vec![Message::system(REASONING_STEP_PROMPT)],
        }
    }

    /// Use a different model (`provider:model`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a different sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Response from creating a pipe
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePipeResponse {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
