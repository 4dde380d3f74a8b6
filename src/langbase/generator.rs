use async_trait::async_trait;
use tracing::debug;

use super::client::LangbaseClient;
use super::types::{Message, PipeRequest, StepResponse};
use crate::error::{ProviderError, ProviderResult};
use crate::generation::{Generation, GenerationRequest, TextGenerator};

/// [`TextGenerator`] backed by a Langbase step pipe.
#[derive(Clone)]
pub struct LangbaseGenerator {
    client: LangbaseClient,
    pipe_name: String,
}

impl LangbaseGenerator {
    /// Create a generator that calls `pipe_name`.
    pub fn new(client: LangbaseClient, pipe_name: impl Into<String>) -> Self {
        Self {
            client,
            pipe_name: pipe_name.into(),
        }
    }

    /// Name of the pipe in use
    pub fn pipe_name(&self) -> &str {
        &self.pipe_name
    }
}

#[async_trait]
impl TextGenerator for LangbaseGenerator {
    async fn generate(&self, request: GenerationRequest) -> ProviderResult<Generation> {
        let pipe_request = PipeRequest::new(&self.pipe_name, vec![Message::user(request.prompt)])
            .with_max_tokens(request.max_tokens);

        let response = self.client.call_pipe(pipe_request).await?;
        let tokens_used = response.completion_tokens();
        let step = StepResponse::from_completion(&response.completion);

        if step.step.trim().is_empty() {
            return Err(ProviderError::EmptyContent);
        }

        debug!(
            pipe = %self.pipe_name,
            category = %request.category,
            confidence = ?step.confidence,
            tokens_used = ?tokens_used,
            "Generated reasoning step"
        );

        let mut generation = Generation::new(step.step);
        if let Some(confidence) = step.confidence {
            generation = generation.with_confidence(confidence);
        }
        if let Some(tokens) = tokens_used {
            generation = generation.with_tokens_used(tokens);
        }
        Ok(generation)
    }
}
