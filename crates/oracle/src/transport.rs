use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling parameters forwarded to the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 8000,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Prepended to the prompt; also part of the cache key
    pub system_context: String,
    pub params: GenerationParams,
}

impl CompletionRequest {
    /// Text actually sent to the service.
    pub fn full_prompt(&self) -> String {
        if self.system_context.is_empty() {
            self.prompt.clone()
        } else {
            format!("{}\n\n{}", self.system_context, self.prompt)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    /// Present when the service reports usage metadata
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// One round trip to a completion service. Retries, caching and admission
/// control live in [`crate::Oracle`], not here.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    fn name(&self) -> &str {
        "transport"
    }
}
