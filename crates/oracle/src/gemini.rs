//! Live transport for the Gemini `generateContent` endpoint.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};
use crate::transport::{CompletionRequest, CompletionResponse, CompletionTransport, TokenUsage};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiTransport {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [PartOut<'a>; 1],
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl CompletionTransport for GeminiTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let prompt = request.full_prompt();
        let params = request.params;
        let body = GenerateRequest {
            contents: [Content {
                parts: [PartOut { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
                top_p: params.top_p,
                top_k: params.top_k,
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("X-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| OracleError::transport(format!("request failed: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| OracleError::transport(format!("failed to read response: {err}")))?;
        debug!("{} answered {status} ({} bytes)", self.model, text.len());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }
        if status.is_server_error() {
            return Err(OracleError::transport(format!("server error {status}")));
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(OracleError::rejected(status.as_u16(), message));
        }

        parse_generate_response(&text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn parse_generate_response(body: &str) -> Result<CompletionResponse> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|err| OracleError::transport(format!("malformed response body: {err}")))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }

    let usage = parsed.usage_metadata.map(|usage| TokenUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    });
    Ok(CompletionResponse { text, usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn url_joins_endpoint_and_model() {
        let transport = GeminiTransport::new("k", "gemini-x").with_endpoint("http://localhost:9/v1/");
        assert_eq!(transport.url(), "http://localhost:9/v1/gemini-x:generateContent");
    }

    #[test]
    fn parses_text_and_usage() {
        let body = r#"{
            "candidates": [{"content": {"parts": [{"text": "def f():"}, {"text": "\n    pass"}]}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
        }"#;
        let response = parse_generate_response(body).unwrap();

        assert_eq!(response.text, "def f():\n    pass");
        assert_eq!(
            response.usage,
            Some(TokenUsage {
                prompt_tokens: 12,
                completion_tokens: 5,
                total_tokens: 17
            })
        );
    }

    #[test]
    fn no_candidates_is_empty_response() {
        assert!(matches!(
            parse_generate_response(r#"{"candidates": []}"#),
            Err(OracleError::EmptyResponse)
        ));
        assert!(matches!(
            parse_generate_response("{}"),
            Err(OracleError::EmptyResponse)
        ));
    }

    #[test]
    fn request_body_uses_camel_case() {
        let body = GenerateRequest {
            contents: [Content {
                parts: [PartOut { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 10,
                top_p: 0.9,
                top_k: 4,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 10);
        assert_eq!(json["generationConfig"]["topK"], 4);
    }
}
