//! # Scribe Oracle
//!
//! Everything between a prompt and usable file records:
//!
//! - [`Oracle`]: cache lookup, rate limiting and retry with exponential backoff
//! - [`ResponseCache`]: content-addressed TTL cache persisted under `.scribe/cache`
//! - [`RateLimiter`]: sliding 60 second admission window
//! - [`ResponseExtractor`]: splits a reply into [`scribe_protocol::GeneratedFile`]s
//! - [`CompletionTransport`]: the seam to the service, with [`GeminiTransport`]
//!   as the live implementation

mod cache;
mod error;
mod extract;
mod gemini;
mod orchestrator;
mod rate_limit;
mod transport;

pub use cache::{CacheStats, ResponseCache, CACHE_SCHEMA_VERSION, DEFAULT_CACHE_TTL};
pub use error::{OracleError, Result};
pub use extract::{ResponseExtractor, DEFAULT_OUTPUT_PATH, FILE_SENTINEL};
pub use gemini::{GeminiTransport, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use orchestrator::{CacheMode, Completion, Oracle, OracleStats, RetryPolicy};
pub use rate_limit::{RateLimiter, RATE_WINDOW};
pub use transport::{
    CompletionRequest, CompletionResponse, CompletionTransport, GenerationParams, TokenUsage,
};
