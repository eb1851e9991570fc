use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::cache::ResponseCache;
use crate::error::{OracleError, Result};
use crate::rate_limit::RateLimiter;
use crate::transport::{
    CompletionRequest, CompletionResponse, CompletionTransport, GenerationParams, TokenUsage,
};

/// Whether a request may be served from, and written to, the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Use,
    /// For requests whose answer depends on state outside the prompt
    /// (diff-driven rewrites, error fixes)
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,
    /// Bound on a single transport call
    pub timeout: Duration,
    /// Delay after failed attempt `n` is `base_delay * 2^n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(60),
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub from_cache: bool,
    /// Transport calls made; 0 for cache hits
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OracleStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub failures: u64,
    pub usage: TokenUsage,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    failures: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl Counters {
    fn record_usage(&self, usage: &TokenUsage) {
        self.prompt_tokens
            .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens
            .fetch_add(usage.total_tokens, Ordering::Relaxed);
    }
}

/// Cache lookup, admission control and retry around a [`CompletionTransport`].
///
/// [`Oracle::request`] always returns a `Result`; a failing request never
/// panics, so one bad file cannot abort a batch.
pub struct Oracle {
    transport: Arc<dyn CompletionTransport>,
    cache: Option<ResponseCache>,
    limiter: RateLimiter,
    policy: RetryPolicy,
    params: GenerationParams,
    counters: Counters,
}

impl Oracle {
    pub fn new(transport: Arc<dyn CompletionTransport>) -> Self {
        Self {
            transport,
            cache: None,
            limiter: RateLimiter::new(0),
            policy: RetryPolicy::default(),
            params: GenerationParams::default(),
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    pub fn stats(&self) -> OracleStats {
        let c = &self.counters;
        OracleStats {
            requests: c.requests.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            usage: TokenUsage {
                prompt_tokens: c.prompt_tokens.load(Ordering::Relaxed),
                completion_tokens: c.completion_tokens.load(Ordering::Relaxed),
                total_tokens: c.total_tokens.load(Ordering::Relaxed),
            },
        }
    }

    /// Send `prompt` with `context` prepended, consulting the cache first when
    /// `mode` allows it.
    pub async fn request(&self, prompt: &str, context: &str, mode: CacheMode) -> Result<Completion> {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        let cache = match mode {
            CacheMode::Use => self.cache.as_ref(),
            CacheMode::Bypass => None,
        };
        if let Some(cache) = cache {
            if let Some(text) = cache.get(prompt, context).await {
                debug!("served from cache");
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Completion {
                    text,
                    from_cache: true,
                    attempts: 0,
                });
            }
        }

        let request = CompletionRequest {
            prompt: prompt.to_string(),
            system_context: context.to_string(),
            params: self.params,
        };
        let (response, attempts) = match self.send_with_retry(&request).await {
            Ok(done) => done,
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!("completion request failed: {err}");
                return Err(err);
            }
        };

        if let Some(usage) = &response.usage {
            self.counters.record_usage(usage);
        }
        if let Some(cache) = cache {
            if let Err(err) = cache.set(prompt, context, &response.text).await {
                warn!("Failed to cache response: {err}");
            }
        }

        Ok(Completion {
            text: response.text,
            from_cache: false,
            attempts,
        })
    }

    async fn send_with_retry(&self, request: &CompletionRequest) -> Result<(CompletionResponse, u32)> {
        let max_attempts = self.policy.attempts();
        let mut last_error = OracleError::transport("no attempt made");

        for attempt in 1..=max_attempts {
            self.limiter.acquire().await;

            let outcome = match timeout(self.policy.timeout, self.transport.complete(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(OracleError::Timeout(self.policy.timeout)),
            };

            match outcome {
                Ok(response) if response.text.trim().is_empty() => {
                    return Err(OracleError::EmptyResponse);
                }
                Ok(response) => {
                    info!(
                        "{} answered on attempt {attempt}/{max_attempts}",
                        self.transport.name()
                    );
                    return Ok((response, attempt));
                }
                Err(err) if err.is_retryable() => {
                    warn!("attempt {attempt}/{max_attempts} failed: {err}");
                    last_error = err;
                    if attempt < max_attempts {
                        let delay = self.policy.backoff(attempt);
                        debug!("backing off for {}s", delay.as_secs_f64());
                        sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(OracleError::Exhausted {
            attempts: max_attempts,
            last: Box::new(last_error),
        })
    }
}
