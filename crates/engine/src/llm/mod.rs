//! Text-only chat client behind the LLM-backed oracles.

mod anthropic;
mod openai;
pub mod types;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use paperverify_common::config::{LlmRoleConfig, RetryConfig};

pub use types::{LlmResponse, Message, Role, StopReason, TokenUsage};

/// Errors from LLM API calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM HTTP error: {0}")]
    Http(String),

    #[error("LLM auth error: {0}")]
    Auth(String),

    #[error("LLM rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("LLM context window exceeded: {0}")]
    ContextWindowExceeded(String),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("LLM response parse error: {0}")]
    Parse(String),
}

impl From<LlmError> for paperverify_common::PaperVerifyError {
    fn from(e: LlmError) -> Self {
        paperverify_common::PaperVerifyError::Oracle(e.to_string())
    }
}

/// Chat providers the client can talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "anthropic" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

/// Retry schedule for one `chat` call.
struct Backoff<'a> {
    policy: &'a RetryConfig,
    attempt: u32,
    next_ms: u64,
}

impl<'a> Backoff<'a> {
    fn new(policy: &'a RetryConfig) -> Self {
        Self {
            policy,
            attempt: 0,
            next_ms: policy.initial_backoff_ms,
        }
    }

    /// How long to wait before retrying after `error`, or `None` to give up.
    fn after(&mut self, error: &LlmError) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.policy.max_attempts {
            return None;
        }

        let wait_ms = match error {
            LlmError::Auth(_) | LlmError::ContextWindowExceeded(_) => return None,
            LlmError::RateLimited {
                retry_after: Some(secs),
            } => secs * 1000,
            LlmError::RateLimited { retry_after: None } => self.next_ms,
            _ => {
                let base = self.next_ms;
                let grown = (base as f64 * self.policy.backoff_multiplier) as u64;
                self.next_ms = grown.min(self.policy.max_backoff_ms);
                if self.policy.jitter {
                    base + jitter_ms(base / 2)
                } else {
                    base
                }
            }
        };

        Some(Duration::from_millis(wait_ms))
    }
}

/// Pseudo-random delay in `[0, max]`, seeded from the clock.
fn jitter_ms(max: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or_default();
    nanos % (max + 1)
}

/// LLM API client for one configured role.
pub struct LlmClient {
    http: reqwest::Client,
    provider: Provider,
    role: LlmRoleConfig,
    retry: RetryConfig,
    api_key: String,
}

impl LlmClient {
    /// Build a client for `role`, reading the provider's API key from the
    /// environment. `None` when the provider is unknown or the key is unset.
    pub fn new(role: LlmRoleConfig, retry: RetryConfig) -> Option<Self> {
        let Some(provider) = Provider::from_name(&role.provider) else {
            tracing::warn!(provider = role.provider.as_str(), "Unknown LLM provider");
            return None;
        };

        let api_key = std::env::var(provider.key_var())
            .ok()
            .filter(|key| !key.is_empty());
        let Some(api_key) = api_key else {
            tracing::warn!(
                env_var = provider.key_var(),
                model = role.model.as_str(),
                "API key not set, LLM role disabled"
            );
            return None;
        };

        Some(Self {
            http: reqwest::Client::new(),
            provider,
            role,
            retry,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.role.model
    }

    /// Send one chat turn, retrying transient failures.
    ///
    /// `temperature` overrides the role's configured temperature for this call.
    pub async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        temperature: Option<f64>,
    ) -> Result<LlmResponse, LlmError> {
        let temperature = temperature.or(self.role.temperature);
        let mut backoff = Backoff::new(&self.retry);

        loop {
            let error = match self.send(system, messages, temperature).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            match backoff.after(&error) {
                Some(wait) => {
                    tracing::warn!(
                        provider = self.provider.label(),
                        wait_ms = wait.as_millis() as u64,
                        error = %error,
                        "LLM call failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                None => {
                    metrics::counter!("llm.api.errors", "provider" => self.provider.label())
                        .increment(1);
                    return Err(error);
                }
            }
        }
    }

    async fn send(
        &self,
        system: &str,
        messages: &[Message],
        temperature: Option<f64>,
    ) -> Result<LlmResponse, LlmError> {
        let role = &self.role;
        match self.provider {
            Provider::Anthropic => {
                anthropic::send_messages(
                    &self.http,
                    &self.api_key,
                    &role.model,
                    role.max_tokens,
                    temperature,
                    system,
                    messages,
                )
                .await
            }
            Provider::OpenAi => {
                openai::send_chat_completion(
                    &self.http,
                    &self.api_key,
                    &role.model,
                    role.max_tokens,
                    temperature,
                    system,
                    messages,
                )
                .await
            }
        }
    }
}

/// Object-safe chat seam so oracles can run against mocks.
pub trait LlmCaller: Send + Sync {
    fn chat<'a>(
        &'a self,
        system: &'a str,
        messages: &'a [Message],
        temperature: Option<f64>,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>>;
}

impl LlmCaller for LlmClient {
    fn chat<'a>(
        &'a self,
        system: &'a str,
        messages: &'a [Message],
        temperature: Option<f64>,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>> {
        Box::pin(LlmClient::chat(self, system, messages, temperature))
    }
}
