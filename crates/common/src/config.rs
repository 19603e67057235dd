use serde::{Deserialize, Serialize};

/// Top-level system configuration, deserialized from system.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub consistency: ConsistencyConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    pub retry: RetryDefaults,
}

/// Weights of the three component scores in the overall hallucination score.
/// Must be non-negative and sum to 1.0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightsConfig {
    pub citation: f64,
    pub llm: f64,
    pub consistency: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            citation: 0.4,
            llm: 0.4,
            consistency: 0.2,
        }
    }
}

/// Retrieval parameters of the upstream retriever that produced the chunks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunks retrieved per question. Regeneration always receives every
    /// chunk in the input; this is never used to cut that context.
    pub depth: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { depth: 3 }
    }
}

/// LLM provider and model configuration per role.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Claim extraction and claim verification.
    pub verifier: LlmRoleConfig,
    /// Answer regeneration for the consistency check.
    pub answer: LlmRoleConfig,
}

/// Configuration for a single LLM role.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmRoleConfig {
    /// Provider name ("anthropic" or "openai").
    pub provider: String,
    /// Model identifier (e.g. "gpt-4-turbo").
    pub model: String,
    /// Max tokens in the response.
    pub max_tokens: u32,
    /// Temperature (0.0–2.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Which string similarity the consistency check uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Ratcliff/Obershelp longest-matching-blocks ratio.
    #[default]
    MatchingBlocks,
    /// Normalized Levenshtein similarity.
    Levenshtein,
}

/// Cross-generation consistency check parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    /// Sampling temperature for the full-context variant.
    pub variant_temperature: f64,
    /// Answers must be strictly longer than this (in characters) to be compared.
    pub min_answer_chars: usize,
    #[serde(default)]
    pub metric: SimilarityMetric,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            variant_temperature: 0.3,
            min_answer_chars: 10,
            metric: SimilarityMetric::MatchingBlocks,
        }
    }
}

/// Limits applied to every oracle call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Deadline for a single extraction, inference or regeneration call.
    pub timeout_seconds: u64,
    /// Deadline for a whole verification request.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout_seconds() -> u64 {
    300
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// Default retry parameters for outbound calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryDefaults {
    pub llm_api: RetryConfig,
}

/// Retry configuration for a specific target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}
