//! External collaborators of the verification core.
//!
//! Three object-safe traits describe what the verifiers need from the outside
//! world: claim extraction, claim-vs-context inference, and answer
//! regeneration. Verifiers borrow implementations for the lifetime of one
//! request; nothing here is a process-wide singleton.

mod llm;
pub mod parse;

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use paperverify_common::types::{Chunk, NliJudgment};

use crate::llm::LlmError;

pub use llm::{render, LlmOracle, PromptSet, REQUIRED_PROMPTS};

/// Boxed future returned by every oracle operation.
pub type OracleFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, OracleError>> + Send + 'a>>;

/// Failure of an external inference or generation call.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout {
        operation: &'static str,
        duration_ms: u64,
    },

    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    #[error("Oracle service error: {0}")]
    Service(String),
}

impl From<LlmError> for OracleError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Parse(msg) => OracleError::Malformed(msg),
            other => OracleError::Service(other.to_string()),
        }
    }
}

impl From<OracleError> for paperverify_common::PaperVerifyError {
    fn from(e: OracleError) -> Self {
        paperverify_common::PaperVerifyError::Oracle(e.to_string())
    }
}

/// Breaks an answer into short atomic factual statements.
pub trait ClaimExtractor: Send + Sync {
    fn extract_claims<'a>(&'a self, answer: &'a str) -> OracleFuture<'a, Vec<String>>;
}

/// Decides whether a claim is supported by, contradicted by, or absent from a context.
pub trait InferenceOracle: Send + Sync {
    fn verify_claim<'a>(&'a self, claim: &'a str, context: &'a str)
        -> OracleFuture<'a, NliJudgment>;
}

/// Re-runs answer generation for a question over the given chunks.
pub trait AnswerGenerator: Send + Sync {
    fn generate_answer<'a>(
        &'a self,
        question: &'a str,
        context: &'a [Chunk],
        temperature: f64,
    ) -> OracleFuture<'a, String>;
}

/// Oracle handles borrowed for a single verification request.
#[derive(Clone, Copy)]
pub struct Oracles<'a> {
    pub extractor: &'a dyn ClaimExtractor,
    pub inference: &'a dyn InferenceOracle,
    pub generator: &'a dyn AnswerGenerator,
}

impl<'a> Oracles<'a> {
    /// Use one implementation for all three roles.
    pub fn all<T>(oracle: &'a T) -> Self
    where
        T: ClaimExtractor + InferenceOracle + AnswerGenerator,
    {
        Self {
            extractor: oracle,
            inference: oracle,
            generator: oracle,
        }
    }
}

/// Run one oracle call under a deadline, recording latency and errors.
pub async fn call_with_timeout<T, F>(
    operation: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, OracleError>
where
    F: Future<Output = Result<T, OracleError>>,
{
    let start = Instant::now();

    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout {
            operation,
            duration_ms: timeout.as_millis() as u64,
        }),
    };

    metrics::histogram!("oracle.call.latency", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
    if let Err(ref e) = result {
        metrics::counter!("oracle.call.errors", "operation" => operation).increment(1);
        tracing::debug!(operation, error = %e, "Oracle call failed");
    }

    result
}
