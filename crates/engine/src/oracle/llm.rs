use std::collections::HashMap;
use std::sync::Arc;

use paperverify_common::types::{Chunk, NliJudgment};

use crate::config::ConfigError;
use crate::llm::{LlmCaller, Message};

use super::parse::{format_context, parse_claims, parse_judgment, split_answer};
use super::{AnswerGenerator, ClaimExtractor, InferenceOracle, OracleError, OracleFuture};

/// Prompt template names and the placeholders each must contain.
pub const REQUIRED_PROMPTS: &[(&str, &[&str])] = &[
    ("claim_extraction", &["answer"]),
    ("claim_verification", &["claim", "context"]),
    ("answer", &["question", "context"]),
];

/// The prompt templates the LLM-backed oracles render.
#[derive(Clone, Debug)]
pub struct PromptSet {
    pub claim_extraction: String,
    pub claim_verification: String,
    pub answer: String,
}

impl PromptSet {
    /// Pick the required templates out of the loaded prompt map.
    pub fn from_prompts(prompts: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            prompts
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::Validation(format!("prompt '{}' not found", name)))
        };

        Ok(Self {
            claim_extraction: get("claim_extraction")?,
            claim_verification: get("claim_verification")?,
            answer: get("answer")?,
        })
    }
}

/// Substitute `{name}` placeholders in a single pass, so braces inside the
/// substituted values are never expanded again.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v, close))
        });

        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Oracle implementations backed by chat LLMs.
///
/// `verifier` serves claim extraction and inference; `answer` serves
/// regeneration. Built per request from shared, stateless clients.
pub struct LlmOracle {
    verifier: Arc<dyn LlmCaller>,
    answer: Arc<dyn LlmCaller>,
    prompts: Arc<PromptSet>,
}

impl LlmOracle {
    pub fn new(
        verifier: Arc<dyn LlmCaller>,
        answer: Arc<dyn LlmCaller>,
        prompts: Arc<PromptSet>,
    ) -> Self {
        Self {
            verifier,
            answer,
            prompts,
        }
    }

    async fn extract(&self, answer: &str) -> Result<Vec<String>, OracleError> {
        let prompt = render(&self.prompts.claim_extraction, &[("answer", answer)]);
        let response = self
            .verifier
            .chat("", &[Message::user(prompt)], None)
            .await?;
        let claims = parse_claims(&response.text)?;
        tracing::debug!(claims = claims.len(), "Extracted claims");
        Ok(claims)
    }

    async fn judge(&self, claim: &str, context: &str) -> Result<NliJudgment, OracleError> {
        let prompt = render(
            &self.prompts.claim_verification,
            &[("claim", claim), ("context", context)],
        );
        let response = self
            .verifier
            .chat("", &[Message::user(prompt)], None)
            .await?;
        parse_judgment(&response.text)
    }

    async fn regenerate(
        &self,
        question: &str,
        context: &[Chunk],
        temperature: f64,
    ) -> Result<String, OracleError> {
        let context = format_context(context);
        let prompt = render(
            &self.prompts.answer,
            &[("question", question), ("context", &context)],
        );
        let response = self
            .answer
            .chat("", &[Message::user(prompt)], Some(temperature))
            .await?;
        Ok(split_answer(&response.text))
    }
}

impl ClaimExtractor for LlmOracle {
    fn extract_claims<'a>(&'a self, answer: &'a str) -> OracleFuture<'a, Vec<String>> {
        Box::pin(self.extract(answer))
    }
}

impl InferenceOracle for LlmOracle {
    fn verify_claim<'a>(
        &'a self,
        claim: &'a str,
        context: &'a str,
    ) -> OracleFuture<'a, NliJudgment> {
        Box::pin(self.judge(claim, context))
    }
}

impl AnswerGenerator for LlmOracle {
    fn generate_answer<'a>(
        &'a self,
        question: &'a str,
        context: &'a [Chunk],
        temperature: f64,
    ) -> OracleFuture<'a, String> {
        Box::pin(self.regenerate(question, context, temperature))
    }
}
