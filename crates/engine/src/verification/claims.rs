//! Claim-level natural-language-inference check.

use std::time::Duration;

use paperverify_common::types::{ClaimCheckDetails, ClaimVerification, VerificationInput};

use crate::oracle::{call_with_timeout, ClaimExtractor, InferenceOracle, OracleError};

/// Breaks the answer into atomic claims and asks the inference oracle about
/// each one against the retrieved context.
pub struct ClaimVerifier {
    call_timeout: Duration,
}

impl ClaimVerifier {
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    /// Run the check. Any oracle failure aborts it with `status=failed`.
    pub async fn verify(
        &self,
        input: &VerificationInput,
        extractor: &dyn ClaimExtractor,
        inference: &dyn InferenceOracle,
    ) -> ClaimCheckDetails {
        if !input.has_answer() || input.retrieved_chunks().is_empty() {
            return ClaimCheckDetails::skipped("Missing answer or context");
        }

        match self.run(input, extractor, inference).await {
            Ok(verifications) => {
                let details = ClaimCheckDetails::completed(verifications);
                tracing::info!(
                    supported = details.supported_claims,
                    total = details.total_claims,
                    score = details.component_score(),
                    "Claim verification complete"
                );
                details
            }
            Err(e) => {
                tracing::warn!(error = %e, "Claim verification failed");
                ClaimCheckDetails::failed(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        input: &VerificationInput,
        extractor: &dyn ClaimExtractor,
        inference: &dyn InferenceOracle,
    ) -> Result<Vec<ClaimVerification>, OracleError> {
        let context = input.joined_context();

        let claims = call_with_timeout(
            "extract_claims",
            self.call_timeout,
            extractor.extract_claims(input.answer()),
        )
        .await?;
        tracing::debug!(claims = claims.len(), "Claims extracted");

        let mut verifications = Vec::with_capacity(claims.len());
        for claim in claims {
            let judgment = call_with_timeout(
                "verify_claim",
                self.call_timeout,
                inference.verify_claim(&claim, &context),
            )
            .await?;
            tracing::debug!(claim = %claim, verdict = ?judgment.verdict, "Claim judged");

            verifications.push(ClaimVerification {
                claim,
                verdict: judgment.verdict,
                explanation: judgment.explanation,
            });
        }

        Ok(verifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleFuture;
    use paperverify_common::types::{
        Chunk, ClaimCheckStatus, NliJudgment, NliVerdict, NEUTRAL_SCORE,
    };
    use std::sync::Mutex;

    /// Mock oracle: fixed claims, verdicts popped in order, records contexts.
    struct MockOracle {
        claims: Result<Vec<String>, String>,
        verdicts: Mutex<Vec<NliVerdict>>,
        contexts: Mutex<Vec<String>>,
    }

    impl MockOracle {
        fn new(claims: &[&str], verdicts: Vec<NliVerdict>) -> Self {
            let mut verdicts = verdicts;
            verdicts.reverse();
            Self {
                claims: Ok(claims.iter().map(|c| c.to_string()).collect()),
                verdicts: Mutex::new(verdicts),
                contexts: Mutex::new(Vec::new()),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                claims: Err(msg.to_string()),
                verdicts: Mutex::new(Vec::new()),
                contexts: Mutex::new(Vec::new()),
            }
        }
    }

    impl ClaimExtractor for MockOracle {
        fn extract_claims<'a>(&'a self, _answer: &'a str) -> OracleFuture<'a, Vec<String>> {
            let result = self.claims.clone().map_err(OracleError::Malformed);
            Box::pin(async move { result })
        }
    }

    impl InferenceOracle for MockOracle {
        fn verify_claim<'a>(
            &'a self,
            _claim: &'a str,
            context: &'a str,
        ) -> OracleFuture<'a, NliJudgment> {
            self.contexts.lock().unwrap().push(context.to_string());
            let result = match self.verdicts.lock().unwrap().pop() {
                Some(verdict) => Ok(NliJudgment {
                    verdict,
                    explanation: "mock".into(),
                }),
                None => Err(OracleError::Service("no verdict left".into())),
            };
            Box::pin(async move { result })
        }
    }

    fn input(answer: &str, chunks: Vec<Chunk>) -> VerificationInput {
        VerificationInput::new("Q?", "source", answer, None, chunks).unwrap()
    }

    fn chunks() -> Vec<Chunk> {
        vec![Chunk::new("first chunk", 0.9), Chunk::new("second chunk", 0.4)]
    }

    #[tokio::test]
    async fn test_score_from_supported_fraction() {
        let oracle = MockOracle::new(
            &["a", "b", "c", "d"],
            vec![
                NliVerdict::Supported,
                NliVerdict::Contradicted,
                NliVerdict::NotMentioned,
                NliVerdict::Supported,
            ],
        );
        let verifier = ClaimVerifier::new(Duration::from_secs(5));
        let details = verifier.verify(&input("An answer.", chunks()), &oracle, &oracle).await;

        assert_eq!(details.status, ClaimCheckStatus::Completed);
        assert_eq!(details.total_claims, 4);
        assert_eq!(details.supported_claims, 2);
        assert_eq!(details.hallucination_score, Some(0.5));
        assert_eq!(details.verifications[1].verdict, NliVerdict::Contradicted);
        assert!(!details.degraded);

        let contexts = oracle.contexts.lock().unwrap();
        assert_eq!(contexts.len(), 4);
        assert_eq!(contexts[0], "first chunk\nsecond chunk");
    }

    #[tokio::test]
    async fn test_zero_claims_is_neutral() {
        let oracle = MockOracle::new(&[], vec![]);
        let verifier = ClaimVerifier::new(Duration::from_secs(5));
        let details = verifier.verify(&input("An answer.", chunks()), &oracle, &oracle).await;

        assert_eq!(details.status, ClaimCheckStatus::Completed);
        assert_eq!(details.component_score(), NEUTRAL_SCORE);
    }

    #[tokio::test]
    async fn test_skipped_without_answer_or_context() {
        let oracle = MockOracle::new(&["a"], vec![NliVerdict::Supported]);
        let verifier = ClaimVerifier::new(Duration::from_secs(5));

        let no_context = verifier.verify(&input("An answer.", vec![]), &oracle, &oracle).await;
        assert_eq!(no_context.status, ClaimCheckStatus::Skipped);

        let no_answer = verifier.verify(&input("", chunks()), &oracle, &oracle).await;
        assert_eq!(no_answer.status, ClaimCheckStatus::Skipped);
        assert!(oracle.contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_is_neutral_and_degraded() {
        let oracle = MockOracle::failing("not json");
        let verifier = ClaimVerifier::new(Duration::from_secs(5));
        let details = verifier.verify(&input("An answer.", chunks()), &oracle, &oracle).await;

        assert_eq!(details.status, ClaimCheckStatus::Failed);
        assert!(details.degraded);
        assert!(details.reason.as_deref().unwrap().contains("not json"));
        assert_eq!(details.component_score(), NEUTRAL_SCORE);
    }

    #[tokio::test]
    async fn test_mid_run_failure_discards_partial_results() {
        // Three claims but only one verdict available.
        let oracle = MockOracle::new(&["a", "b", "c"], vec![NliVerdict::Supported]);
        let verifier = ClaimVerifier::new(Duration::from_secs(5));
        let details = verifier.verify(&input("An answer.", chunks()), &oracle, &oracle).await;

        assert_eq!(details.status, ClaimCheckStatus::Failed);
        assert!(details.verifications.is_empty());
        assert_eq!(details.hallucination_score, None);
    }
}
