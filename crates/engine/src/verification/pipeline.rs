use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use paperverify_common::config::SystemConfig;
use paperverify_common::types::{ComprehensiveVerdict, VerificationInput};
use paperverify_common::PaperVerifyError;

use super::aggregate::RiskAggregator;
use super::citations::CitationVerifier;
use super::claims::ClaimVerifier;
use super::consistency::{ConsistencyChecker, ConsistencySettings};
use crate::config::ConfigError;
use crate::oracle::Oracles;

/// The request-independent half of the pipeline: the three checks and the
/// aggregator, built once from configuration and shared across requests.
pub struct VerificationSuite {
    citations: CitationVerifier,
    claims: ClaimVerifier,
    consistency: ConsistencyChecker,
    aggregator: RiskAggregator,
}

impl VerificationSuite {
    pub fn from_config(system: &SystemConfig) -> Result<Self, ConfigError> {
        let aggregator = RiskAggregator::new(system.weights.clone())?;
        let call_timeout = Duration::from_secs(system.oracle.timeout_seconds);

        Ok(Self {
            citations: CitationVerifier::new(),
            claims: ClaimVerifier::new(call_timeout),
            consistency: ConsistencyChecker::new(ConsistencySettings {
                check: system.consistency.clone(),
                base_temperature: system.llm.answer.temperature.unwrap_or(0.0),
                call_timeout,
            }),
            aggregator,
        })
    }
}

/// Runs every check for one request against the oracles it was given.
pub struct HallucinationDetector<'a> {
    suite: &'a VerificationSuite,
    oracles: Oracles<'a>,
}

impl<'a> HallucinationDetector<'a> {
    pub fn new(suite: &'a VerificationSuite, oracles: Oracles<'a>) -> Self {
        Self { suite, oracles }
    }

    /// Run all three checks concurrently and aggregate. Never fails: oracle
    /// problems are folded into the component details.
    pub async fn verify(&self, input: &VerificationInput) -> ComprehensiveVerdict {
        let start = Instant::now();
        let suite = self.suite;

        let citation = async { suite.citations.verify(input) };
        let claims = suite
            .claims
            .verify(input, self.oracles.extractor, self.oracles.inference);
        let consistency = suite.consistency.check(input, self.oracles.generator);

        let (citation_details, llm_details, consistency_details) =
            tokio::join!(citation, claims, consistency);

        let verdict = suite
            .aggregator
            .aggregate(citation_details, llm_details, consistency_details);

        record_metrics(&verdict, start.elapsed());
        tracing::info!(
            overall_score = verdict.overall_score,
            overall_risk = %verdict.overall_risk,
            degraded = verdict.is_degraded(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Verification complete"
        );

        verdict
    }

    /// Like [`verify`](Self::verify), but abandons the run when `cancel` fires.
    /// In-flight oracle calls are dropped and no partial verdict is produced.
    pub async fn verify_with_cancel(
        &self,
        input: &VerificationInput,
        cancel: oneshot::Receiver<()>,
    ) -> Result<ComprehensiveVerdict, PaperVerifyError> {
        tokio::select! {
            verdict = self.verify(input) => Ok(verdict),
            Ok(()) = cancel => {
                tracing::info!("Verification cancelled");
                metrics::counter!("verification.cancelled").increment(1);
                Err(PaperVerifyError::Cancelled)
            }
        }
    }

    /// Like [`verify`](Self::verify), bounded by an overall deadline.
    pub async fn verify_with_deadline(
        &self,
        input: &VerificationInput,
        deadline: Duration,
    ) -> Result<ComprehensiveVerdict, PaperVerifyError> {
        match tokio::time::timeout(deadline, self.verify(input)).await {
            Ok(verdict) => Ok(verdict),
            Err(_) => {
                tracing::warn!(deadline_ms = deadline.as_millis() as u64, "Verification deadline elapsed");
                metrics::counter!("verification.timeouts").increment(1);
                Err(PaperVerifyError::Timeout(format!(
                    "verification exceeded {}ms",
                    deadline.as_millis()
                )))
            }
        }
    }
}

fn record_metrics(verdict: &ComprehensiveVerdict, elapsed: Duration) {
    metrics::histogram!("verification.duration").record(elapsed.as_secs_f64());
    metrics::histogram!("verification.overall.score").record(verdict.overall_score);
    metrics::counter!("verification.risk", "tier" => verdict.overall_risk.as_str()).increment(1);

    let scores = &verdict.component_scores;
    metrics::histogram!("verification.component.score", "component" => "citation")
        .record(scores.citation_verification);
    metrics::histogram!("verification.component.score", "component" => "llm")
        .record(scores.llm_verification);
    metrics::histogram!("verification.component.score", "component" => "consistency")
        .record(scores.consistency_check);

    if verdict.llm_details.degraded {
        metrics::counter!("verification.component.degraded", "component" => "llm").increment(1);
    }
    if verdict.consistency_details.degraded {
        metrics::counter!("verification.component.degraded", "component" => "consistency")
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{
        AnswerGenerator, ClaimExtractor, InferenceOracle, OracleError, OracleFuture,
    };
    use paperverify_common::config::{
        ConsistencyConfig, LlmConfig, LlmRoleConfig, OracleConfig, RetrievalConfig, RetryConfig,
        RetryDefaults, WeightsConfig,
    };
    use paperverify_common::types::{Chunk, NliJudgment, NliVerdict, RiskTier};

    /// Oracle that never answers.
    struct HangingOracle;

    impl ClaimExtractor for HangingOracle {
        fn extract_claims<'a>(&'a self, _answer: &'a str) -> OracleFuture<'a, Vec<String>> {
            Box::pin(std::future::pending())
        }
    }

    impl InferenceOracle for HangingOracle {
        fn verify_claim<'a>(&'a self, _c: &'a str, _ctx: &'a str) -> OracleFuture<'a, NliJudgment> {
            Box::pin(std::future::pending())
        }
    }

    impl AnswerGenerator for HangingOracle {
        fn generate_answer<'a>(
            &'a self,
            _q: &'a str,
            _ctx: &'a [Chunk],
            _t: f64,
        ) -> OracleFuture<'a, String> {
            Box::pin(std::future::pending())
        }
    }

    /// Oracle that supports everything and echoes a fixed answer.
    struct EchoOracle;

    impl ClaimExtractor for EchoOracle {
        fn extract_claims<'a>(&'a self, _answer: &'a str) -> OracleFuture<'a, Vec<String>> {
            Box::pin(async { Ok(vec!["The model has twelve layers.".to_string()]) })
        }
    }

    impl InferenceOracle for EchoOracle {
        fn verify_claim<'a>(&'a self, _c: &'a str, _ctx: &'a str) -> OracleFuture<'a, NliJudgment> {
            Box::pin(async {
                Ok::<_, OracleError>(NliJudgment {
                    verdict: NliVerdict::Supported,
                    explanation: String::new(),
                })
            })
        }
    }

    impl AnswerGenerator for EchoOracle {
        fn generate_answer<'a>(
            &'a self,
            _q: &'a str,
            _ctx: &'a [Chunk],
            _t: f64,
        ) -> OracleFuture<'a, String> {
            Box::pin(async { Ok("The model has twelve layers.".to_string()) })
        }
    }

    fn system(timeout_seconds: u64) -> SystemConfig {
        let role = LlmRoleConfig {
            provider: "openai".into(),
            model: "gpt-4-turbo".into(),
            max_tokens: 512,
            temperature: None,
        };
        SystemConfig {
            weights: WeightsConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig {
                verifier: role.clone(),
                answer: role,
            },
            consistency: ConsistencyConfig::default(),
            oracle: OracleConfig {
                timeout_seconds,
                request_timeout_seconds: 300,
            },
            retry: RetryDefaults {
                llm_api: RetryConfig {
                    max_attempts: 1,
                    initial_backoff_ms: 10,
                    max_backoff_ms: 10,
                    backoff_multiplier: 1.0,
                    jitter: false,
                },
            },
        }
    }

    fn input() -> VerificationInput {
        VerificationInput::new(
            "How many layers?",
            "Section 3.1: the model has twelve layers.",
            "The model has twelve layers.",
            Some("Section 3.1".into()),
            vec![Chunk::new("the model has twelve layers", 0.9)],
        )
        .unwrap()
    }

    #[test]
    fn test_suite_rejects_bad_weights() {
        let mut config = system(5);
        config.weights.consistency = 0.5;
        assert!(matches!(
            VerificationSuite::from_config(&config),
            Err(ConfigError::InvalidWeights(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_agreeing_signals_is_low_risk() {
        let suite = VerificationSuite::from_config(&system(5)).unwrap();
        let detector = HallucinationDetector::new(&suite, Oracles::all(&EchoOracle));

        let verdict = detector.verify(&input()).await;
        assert_eq!(verdict.overall_risk, RiskTier::Low);
        assert_eq!(verdict.overall_score, 0.0);
    }

    #[tokio::test]
    async fn test_cancel_discards_run() {
        let suite = VerificationSuite::from_config(&system(60)).unwrap();
        let detector = HallucinationDetector::new(&suite, Oracles::all(&HangingOracle));

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(());
        });

        let result = detector.verify_with_cancel(&input(), rx).await;
        assert!(matches!(result, Err(PaperVerifyError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropped_cancel_sender_does_not_cancel() {
        let suite = VerificationSuite::from_config(&system(5)).unwrap();
        let detector = HallucinationDetector::new(&suite, Oracles::all(&EchoOracle));

        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);

        let result = detector.verify_with_cancel(&input(), rx).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_deadline_elapses() {
        let suite = VerificationSuite::from_config(&system(60)).unwrap();
        let detector = HallucinationDetector::new(&suite, Oracles::all(&HangingOracle));

        let result = detector
            .verify_with_deadline(&input(), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(PaperVerifyError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_per_call_timeout_degrades_instead_of_failing() {
        let suite = VerificationSuite::from_config(&system(1)).unwrap();
        let detector = HallucinationDetector::new(&suite, Oracles::all(&HangingOracle));

        let verdict = detector.verify(&input()).await;
        assert!(verdict.is_degraded());
        assert!(verdict.llm_details.reason.as_deref().unwrap().contains("timed out"));
        // Citation check is fully verified; the two others fall back to neutral.
        assert!((verdict.overall_score - 0.3).abs() < 1e-12);
    }
}
