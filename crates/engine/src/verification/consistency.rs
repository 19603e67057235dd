//! Cross-generation consistency: regenerate the answer under perturbed
//! conditions and measure how much the answers agree.

use std::time::Duration;

use paperverify_common::config::ConsistencyConfig;
use paperverify_common::types::{
    most_relevant, ConsistencyDetails, ConsistencyStatus, VerificationInput,
};

use super::similarity;
use crate::oracle::{call_with_timeout, AnswerGenerator};

/// Settings for the two regeneration variants.
#[derive(Clone, Debug)]
pub struct ConsistencySettings {
    pub check: ConsistencyConfig,
    /// Temperature of the narrowed-context variant.
    pub base_temperature: f64,
    pub call_timeout: Duration,
}

pub struct ConsistencyChecker {
    settings: ConsistencySettings,
}

impl ConsistencyChecker {
    pub fn new(settings: ConsistencySettings) -> Self {
        Self { settings }
    }

    /// Run the check. Regeneration failures yield `status=error`.
    pub async fn check(
        &self,
        input: &VerificationInput,
        generator: &dyn AnswerGenerator,
    ) -> ConsistencyDetails {
        let chunks = input.retrieved_chunks();
        if !input.has_answer() || chunks.is_empty() {
            return ConsistencyDetails::unmeasured(
                ConsistencyStatus::Skipped,
                "Missing answer or context",
            );
        }

        let s = &self.settings;
        let best = most_relevant(chunks).unwrap_or(0);
        let narrow_context = &chunks[best..best + 1];

        let variants = tokio::try_join!(
            call_with_timeout(
                "generate_answer",
                s.call_timeout,
                generator.generate_answer(input.question(), chunks, s.check.variant_temperature),
            ),
            call_with_timeout(
                "generate_answer",
                s.call_timeout,
                generator.generate_answer(input.question(), narrow_context, s.base_temperature),
            ),
        );

        let (variant_a, variant_b) = match variants {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Answer regeneration failed");
                return ConsistencyDetails::unmeasured(ConsistencyStatus::Error, e.to_string());
            }
        };

        self.compare(input.answer(), variant_a, variant_b)
    }

    fn compare(&self, original: &str, variant_a: String, variant_b: String) -> ConsistencyDetails {
        let min_chars = self.settings.check.min_answer_chars;
        let candidates = [original, variant_a.as_str(), variant_b.as_str()];
        let valid: Vec<&str> = candidates
            .iter()
            .copied()
            .filter(|a| a.chars().count() > min_chars)
            .collect();

        let lengths = (
            original.chars().count(),
            variant_a.chars().count(),
            variant_b.chars().count(),
        );

        if valid.len() < 2 {
            tracing::info!(valid = valid.len(), "Not enough answers to compare");
            let mut details = ConsistencyDetails::unmeasured(
                ConsistencyStatus::InsufficientData,
                format!("Only {} answer(s) longer than {} characters", valid.len(), min_chars),
            );
            details.variation_count = valid.len();
            (
                details.original_answer_length,
                details.variation_1_length,
                details.variation_2_length,
            ) = lengths;
            return details;
        }

        let pairwise = similarity::pairwise(self.settings.check.metric, &valid);
        let average = pairwise.iter().sum::<f64>() / pairwise.len() as f64;
        let status = ConsistencyStatus::from_similarity(average);

        tracing::info!(
            average_similarity = average,
            status = ?status,
            variations = valid.len(),
            "Consistency check complete"
        );

        ConsistencyDetails {
            average_similarity: average,
            status,
            variation_count: valid.len(),
            pairwise_similarities: pairwise,
            variant_answers: valid.iter().map(|a| a.to_string()).collect(),
            original_answer_length: lengths.0,
            variation_1_length: lengths.1,
            variation_2_length: lengths.2,
            reason: None,
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleError, OracleFuture};
    use paperverify_common::config::SimilarityMetric;
    use paperverify_common::types::{Chunk, NEUTRAL_SCORE};
    use std::sync::Mutex;

    /// Mock generator: answers keyed by temperature, records contexts it saw.
    struct MockGenerator {
        full: Result<String, String>,
        narrow: Result<String, String>,
        calls: Mutex<Vec<(Vec<String>, f64)>>,
    }

    impl MockGenerator {
        fn new(full: &str, narrow: &str) -> Self {
            Self {
                full: Ok(full.into()),
                narrow: Ok(narrow.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl AnswerGenerator for MockGenerator {
        fn generate_answer<'a>(
            &'a self,
            _question: &'a str,
            context: &'a [Chunk],
            temperature: f64,
        ) -> OracleFuture<'a, String> {
            self.calls.lock().unwrap().push((
                context.iter().map(|c| c.content.clone()).collect(),
                temperature,
            ));
            let result = if temperature == 0.3 {
                self.full.clone()
            } else {
                self.narrow.clone()
            };
            Box::pin(async move { result.map_err(OracleError::Service) })
        }
    }

    fn checker() -> ConsistencyChecker {
        ConsistencyChecker::new(ConsistencySettings {
            check: ConsistencyConfig {
                variant_temperature: 0.3,
                min_answer_chars: 10,
                metric: SimilarityMetric::MatchingBlocks,
            },
            base_temperature: 0.0,
            call_timeout: Duration::from_secs(5),
        })
    }

    fn input(answer: &str) -> VerificationInput {
        let chunks = vec![
            Chunk::new("chunk one", 0.3),
            Chunk::new("chunk two", 0.95),
            Chunk::new("chunk three", 0.5),
            Chunk::new("chunk four", 0.1),
        ];
        VerificationInput::new("What is it?", "source", answer, None, chunks).unwrap()
    }

    #[tokio::test]
    async fn test_identical_variants_are_highly_consistent() {
        let answer = "The model has twelve layers.";
        let generator = MockGenerator::new(answer, answer);
        let details = checker().check(&input(answer), &generator).await;

        assert_eq!(details.status, ConsistencyStatus::HighlyConsistent);
        assert_eq!(details.average_similarity, 1.0);
        assert_eq!(details.pairwise_similarities.len(), 3);
        assert_eq!(details.variation_count, 3);
        assert_eq!(details.component_score(), 0.0);
    }

    #[tokio::test]
    async fn test_variant_contexts() {
        let generator = MockGenerator::new("A long enough answer.", "Another long answer.");
        checker().check(&input("The original answer."), &generator).await;

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let full = calls.iter().find(|(_, t)| *t == 0.3).unwrap();
        let narrow = calls.iter().find(|(_, t)| *t == 0.0).unwrap();
        assert_eq!(full.0, vec!["chunk one", "chunk two", "chunk three", "chunk four"]);
        assert_eq!(narrow.0, vec!["chunk two"]);
    }

    #[tokio::test]
    async fn test_full_variant_sees_every_retrieved_chunk() {
        let chunks: Vec<Chunk> = (0..5)
            .map(|i| Chunk::new(format!("chunk {}", i), 0.1 * i as f64))
            .collect();
        let input =
            VerificationInput::new("What is it?", "source", "The original answer.", None, chunks)
                .unwrap();
        let generator = MockGenerator::new("A long enough answer.", "Another long answer.");
        checker().check(&input, &generator).await;

        let calls = generator.calls.lock().unwrap();
        let full = calls.iter().find(|(_, t)| *t == 0.3).unwrap();
        let narrow = calls.iter().find(|(_, t)| *t == 0.0).unwrap();
        assert_eq!(full.0.len(), 5);
        assert_eq!(narrow.0, vec!["chunk 4"]);
    }

    #[tokio::test]
    async fn test_short_variants_excluded() {
        let generator = MockGenerator::new("Too short", "The model has twelve layers.");
        let details = checker()
            .check(&input("The model has twelve layers."), &generator)
            .await;

        assert_eq!(details.variation_count, 2);
        assert_eq!(details.pairwise_similarities, vec![1.0]);
        assert_eq!(details.variation_1_length, 9);
    }

    #[tokio::test]
    async fn test_insufficient_data_is_neutral() {
        let generator = MockGenerator::new("short", "tiny");
        let details = checker()
            .check(&input("The model has twelve layers."), &generator)
            .await;

        assert_eq!(details.status, ConsistencyStatus::InsufficientData);
        assert_eq!(details.average_similarity, 0.0);
        assert_eq!(details.variation_count, 1);
        assert!(details.degraded);
        assert_eq!(details.component_score(), NEUTRAL_SCORE);
    }

    #[tokio::test]
    async fn test_regeneration_error_is_neutral() {
        let generator = MockGenerator {
            full: Ok("A long enough answer.".into()),
            narrow: Err("upstream 500".into()),
            calls: Mutex::new(Vec::new()),
        };
        let details = checker().check(&input("The original answer."), &generator).await;

        assert_eq!(details.status, ConsistencyStatus::Error);
        assert_eq!(details.average_similarity, 0.0);
        assert!(details.reason.as_deref().unwrap().contains("upstream 500"));
        assert!(details.degraded);
        assert_eq!(details.component_score(), NEUTRAL_SCORE);
    }

    #[tokio::test]
    async fn test_skipped_without_context() {
        let generator = MockGenerator::new("x", "y");
        let input =
            VerificationInput::new("Q?", "source", "The answer.", None, vec![]).unwrap();
        let details = checker().check(&input, &generator).await;

        assert_eq!(details.status, ConsistencyStatus::Skipped);
        assert!(!details.degraded);
        assert!(generator.calls.lock().unwrap().is_empty());
    }
}
