use paperverify_common::config::WeightsConfig;
use paperverify_common::types::{
    CitationDetails, ClaimCheckDetails, ComponentScores, ComprehensiveVerdict, ConsistencyDetails,
    RiskTier,
};

use crate::config::validation::validate_weights;
use crate::config::ConfigError;

/// Folds the three component results into one weighted verdict.
#[derive(Clone, Debug)]
pub struct RiskAggregator {
    weights: WeightsConfig,
}

impl RiskAggregator {
    /// Fails with `InvalidWeights` unless the weights are in [0, 1] and sum to 1.
    pub fn new(weights: WeightsConfig) -> Result<Self, ConfigError> {
        validate_weights(&weights)?;
        Ok(Self { weights })
    }

    pub fn aggregate(
        &self,
        citation_details: CitationDetails,
        llm_details: ClaimCheckDetails,
        consistency_details: ConsistencyDetails,
    ) -> ComprehensiveVerdict {
        let component_scores = ComponentScores {
            citation_verification: citation_details.component_score(),
            llm_verification: llm_details.component_score(),
            consistency_check: consistency_details.component_score(),
        };

        let w = &self.weights;
        let overall_score = w.citation * component_scores.citation_verification
            + w.llm * component_scores.llm_verification
            + w.consistency * component_scores.consistency_check;

        ComprehensiveVerdict {
            overall_score,
            overall_risk: RiskTier::from_score(overall_score),
            component_scores,
            citation_details,
            llm_details,
            consistency_details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperverify_common::types::{
        CitationStatus, ClaimVerification, ConsistencyStatus, NliVerdict,
    };

    fn citation(score: f64) -> CitationDetails {
        CitationDetails {
            score,
            verified_citations: Vec::new(),
            citation_present: true,
            status: CitationStatus::from_score(score),
            citations_verified: 0,
            reason: None,
        }
    }

    fn claims(supported: usize, total: usize) -> ClaimCheckDetails {
        let verifications = (0..total)
            .map(|i| ClaimVerification {
                claim: format!("claim {}", i),
                verdict: if i < supported {
                    NliVerdict::Supported
                } else {
                    NliVerdict::Contradicted
                },
                explanation: String::new(),
            })
            .collect();
        ClaimCheckDetails::completed(verifications)
    }

    fn consistency(avg: f64) -> ConsistencyDetails {
        let mut d = ConsistencyDetails::unmeasured(ConsistencyStatus::Skipped, "");
        d.average_similarity = avg;
        d.status = ConsistencyStatus::from_similarity(avg);
        d.reason = None;
        d.degraded = false;
        d
    }

    #[test]
    fn test_rejects_weights_not_summing_to_one() {
        let err = RiskAggregator::new(WeightsConfig {
            citation: 0.4,
            llm: 0.4,
            consistency: 0.3,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWeights(_)));
    }

    #[test]
    fn test_weighted_sum() {
        let agg = RiskAggregator::new(WeightsConfig::default()).unwrap();
        let v = agg.aggregate(citation(0.25), claims(3, 4), consistency(0.9));
        let expected = 0.4 * 0.25 + 0.4 * 0.25 + 0.2 * (1.0 - 0.9);
        assert!((v.overall_score - expected).abs() < 1e-12);
        assert_eq!(v.overall_risk, RiskTier::Low);
        assert_eq!(v.component_scores.llm_verification, 0.25);
    }

    #[test]
    fn test_all_neutral_components_score_half() {
        let agg = RiskAggregator::new(WeightsConfig::default()).unwrap();
        let v = agg.aggregate(
            CitationDetails {
                status: CitationStatus::Skipped,
                ..citation(0.5)
            },
            ClaimCheckDetails::skipped("Missing answer or context"),
            ConsistencyDetails::unmeasured(ConsistencyStatus::Skipped, "Missing answer or context"),
        );
        assert_eq!(v.overall_score, 0.5);
        assert_eq!(v.overall_risk, RiskTier::Medium);
        assert!(!v.is_degraded());
    }

    #[test]
    fn test_failures_substitute_neutral_not_zero() {
        let agg = RiskAggregator::new(WeightsConfig::default()).unwrap();
        let v = agg.aggregate(
            citation(0.0),
            ClaimCheckDetails::failed("timeout"),
            ConsistencyDetails::unmeasured(ConsistencyStatus::Error, "timeout"),
        );
        assert!((v.overall_score - 0.3).abs() < 1e-12);
        assert!(v.is_degraded());
    }

    #[test]
    fn test_tier_of_aggregated_score() {
        // All weight on citations makes the overall score equal the citation score.
        let agg = RiskAggregator::new(WeightsConfig {
            citation: 1.0,
            llm: 0.0,
            consistency: 0.0,
        })
        .unwrap();
        assert_eq!(agg.aggregate(citation(0.7), claims(0, 0), consistency(1.0)).overall_risk, RiskTier::High);
        assert_eq!(
            agg.aggregate(citation(0.70001), claims(0, 0), consistency(1.0)).overall_risk,
            RiskTier::Critical
        );
        assert_eq!(agg.aggregate(citation(0.5), claims(0, 0), consistency(1.0)).overall_risk, RiskTier::Medium);
        assert_eq!(agg.aggregate(citation(0.3), claims(0, 0), consistency(1.0)).overall_risk, RiskTier::Low);
    }
}
