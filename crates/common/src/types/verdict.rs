use serde::{Deserialize, Serialize};

use super::citation::CitationDetails;
use super::claim::ClaimCheckDetails;
use super::consistency::ConsistencyDetails;

/// Score substituted for a component that was skipped or could not run.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Discretization of the overall hallucination score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    /// Map a score to its tier. All boundaries are strict.
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::Critical
        } else if score > 0.5 {
            Self::High
        } else if score > 0.3 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-component scores, each in [0, 1], higher = more likely hallucinated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub citation_verification: f64,
    pub llm_verification: f64,
    pub consistency_check: f64,
}

/// Final artifact of the verification pipeline.
///
/// Field names and nesting are consumed by caching and API layers and must
/// stay stable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveVerdict {
    pub overall_score: f64,
    pub overall_risk: RiskTier,
    pub component_scores: ComponentScores,
    pub citation_details: CitationDetails,
    pub llm_details: ClaimCheckDetails,
    pub consistency_details: ConsistencyDetails,
}

impl ComprehensiveVerdict {
    /// Whether any component fell back to the neutral default after a failure.
    pub fn is_degraded(&self) -> bool {
        self.llm_details.degraded || self.consistency_details.degraded
    }
}
