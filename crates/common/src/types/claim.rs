use serde::{Deserialize, Serialize};

use super::verdict::NEUTRAL_SCORE;

/// Natural-language-inference verdict for one claim against the retrieved context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NliVerdict {
    Supported,
    Contradicted,
    NotMentioned,
}

/// Inference oracle output for a single claim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NliJudgment {
    pub verdict: NliVerdict,
    pub explanation: String,
}

/// One extracted claim and how it fared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimVerification {
    pub claim: String,
    pub verdict: NliVerdict,
    pub explanation: String,
}

/// Terminal state of the claim-level check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimCheckStatus {
    Completed,
    /// No answer or no context to check against.
    Skipped,
    /// An oracle call failed; nothing from this run is trusted.
    Failed,
}

/// Full claim-level NLI verifier output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimCheckDetails {
    pub status: ClaimCheckStatus,
    #[serde(default)]
    pub verifications: Vec<ClaimVerification>,
    #[serde(default)]
    pub supported_claims: usize,
    #[serde(default)]
    pub total_claims: usize,
    /// Present only when the check completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// True when the neutral default was substituted because of a failure.
    #[serde(default)]
    pub degraded: bool,
}

impl ClaimCheckDetails {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: ClaimCheckStatus::Skipped,
            verifications: Vec::new(),
            supported_claims: 0,
            total_claims: 0,
            hallucination_score: None,
            reason: Some(reason.into()),
            degraded: false,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: ClaimCheckStatus::Failed,
            reason: Some(reason.into()),
            degraded: true,
            ..Self::skipped("")
        }
    }

    /// Build a completed result. Zero claims scores neutral.
    pub fn completed(verifications: Vec<ClaimVerification>) -> Self {
        let total_claims = verifications.len();
        let supported_claims = verifications
            .iter()
            .filter(|v| v.verdict == NliVerdict::Supported)
            .count();
        let score = if total_claims == 0 {
            NEUTRAL_SCORE
        } else {
            1.0 - supported_claims as f64 / total_claims as f64
        };

        Self {
            status: ClaimCheckStatus::Completed,
            verifications,
            supported_claims,
            total_claims,
            hallucination_score: Some(score),
            reason: None,
            degraded: false,
        }
    }

    /// Score fed to the aggregator; neutral when the check did not complete.
    pub fn component_score(&self) -> f64 {
        self.hallucination_score.unwrap_or(NEUTRAL_SCORE)
    }
}
