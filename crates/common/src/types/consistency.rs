use serde::{Deserialize, Serialize};

use super::verdict::NEUTRAL_SCORE;

/// Qualitative outcome of the cross-generation consistency check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyStatus {
    HighlyConsistent,
    ModeratelyConsistent,
    LowConsistency,
    Inconsistent,
    /// No answer or no context.
    Skipped,
    /// Fewer than two answers were long enough to compare.
    InsufficientData,
    /// A regeneration call failed.
    Error,
}

impl ConsistencyStatus {
    /// Status label for a measured average similarity.
    pub fn from_similarity(avg: f64) -> Self {
        if avg > 0.8 {
            Self::HighlyConsistent
        } else if avg > 0.6 {
            Self::ModeratelyConsistent
        } else if avg > 0.4 {
            Self::LowConsistency
        } else {
            Self::Inconsistent
        }
    }

    /// Whether a similarity was actually measured.
    pub fn is_measured(&self) -> bool {
        !matches!(
            self,
            Self::Skipped | Self::InsufficientData | Self::Error
        )
    }
}

/// Full consistency checker output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyDetails {
    /// Mean pairwise similarity; 0 when nothing was measured.
    pub average_similarity: f64,
    pub status: ConsistencyStatus,
    /// Number of answers that were long enough to compare.
    #[serde(default)]
    pub variation_count: usize,
    #[serde(default)]
    pub pairwise_similarities: Vec<f64>,
    /// Original answer first, then the valid regenerated variants.
    #[serde(default)]
    pub variant_answers: Vec<String>,
    #[serde(default)]
    pub original_answer_length: usize,
    #[serde(default)]
    pub variation_1_length: usize,
    #[serde(default)]
    pub variation_2_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// True when the neutral default was substituted because no usable measurement exists.
    #[serde(default)]
    pub degraded: bool,
}

impl ConsistencyDetails {
    /// Unmeasured result with the given terminal status.
    pub fn unmeasured(status: ConsistencyStatus, reason: impl Into<String>) -> Self {
        Self {
            average_similarity: 0.0,
            status,
            variation_count: 0,
            pairwise_similarities: Vec::new(),
            variant_answers: Vec::new(),
            original_answer_length: 0,
            variation_1_length: 0,
            variation_2_length: 0,
            reason: Some(reason.into()),
            degraded: matches!(
                status,
                ConsistencyStatus::Error | ConsistencyStatus::InsufficientData
            ),
        }
    }

    /// Score fed to the aggregator: `1 - average_similarity` when measured,
    /// otherwise neutral. An unmeasured check is not evidence of fabrication.
    pub fn component_score(&self) -> f64 {
        if self.status.is_measured() {
            1.0 - self.average_similarity
        } else {
            NEUTRAL_SCORE
        }
    }
}
