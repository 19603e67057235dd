use serde::{Deserialize, Serialize};

/// Kind of structural reference found in a citation string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Section,
    Page,
    FigureOrTable,
}

/// How strongly a reference was confirmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Not found anywhere.
    Low,
    /// Whole-word match in the paper text only.
    Medium,
    /// Present in at least one retrieved chunk.
    High,
}

/// One structural reference pulled out of the citation string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CitationReference {
    pub reference_type: ReferenceType,
    /// Matched keyword, lower-cased, trailing period removed (e.g. "sec", "fig", "§").
    pub keyword: String,
    /// The numeral or range that was cited (e.g. "3.2", "12–13").
    pub reference_value: String,
    pub found_in_source: bool,
    pub found_in_chunks: bool,
    pub confidence: Confidence,
}

impl CitationReference {
    pub fn found(&self) -> bool {
        self.found_in_source || self.found_in_chunks
    }

    /// Human-readable label such as "section 3.1".
    pub fn label(&self) -> String {
        format!("{} {}", self.keyword, self.reference_value)
    }
}

/// Qualitative outcome of the citation check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStatus {
    HighRisk,
    MediumRisk,
    LowRisk,
    /// No answer to check citations for.
    Skipped,
}

impl CitationStatus {
    /// Status label for a computed score.
    pub fn from_score(score: f64) -> Self {
        if score > 0.5 {
            Self::HighRisk
        } else if score > 0.2 {
            Self::MediumRisk
        } else {
            Self::LowRisk
        }
    }
}

/// Full citation verifier output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CitationDetails {
    pub score: f64,
    pub verified_citations: Vec<CitationReference>,
    pub citation_present: bool,
    pub status: CitationStatus,
    pub citations_verified: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CitationDetails {
    pub fn component_score(&self) -> f64 {
        self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_thresholds_are_strict() {
        assert_eq!(CitationStatus::from_score(0.0), CitationStatus::LowRisk);
        assert_eq!(CitationStatus::from_score(0.2), CitationStatus::LowRisk);
        assert_eq!(CitationStatus::from_score(0.21), CitationStatus::MediumRisk);
        assert_eq!(CitationStatus::from_score(0.5), CitationStatus::MediumRisk);
        assert_eq!(CitationStatus::from_score(0.7), CitationStatus::HighRisk);
    }

    #[test]
    fn test_reference_serializes_snake_case() {
        let r = CitationReference {
            reference_type: ReferenceType::FigureOrTable,
            keyword: "fig".into(),
            reference_value: "2".into(),
            found_in_source: true,
            found_in_chunks: false,
            confidence: Confidence::Medium,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["reference_type"], "figure_or_table");
        assert_eq!(v["confidence"], "medium");
        assert!(r.found());
        assert_eq!(r.label(), "fig 2");
    }
}
