//! Structural citation checks: do the sections, pages, figures and tables an
//! answer cites actually exist in the paper?

use regex::Regex;

use paperverify_common::types::{
    CitationDetails, CitationReference, CitationStatus, Confidence, ReferenceType,
    VerificationInput, NEUTRAL_SCORE,
};

/// Citation strings that mean "no citation was given".
const PLACEHOLDER_CITATIONS: &[&str] = &[
    "not provided",
    "none",
    "no citations",
    "no relevant sections",
    "not explicitly stated in paper",
];

/// Floor applied to the score when an answer comes without any citation.
pub const MISSING_CITATION_FLOOR: f64 = 0.7;

/// Extracts section/page/figure references and checks them against the paper.
pub struct CitationVerifier {
    patterns: Vec<(ReferenceType, Regex)>,
}

impl Default for CitationVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CitationVerifier {
    pub fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("static citation pattern");
        Self {
            patterns: vec![
                (
                    ReferenceType::Section,
                    compile(r"(?i)(section|sec\.?|§)\s*(\d+(?:\.\d+)*)"),
                ),
                (
                    ReferenceType::Page,
                    compile(r"(?i)(p\.|pp\.|page)\s*(\d+(?:\s*[–-]\s*\d+)?)"),
                ),
                (
                    ReferenceType::FigureOrTable,
                    compile(r"(?i)(fig\.|figure|table|tbl\.)\s*(\d+(?:\.\d+)*)"),
                ),
            ],
        }
    }

    /// Score the citations of `input`. Never fails.
    pub fn verify(&self, input: &VerificationInput) -> CitationDetails {
        let citations = input.citations();
        let citation_present = !is_absent(citations);

        if !input.has_answer() {
            return CitationDetails {
                score: NEUTRAL_SCORE,
                verified_citations: Vec::new(),
                citation_present,
                status: CitationStatus::Skipped,
                citations_verified: 0,
                reason: Some("No answer to verify".into()),
            };
        }

        let chunk_texts: Vec<String> = input
            .retrieved_chunks()
            .iter()
            .map(|c| c.content.to_lowercase())
            .collect();

        let references: Vec<CitationReference> = self
            .extract(citations)
            .into_iter()
            .map(|(reference_type, keyword, value)| {
                check_reference(reference_type, keyword, value, input.source_text(), &chunk_texts)
            })
            .collect();

        let unfound = references.iter().filter(|r| !r.found()).count();
        let mut score = if references.is_empty() {
            0.0
        } else {
            unfound as f64 / references.len() as f64
        };

        if !citation_present {
            score = score.max(MISSING_CITATION_FLOOR);
        }

        tracing::debug!(
            references = references.len(),
            unfound,
            citation_present,
            score,
            "Citation verification complete"
        );

        CitationDetails {
            score,
            citations_verified: references.len(),
            verified_citations: references,
            citation_present,
            status: CitationStatus::from_score(score),
            reason: None,
        }
    }

    /// One reference per match, in order of appearance, as `(type, keyword, value)`.
    /// A repeated type and value reuses the keyword of its first match.
    fn extract(&self, citations: &str) -> Vec<(ReferenceType, String, String)> {
        let mut found: Vec<(usize, ReferenceType, String, String)> = Vec::new();

        for (reference_type, re) in &self.patterns {
            for caps in re.captures_iter(citations) {
                let (Some(whole), Some(keyword), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                let keyword = keyword.as_str().to_lowercase();
                let keyword = keyword.trim_end_matches('.').to_string();
                found.push((whole.start(), *reference_type, keyword, value.as_str().to_string()));
            }
        }

        found.sort_by_key(|(start, ..)| *start);

        let mut out: Vec<(ReferenceType, String, String)> = Vec::with_capacity(found.len());
        for (_, reference_type, keyword, value) in found {
            let keyword = out
                .iter()
                .find(|(t, _, v)| *t == reference_type && *v == value)
                .map(|(_, k, _)| k.clone())
                .unwrap_or(keyword);
            out.push((reference_type, keyword, value));
        }
        out
    }
}

fn check_reference(
    reference_type: ReferenceType,
    keyword: String,
    reference_value: String,
    source_text: &str,
    chunk_texts: &[String],
) -> CitationReference {
    let in_source = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&reference_value)))
        .map(|re| re.is_match(source_text))
        .unwrap_or(false);

    let needle = reference_value.to_lowercase();
    let in_chunks = chunk_texts.iter().any(|c| c.contains(&needle));

    // A chunk hit counts as a source hit: chunks are spans of the source.
    let (found_in_source, found_in_chunks, confidence) = if in_chunks {
        (true, true, Confidence::High)
    } else if in_source {
        (true, false, Confidence::Medium)
    } else {
        (false, false, Confidence::Low)
    };

    CitationReference {
        reference_type,
        keyword,
        reference_value,
        found_in_source,
        found_in_chunks,
        confidence,
    }
}

/// Whether a citations string carries no citation at all.
pub fn is_absent(citations: &str) -> bool {
    let normalized = citations
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches('.')
        .trim()
        .to_lowercase();
    normalized.is_empty() || PLACEHOLDER_CITATIONS.contains(&normalized.as_str())
}
