use serde::Serialize;

use super::chunk::Chunk;

/// Structurally invalid verification input.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InputError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("retrieved_chunks[{index}].relevance_score must be within [0, 1], got {score}")]
    InvalidRelevanceScore { index: usize, score: f64 },
}

/// Everything the verification pipeline needs about one answered question.
///
/// Built once per question and only ever borrowed afterwards. Construct it
/// through [`VerificationInput::new`] so the structural checks run.
#[derive(Clone, Debug, Serialize)]
pub struct VerificationInput {
    question: String,
    source_text: String,
    answer: String,
    citations: String,
    retrieved_chunks: Vec<Chunk>,
}

impl VerificationInput {
    pub fn new(
        question: impl Into<String>,
        source_text: impl Into<String>,
        answer: impl Into<String>,
        citations: Option<String>,
        retrieved_chunks: Vec<Chunk>,
    ) -> Result<Self, InputError> {
        let question = question.into();
        let answer = answer.into();

        if question.trim().is_empty() && !answer.is_empty() {
            return Err(InputError::MissingField("question"));
        }

        for (index, chunk) in retrieved_chunks.iter().enumerate() {
            let score = chunk.relevance_score;
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(InputError::InvalidRelevanceScore { index, score });
            }
        }

        Ok(Self {
            question,
            source_text: source_text.into(),
            answer,
            citations: citations.unwrap_or_default(),
            retrieved_chunks,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Citation text produced with the answer. Empty when none was given.
    pub fn citations(&self) -> &str {
        &self.citations
    }

    pub fn retrieved_chunks(&self) -> &[Chunk] {
        &self.retrieved_chunks
    }

    /// Whether an answer was produced. Only the empty string counts as none;
    /// whitespace is still an answer and goes through every check.
    pub fn has_answer(&self) -> bool {
        !self.answer.is_empty()
    }

    /// Newline-joined chunk contents, the context blob for claim verification.
    pub fn joined_context(&self) -> String {
        self.retrieved_chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
