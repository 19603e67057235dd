use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RequestId;
use crate::types::{Chunk, ComprehensiveVerdict, InputError, VerificationInput};

/// POST /verify request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<String>,
    #[serde(default)]
    pub retrieved_chunks: Vec<Chunk>,
}

impl TryFrom<VerifyRequest> for VerificationInput {
    type Error = InputError;

    fn try_from(req: VerifyRequest) -> Result<Self, Self::Error> {
        let source_text = req
            .source_text
            .ok_or(InputError::MissingField("source_text"))?;
        let answer = req.answer.ok_or(InputError::MissingField("answer"))?;

        VerificationInput::new(
            req.question.unwrap_or_default(),
            source_text,
            answer,
            req.citations,
            req.retrieved_chunks,
        )
    }
}

/// POST /verify response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub request_id: RequestId,
    pub completed_at: DateTime<Utc>,
    pub verdict: ComprehensiveVerdict,
}
