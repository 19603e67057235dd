//! Parsing of free-form LLM output into oracle results.

use serde::Deserialize;
use serde_json::Value;

use paperverify_common::types::{Chunk, NliJudgment, NliVerdict};

use super::OracleError;

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json", "JSON", ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the first JSON value found in an LLM response.
fn parse_json_value(text: &str) -> Result<Value, OracleError> {
    let body = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Ok(value);
    }

    // Models sometimes wrap the JSON in prose; try the outermost bracketed span.
    let start = body.find(['[', '{']);
    let end = body.rfind([']', '}']);
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&body[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(OracleError::Malformed(format!(
        "no JSON found in response: {}",
        preview(body)
    )))
}

/// Parse an extraction response: a JSON array of strings, or `{"claims": [...]}`.
/// Blank claims are dropped.
pub fn parse_claims(text: &str) -> Result<Vec<String>, OracleError> {
    let value = parse_json_value(text)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("claims") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(OracleError::Malformed(
                    "expected a JSON array of claims".into(),
                ))
            }
        },
        _ => {
            return Err(OracleError::Malformed(
                "expected a JSON array of claims".into(),
            ))
        }
    };

    let mut claims = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    claims.push(s.to_string());
                }
            }
            other => {
                return Err(OracleError::Malformed(format!(
                    "claim is not a string: {}",
                    other
                )))
            }
        }
    }

    Ok(claims)
}

#[derive(Deserialize)]
struct WireJudgment {
    verdict: String,
    #[serde(default)]
    explanation: String,
}

/// Parse an inference response: `{"verdict": ..., "explanation": ...}`.
pub fn parse_judgment(text: &str) -> Result<NliJudgment, OracleError> {
    let value = parse_json_value(text)?;
    let wire: WireJudgment = serde_json::from_value(value)
        .map_err(|e| OracleError::Malformed(format!("invalid verdict object: {}", e)))?;

    let verdict = parse_verdict(&wire.verdict).ok_or_else(|| {
        OracleError::Malformed(format!("unknown verdict: {}", wire.verdict))
    })?;

    Ok(NliJudgment {
        verdict,
        explanation: wire.explanation.trim().to_string(),
    })
}

/// Case-insensitive verdict parsing with a few common synonyms.
pub fn parse_verdict(raw: &str) -> Option<NliVerdict> {
    let normalized = raw.trim().to_uppercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "SUPPORTED" | "ENTAILED" => Some(NliVerdict::Supported),
        "CONTRADICTED" => Some(NliVerdict::Contradicted),
        "NOT_MENTIONED" | "NO_EVIDENCE" | "NEUTRAL" => Some(NliVerdict::NotMentioned),
        _ => None,
    }
}

/// Extract the answer part of an "Answer: ... Citations: ..." response.
/// Falls back to the whole response when there is no "Answer:" marker.
pub fn split_answer(response: &str) -> String {
    let Some(pos) = response.find("Answer:") else {
        return response.trim().to_string();
    };
    let after = &response[pos + "Answer:".len()..];
    let end = after.find("Citations:").unwrap_or(after.len());
    after[..end].trim().to_string()
}

/// Render chunks as `[Chunk i]: content` blocks for an answer prompt.
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let idx = chunk.chunk_index().unwrap_or_else(|| "unknown".into());
            format!("[Chunk {}]: {}", idx, chunk.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
