use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A bounded span of paper text returned by retrieval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// Free-form retrieval metadata. Carries `chunk_index` when known.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Retrieval relevance in [0, 1].
    pub relevance_score: f64,
}

impl Chunk {
    pub fn new(content: impl Into<String>, relevance_score: f64) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
            relevance_score,
        }
    }

    /// Attach a chunk index to the metadata.
    pub fn with_index(mut self, index: u64) -> Self {
        self.metadata
            .insert("chunk_index".into(), Value::from(index));
        self
    }

    /// The `chunk_index` metadata entry rendered as text, if present.
    pub fn chunk_index(&self) -> Option<String> {
        match self.metadata.get("chunk_index")? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Index of the chunk with the highest relevance score. First one wins ties.
pub fn most_relevant(chunks: &[Chunk]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, chunk) in chunks.iter().enumerate() {
        match best {
            Some((_, score)) if chunk.relevance_score <= score => {}
            _ => best = Some((i, chunk.relevance_score)),
        }
    }
    best.map(|(i, _)| i)
}
