//! Single-shot top-k evidence retrieval.
//!
//! The retriever is deterministic: for a fixed corpus snapshot and
//! query, the ordered evidence sequence is always identical. Scoring
//! is lexical term-frequency cosine, which keeps retrieval free of
//! model calls and randomness. An empty result is a valid outcome
//! (low-evidence signal), not an error.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::corpus::Corpus;
use crate::types::EvidenceItem;

/// Errors from retrieval.
#[derive(Error, Debug, Clone)]
pub enum RetrievalError {
    /// The corpus backing the retriever is unavailable. The
    /// orchestrator degrades to empty evidence instead of aborting.
    #[error("corpus unavailable: {0}")]
    Unavailable(String),
}

/// Evidence lookup seam between the orchestrator and the corpus.
pub trait Retriever: Send + Sync {
    /// Return up to `k` evidence items ordered by descending
    /// relevance, rank ties broken by corpus insertion order.
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<EvidenceItem>, RetrievalError>;
}

/// Lexical retriever over an in-memory corpus snapshot.
pub struct CorpusRetriever {
    corpus: Arc<Corpus>,
}

impl CorpusRetriever {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }
}

impl From<Corpus> for CorpusRetriever {
    fn from(corpus: Corpus) -> Self {
        Self::new(Arc::new(corpus))
    }
}

impl Retriever for CorpusRetriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<EvidenceItem>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_tf = term_frequencies(query);
        if query_tf.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f64)> = self
            .corpus
            .chunks()
            .iter()
            .enumerate()
            .filter_map(|(idx, chunk)| {
                let score = cosine(&query_tf, &term_frequencies(&chunk.text));
                (score > 0.0).then_some((idx, score))
            })
            .collect();

        // Stable sort keeps corpus insertion order for equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        let chunks = self.corpus.chunks();
        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (idx, score))| EvidenceItem {
                source_id: chunks[idx].source_id.clone(),
                text: chunks[idx].text.clone(),
                rank: i + 1,
                similarity: score.clamp(0.0, 1.0),
            })
            .collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(|w| w.to_lowercase())
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut tf = HashMap::new();
    for token in tokenize(text) {
        *tf.entry(token).or_insert(0.0) += 1.0;
    }
    tf
}

fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, weight)| b.get(term).map(|other| weight * other))
        .sum();
    if dot == 0.0 {
        return 0.0;
    }

    let norm = |tf: &HashMap<String, f64>| tf.values().map(|v| v * v).sum::<f64>().sqrt();
    dot / (norm(a) * norm(b))
}
