//! Citation marker extraction and referential integrity.
//!
//! The grounder asks the model to mark claims with `[S<n>]`, where `n`
//! is the 1-based rank of an evidence item. Model output is not
//! trusted: markers are re-extracted here, out-of-range markers are
//! dropped, and assembled bundles are checked for dangling ids.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::types::{EvidenceItem, ResponseBundle};

lazy_static! {
    static ref MARKER_RE: Regex = Regex::new(r"\[S(\d+)\]").expect("Invalid regex");
}

/// Errors from citation validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CitationError {
    #[error("dangling citation: '{id}' is not in the bundle's evidence")]
    Dangling { id: String },

    #[error("dangling citation marker: [S{marker}] with only {evidence_count} evidence items")]
    DanglingMarker { marker: usize, evidence_count: usize },
}

/// Extract citation markers from text as 1-based evidence ranks, in
/// first-appearance order, deduplicated.
pub fn extract_markers(text: &str) -> Vec<usize> {
    let mut seen = Vec::new();
    for caps in MARKER_RE.captures_iter(text) {
        if let Ok(n) = caps[1].parse::<usize>() {
            if !seen.contains(&n) {
                seen.push(n);
            }
        }
    }
    seen
}

/// Resolve the markers in `text` to evidence source ids.
///
/// Markers that do not point at an evidence item are dropped with a
/// warning rather than surfaced as citations, so the result never
/// dangles.
pub fn resolve_citations(text: &str, evidence: &[EvidenceItem]) -> Vec<String> {
    extract_markers(text)
        .into_iter()
        .filter_map(|marker| {
            if marker >= 1 && marker <= evidence.len() {
                Some(evidence[marker - 1].source_id.clone())
            } else {
                tracing::warn!(marker, evidence_count = evidence.len(), "dropping out-of-range citation marker");
                None
            }
        })
        .collect()
}

/// Remove markers that do not point at an evidence item, leaving the
/// rest of the text untouched. Used on rewritten answers, which may
/// invent markers the draft never had.
pub fn strip_out_of_range_markers(text: &str, evidence_count: usize) -> String {
    MARKER_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            match caps[1].parse::<usize>() {
                Ok(n) if n >= 1 && n <= evidence_count => caps[0].to_string(),
                _ => {
                    tracing::warn!(marker = &caps[1], evidence_count, "stripping out-of-range citation marker");
                    String::new()
                }
            }
        })
        .into_owned()
}

/// Check that every cited id exists in the evidence sequence.
pub fn validate_citations(cited: &[String], evidence: &[EvidenceItem]) -> Result<(), CitationError> {
    for id in cited {
        if !evidence.iter().any(|e| &e.source_id == id) {
            return Err(CitationError::Dangling { id: id.clone() });
        }
    }
    Ok(())
}

/// Validate a whole bundle: the draft's cited ids and the final
/// answer's markers must all resolve within the bundle's evidence.
pub fn validate_bundle(bundle: &ResponseBundle) -> Result<(), CitationError> {
    if let Some(draft) = &bundle.draft {
        validate_citations(&draft.cited_evidence_ids, &bundle.evidence)?;
    }
    if let Some(answer) = &bundle.final_answer {
        for marker in extract_markers(&answer.text) {
            if marker < 1 || marker > bundle.evidence.len() {
                return Err(CitationError::DanglingMarker {
                    marker,
                    evidence_count: bundle.evidence.len(),
                });
            }
        }
    }
    Ok(())
}
