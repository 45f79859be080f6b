//! Model-backed pipeline stages.
//!
//! Each stage owns one prompt and one parsing contract. Stages are
//! stateless between requests; the orchestrator decides which stages a
//! mode runs, applies per-stage timeouts and retries, and absorbs the
//! failures that degrade instead of abort.

use std::time::Duration;
use thiserror::Error;

use crate::providers::ProviderError;

mod critic;
mod grounder;
mod planner;
mod rewriter;

pub use critic::{parse_review, Critic};
pub use grounder::Grounder;
pub use planner::{parse_steps, Planner};
pub use rewriter::Rewriter;

/// A single stage attempt failed.
#[derive(Error, Debug)]
pub enum StageError {
    /// The underlying model call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The stage exceeded its configured deadline.
    #[error("stage timed out after {0:?}")]
    Timeout(Duration),

    /// The model answered but the output does not satisfy the stage's
    /// contract. Retrying the same prompt is unlikely to help.
    #[error("malformed model output: {0}")]
    Malformed(String),
}

impl StageError {
    /// Whether a retry with the same inputs could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StageError::Malformed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures_are_retryable() {
        assert!(StageError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(
            StageError::Provider(ProviderError::HttpError("reset".to_string())).is_retryable()
        );
    }

    #[test]
    fn test_malformed_output_is_not_retryable() {
        assert!(!StageError::Malformed("not json".to_string()).is_retryable());
    }
}
