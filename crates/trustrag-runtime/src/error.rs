//! Terminal pipeline errors.
//!
//! Most stage failures degrade rather than abort; the ones that reach
//! the caller as an `Err` are listed here. Everything recoverable is
//! recorded on the bundle as a [`trustrag_core::Degradation`] instead.

use thiserror::Error;
use trustrag_core::{ModeParseError, Stage};

use crate::stages::StageError;

/// Errors that abort a request.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage the request cannot complete without (drafting or
    /// rewriting) failed even after a retry.
    #[error("generation failed in {stage} stage: {source}")]
    GenerationFailed {
        stage: Stage,
        #[source]
        source: StageError,
    },

    /// The requested mode string is not one of the supported modes.
    /// Rejected before any stage runs.
    #[error(transparent)]
    InvalidMode(#[from] ModeParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generation_failed_names_the_stage() {
        let err = PipelineError::GenerationFailed {
            stage: Stage::Drafting,
            source: StageError::Timeout(Duration::from_secs(20)),
        };
        assert!(err.to_string().contains("drafting"));
    }

    #[test]
    fn test_invalid_mode_converts() {
        let err: PipelineError = ModeParseError("turbo".to_string()).into();
        assert!(err.to_string().contains("turbo"));
    }
}
