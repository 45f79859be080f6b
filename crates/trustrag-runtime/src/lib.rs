//! # trustrag-runtime
//!
//! Async, model-backed answer pipeline for trustrag.
//!
//! This crate orchestrates the model-backed stages (grounder, planner,
//! critic, rewriter) over the deterministic foundations in
//! `trustrag-core`, and assembles each request into a
//! [`trustrag_core::ResponseBundle`].
//!
//! ## Failure policy
//!
//! - Retrieval unavailable: degrade to empty evidence, never abort
//! - Grounder / rewriter failure: retry once, then fail the request
//! - Planner failure: degrade to an empty plan
//! - Critic failure or unparseable output: degrade to empty findings
//!   and an unknown safety score
//! - Cancellation: stop at the next state boundary and return the
//!   partial bundle with a cancellation marker
//!
//! Every degradation is recorded on the bundle; a request either
//! completes with a (possibly degraded, clearly marked) bundle or
//! fails with one terminal error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trustrag_core::{Corpus, CorpusRetriever, Mode};
//! use trustrag_runtime::{OpenAiProvider, Pipeline, PipelineConfig};
//!
//! let corpus = Corpus::load_dir("data")?;
//! let pipeline = Pipeline::new(
//!     Arc::new(OpenAiProvider::from_env()?),
//!     Arc::new(CorpusRetriever::from(corpus)),
//!     PipelineConfig::default(),
//! );
//! let result = pipeline.run("What is a high-risk AI system?", Mode::Responsible).await?;
//! println!("{}", result.bundle.final_answer.unwrap().text);
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod stages;

pub use client::{LlmUsage, ModelClient};
pub use config::{CacheSettings, PipelineConfig, StageTimeouts};
pub use error::PipelineError;
pub use harness::ModeComparison;
pub use orchestrator::{CancelToken, Pipeline, PipelineResult};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, ModelProvider, ProviderError, TokenUsage,
};

#[cfg(feature = "openai")]
pub use providers::OpenAiProvider;
