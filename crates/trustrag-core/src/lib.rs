//! # trustrag-core
//!
//! Deterministic foundations for the trustrag answer pipeline.
//!
//! This crate holds everything that must be exactly reproducible:
//! - The request data model (queries, evidence, drafts, risk findings,
//!   trust snapshots, response bundles)
//! - Corpus loading and the lexical retriever
//! - Citation marker extraction and referential-integrity checks
//! - The trust scorer
//!
//! ## Key Guarantees
//!
//! 1. **No model calls**: nothing in this crate talks to an LLM
//! 2. **Deterministic**: same input always produces same output
//! 3. **No dangling citations**: every cited evidence id resolves to an
//!    item in the same bundle
//! 4. **Unknown is not zero**: an unevaluated safety score is a sentinel,
//!    never folded into an average
//!
//! The async, model-backed stages live in `trustrag-runtime`.

pub mod checklist;
pub mod citations;
pub mod corpus;
pub mod retriever;
pub mod trust;
pub mod types;

pub use checklist::{RiskCategory, Severity, CHECKLIST_VERSION};
pub use citations::{validate_bundle, CitationError};
pub use corpus::{Corpus, CorpusError};
pub use retriever::{CorpusRetriever, RetrievalError, Retriever};
pub use trust::{TrustInputs, TrustScorer};
pub use types::{
    CriticReview, Degradation, Draft, EvidenceItem, FinalAnswer, Mode, ModeParseError, Outcome,
    PlanStep, ResponseBundle, RiskFinding, Score, Stage, TrustSnapshot,
};
