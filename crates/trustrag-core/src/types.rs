//! Core data model for the answer pipeline.
//!
//! Everything here is plain data: produced by one stage, carried
//! forward by the orchestrator, and assembled into an immutable
//! [`ResponseBundle`] at the end of a request.

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

use crate::checklist::{RiskCategory, Severity};

/// Pipeline mode: selects which stages execute for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Direct model answer, no retrieval.
    Baseline,

    /// Retrieval-grounded answer.
    Rag,

    /// Retrieval + planner + critic + safe rewrite.
    Responsible,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Baseline, Mode::Rag, Mode::Responsible];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Baseline => "baseline",
            Mode::Rag => "rag",
            Mode::Responsible => "responsible",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection of an unrecognized mode string, before any stage runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid mode: '{0}' (expected baseline, rag, or responsible)")]
pub struct ModeParseError(pub String);

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baseline" => Ok(Mode::Baseline),
            "rag" => Ok(Mode::Rag),
            "responsible" => Ok(Mode::Responsible),
            _ => Err(ModeParseError(s.to_string())),
        }
    }
}

/// A retrieved evidence snippet.
///
/// Referenced, never mutated, by the grounder and the trust scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Source identifier, e.g. `"eu_ai_act.txt#5"`.
    pub source_id: String,

    /// The snippet text.
    pub text: String,

    /// 1-based relevance rank within the request.
    pub rank: usize,

    /// Retriever similarity score in [0, 1].
    pub similarity: f64,
}

/// A draft answer produced by the grounder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Stable digest of the draft text; the rewrite's
    /// [`FinalAnswer::based_on_draft`] points back at this.
    pub id: String,

    /// Draft text, with `[S<n>]` citation markers when evidence was
    /// available.
    pub text: String,

    /// Source ids of evidence actually cited in the text, in first
    /// appearance order, deduplicated.
    pub cited_evidence_ids: Vec<String>,
}

impl Draft {
    pub fn new(text: impl Into<String>, cited_evidence_ids: Vec<String>) -> Self {
        let text = text.into();
        Self {
            id: digest(&text),
            text,
            cited_evidence_ids,
        }
    }
}

fn digest(text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("draft-{:016x}", hasher.finish())
}

/// One step of the planner's reasoning trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
}

impl PlanStep {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A risk the critic found in a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub category: RiskCategory,

    /// What was observed in the draft.
    pub description: String,

    /// Why it matters to the user.
    pub impact: String,

    /// Concrete suggestion for the rewrite.
    pub mitigation: String,

    pub severity: Severity,
}

/// The critic's structured review of a draft.
///
/// Coverage is total over [`RiskCategory::CHECKLIST`]: every category
/// has a score, and a category without a finding means no risk was
/// detected there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticReview {
    /// Findings ordered by descending severity, then checklist order.
    pub findings: Vec<RiskFinding>,

    /// Per-category scores in [0, 1], one entry per checklist category.
    pub category_scores: BTreeMap<RiskCategory, f64>,

    /// Plain-language assessment.
    pub summary: String,
}

impl CriticReview {
    /// Sort findings into the canonical order: descending severity,
    /// ties broken by checklist position.
    pub fn sort_findings(&mut self) {
        self.findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.category.checklist_index().cmp(&b.category.checklist_index()))
        });
    }

    /// Highest severity across findings (`Severity::None` when clean).
    pub fn max_severity(&self) -> Severity {
        self.findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::None)
    }

    /// Categories flagged at high severity.
    pub fn high_severity_categories(&self) -> Vec<RiskCategory> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::High)
            .map(|f| f.category)
            .collect()
    }
}

/// The answer returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub text: String,

    /// Id of the draft this answer descends from.
    pub based_on_draft: String,
}

/// A bounded trust score, or the unknown sentinel.
///
/// `Unknown` means the signal was never evaluated (for example the
/// critic output could not be parsed). It is deliberately distinct
/// from a real low score and must never be averaged away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Known(f64),
    Unknown,
}

impl Score {
    /// A known score, clamped to [0, 1].
    pub fn known(value: f64) -> Self {
        Score::Known(value.clamp(0.0, 1.0))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Score::Unknown)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Known(v) => Some(*v),
            Score::Unknown => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Known(v) => write!(f, "{:.2}", v),
            Score::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Known(v) => serializer.serialize_f64(*v),
            Score::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreVisitor;

        impl<'de> Visitor<'de> for ScoreVisitor {
            type Value = Score;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number in [0, 1] or the string \"unknown\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Score, E> {
                Ok(Score::known(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Score, E> {
                Ok(Score::known(v as f64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Score, E> {
                Ok(Score::known(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Score, E> {
                if v == "unknown" {
                    Ok(Score::Unknown)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(ScoreVisitor)
    }
}

/// Four-part reliability summary attached to every completed bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustSnapshot {
    /// Function of the other three fields plus risk severities;
    /// unknown whenever safety is unknown.
    pub overall: Score,

    /// How traceable the answer is to cited evidence.
    pub grounding: Score,

    /// How thoroughly risks were evaluated and mitigated.
    pub safety: Score,

    /// Strength of the retrieved evidence itself.
    pub evidence: Score,
}

/// A recoverable stage failure the orchestrator absorbed.
///
/// Degradations are recorded on the bundle so a reduced-confidence
/// answer is never mistaken for a clean one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Retriever failed; the request proceeded with empty evidence.
    RetrievalUnavailable { reason: String },

    /// Planner failed; the request proceeded with an empty plan.
    PlannerFailed { reason: String },

    /// Critic output was missing or unparseable; findings are empty
    /// and the safety score is the unknown sentinel.
    CriticUnparseable { reason: String },
}

/// States of the per-request pipeline state machine.
///
/// Also used as the cancellation marker: a cancelled bundle records
/// the last stage that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Retrieving,
    Drafting,
    Planning,
    Critiquing,
    Rewriting,
    Scoring,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Retrieving => "retrieving",
            Stage::Drafting => "drafting",
            Stage::Planning => "planning",
            Stage::Critiquing => "critiquing",
            Stage::Rewriting => "rewriting",
            Stage::Scoring => "scoring",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// All stages for the mode ran to completion.
    Completed,

    /// The caller cancelled; `after` is the last stage that finished
    /// before the signal was observed.
    Cancelled { after: Stage },
}

impl Outcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled { .. })
    }
}

/// Everything a request produced, assembled once and returned to the
/// caller. Optional fields are absent either because the mode skips
/// the producing stage or because the request was cancelled first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBundle {
    pub query: String,
    pub mode: Mode,
    pub evidence: Vec<EvidenceItem>,
    pub plan: Vec<PlanStep>,
    pub draft: Option<Draft>,
    pub findings: Vec<RiskFinding>,
    pub critic_summary: Option<String>,
    pub final_answer: Option<FinalAnswer>,
    pub trust: Option<TrustSnapshot>,
    pub degradations: Vec<Degradation>,
    pub outcome: Outcome,
    pub created_at: DateTime<Utc>,
}

impl ResponseBundle {
    /// Whether the bundle represents a completed (possibly degraded)
    /// request with a final answer.
    pub fn is_complete(&self) -> bool {
        self.outcome == Outcome::Completed && self.final_answer.is_some()
    }

    /// Source ids of all evidence items in the bundle.
    pub fn evidence_ids(&self) -> Vec<&str> {
        self.evidence.iter().map(|e| e.source_id.as_str()).collect()
    }
}
