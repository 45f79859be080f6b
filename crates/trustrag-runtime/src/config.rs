//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is an explicit immutable value handed to the
//! orchestrator at construction. Nothing in the runtime reads ambient
//! global state, so concurrent requests and tests can each use their
//! own configuration. Duration fields serialize as humantime strings
//! (`"15s"`, `"2m"`).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use trustrag_core::Stage;

/// Serde adapter for humantime-encoded durations.
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*d).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(d)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Per-stage timeouts for the model-backed stages.
///
/// Each stage call gets its own independent timeout; exceeding it is
/// treated like that stage's documented failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTimeouts {
    #[serde(with = "duration_str")]
    pub grounder: Duration,

    #[serde(with = "duration_str")]
    pub planner: Duration,

    #[serde(with = "duration_str")]
    pub critic: Duration,

    #[serde(with = "duration_str")]
    pub rewriter: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            grounder: Duration::from_secs(20),
            planner: Duration::from_secs(10),
            critic: Duration::from_secs(20),
            rewriter: Duration::from_secs(20),
        }
    }
}

impl StageTimeouts {
    /// Timeout for a model-backed stage. Non-model stages fall back to
    /// the grounder timeout; they never suspend long enough to hit it.
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Drafting => self.grounder,
            Stage::Planning => self.planner,
            Stage::Critiquing => self.critic,
            Stage::Rewriting => self.rewriter,
            _ => self.grounder,
        }
    }
}

/// Completion cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum cached completions.
    pub max_entries: u64,

    /// Time-to-live for a cached completion.
    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Immutable configuration for a [`crate::Pipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model identifier passed to the provider.
    pub model: String,

    /// Maximum tokens per completion.
    pub max_tokens: u32,

    /// Temperature for drafting stages. The critic always runs at 0.
    pub temperature: f32,

    /// Evidence items to retrieve per request.
    pub k: usize,

    /// When true, Planning runs before Drafting and the plan is passed
    /// to the grounder as additional context. When false (default),
    /// the plan is informational and Planning runs alongside
    /// Critiquing.
    pub plan_before_draft: bool,

    /// Per-stage timeouts.
    pub timeouts: StageTimeouts,

    /// Completion cache settings.
    pub cache: CacheSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            max_tokens: 800,
            temperature: 0.2,
            k: 3,
            plan_before_draft: false,
            timeouts: StageTimeouts::default(),
            cache: CacheSettings::default(),
        }
    }
}
