//! The fixed risk checklist the critic evaluates against.
//!
//! The checklist is a closed, versioned enumeration. Every critic run
//! covers every category; a category absent from the findings means
//! "no risk detected", never "not evaluated". Keeping this closed (as
//! opposed to a bag of ad hoc category strings) is what lets the
//! parser and scorer handle it exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the risk checklist. Bump when categories are added,
/// removed, or their meaning changes.
pub const CHECKLIST_VERSION: &str = "1";

/// Risk categories the critic evaluates, in checklist order.
///
/// Declaration order is the tie-break order for findings of equal
/// severity, so reordering variants is a behavior change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// A factual claim with no support in the retrieved evidence.
    UnsupportedClaim,

    /// A caveat or limitation the answer should state but does not.
    MissingCaveat,

    /// Speculation presented as fact.
    SpeculativeContent,

    /// Content that could cause harm if acted on as written.
    HarmPotential,

    /// Bias, disparity, or fairness concerns the answer glosses over.
    FairnessConcern,

    /// The answer recommends action without the information needed to
    /// act on it responsibly.
    ActionabilityGap,
}

impl RiskCategory {
    /// All categories, in checklist order.
    pub const CHECKLIST: [RiskCategory; 6] = [
        RiskCategory::UnsupportedClaim,
        RiskCategory::MissingCaveat,
        RiskCategory::SpeculativeContent,
        RiskCategory::HarmPotential,
        RiskCategory::FairnessConcern,
        RiskCategory::ActionabilityGap,
    ];

    /// Position in the checklist (0-based).
    pub fn checklist_index(&self) -> usize {
        *self as usize
    }

    /// Snake_case identifier used in critic prompts and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::UnsupportedClaim => "unsupported_claim",
            RiskCategory::MissingCaveat => "missing_caveat",
            RiskCategory::SpeculativeContent => "speculative_content",
            RiskCategory::HarmPotential => "harm_potential",
            RiskCategory::FairnessConcern => "fairness_concern",
            RiskCategory::ActionabilityGap => "actionability_gap",
        }
    }

    /// The question this category asks of a draft, used verbatim in
    /// the critic prompt.
    pub fn question(&self) -> &'static str {
        match self {
            RiskCategory::UnsupportedClaim => {
                "Does the draft state facts that are not supported by any retrieved document?"
            }
            RiskCategory::MissingCaveat => {
                "Does the draft omit caveats or limitations a careful answer would state?"
            }
            RiskCategory::SpeculativeContent => {
                "Does the draft present speculation or extrapolation as established fact?"
            }
            RiskCategory::HarmPotential => {
                "Could following the draft as written cause harm to the user or others?"
            }
            RiskCategory::FairnessConcern => {
                "Does the draft ignore bias, disparity, or fairness issues raised by the question?"
            }
            RiskCategory::ActionabilityGap => {
                "Does the draft recommend action without the information needed to act responsibly?"
            }
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier outside the closed checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChecklistValue(pub String);

impl fmt::Display for UnknownChecklistValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown checklist value: '{}'", self.0)
    }
}

impl std::error::Error for UnknownChecklistValue {}

impl FromStr for RiskCategory {
    type Err = UnknownChecklistValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskCategory::CHECKLIST
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownChecklistValue(s.to_string()))
    }
}

/// Ordinal severity scale for a risk finding.
///
/// `None` means the category was evaluated and no risk was found; the
/// critic only emits a finding when severity is above `None`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Per-category score implied by this severity (1.0 = clean).
    pub fn category_score(&self) -> f64 {
        match self {
            Severity::None => 1.0,
            Severity::Low => 0.75,
            Severity::Medium => 0.45,
            Severity::High => 0.15,
        }
    }

    /// Safety penalty this severity contributes to the trust snapshot.
    pub fn penalty(&self) -> f64 {
        match self {
            Severity::None => 0.0,
            Severity::Low => 0.05,
            Severity::Medium => 0.15,
            Severity::High => 0.30,
        }
    }
}

impl FromStr for Severity {
    type Err = UnknownChecklistValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Severity::None),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(UnknownChecklistValue(other.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}
