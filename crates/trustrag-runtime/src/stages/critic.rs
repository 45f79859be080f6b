//! Critic: reviews a draft against the risk checklist.
//!
//! The critic runs at temperature 0 and must return one JSON object.
//! Models wrap JSON in prose or fences often enough that parsing is
//! two-phase: strict first, then a recovery pass over the outermost
//! brace-delimited substring. Entries with unrecognized categories or
//! severities are skipped with a warning; coverage over the checklist
//! is reconstructed locally, so a skipped entry reads as "no risk
//! detected" for its category.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use trustrag_core::{CriticReview, Draft, EvidenceItem, RiskCategory, RiskFinding, Severity};

use super::StageError;
use crate::client::ModelClient;
use crate::prompts::critic_system_prompt;
use crate::providers::ChatMessage;

pub struct Critic {
    client: Arc<ModelClient>,
}

impl Critic {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    pub async fn review(
        &self,
        query: &str,
        draft: &Draft,
        evidence: &[EvidenceItem],
    ) -> Result<CriticReview, StageError> {
        let mut request = String::new();
        if !evidence.is_empty() {
            request.push_str("Documents:\n");
            for item in evidence {
                request.push_str(&format!(
                    "[S{}] (from {})\n{}\n\n",
                    item.rank, item.source_id, item.text
                ));
            }
        } else {
            request.push_str("No documents were retrieved for this question.\n\n");
        }
        request.push_str(&format!("Question: {query}\n\nDraft answer:\n{}", draft.text));

        let raw = self
            .client
            .generate_at(
                vec![
                    ChatMessage::system(critic_system_prompt()),
                    ChatMessage::user(request),
                ],
                0.0,
            )
            .await?;

        parse_review(&raw)
    }
}

#[derive(Deserialize)]
struct RawReview {
    #[serde(default)]
    categories: Vec<RawEntry>,
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct RawEntry {
    category: String,
    severity: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    impact: String,
    #[serde(default)]
    mitigation: String,
}

/// Parse the critic's raw output into a [`CriticReview`].
///
/// Returns [`StageError::Malformed`] only when no JSON object can be
/// recovered at all; the orchestrator then degrades to unknown safety.
pub fn parse_review(raw: &str) -> Result<CriticReview, StageError> {
    let parsed: RawReview = match serde_json::from_str(raw) {
        Ok(review) => review,
        Err(first_err) => {
            let candidate = outermost_object(raw).ok_or_else(|| {
                StageError::Malformed(format!("critic output has no JSON object: {first_err}"))
            })?;
            serde_json::from_str(candidate).map_err(|e| {
                StageError::Malformed(format!("critic JSON does not match the contract: {e}"))
            })?
        }
    };

    let mut findings = Vec::new();
    let mut category_scores: BTreeMap<RiskCategory, f64> = RiskCategory::CHECKLIST
        .iter()
        .map(|c| (*c, Severity::None.category_score()))
        .collect();

    for entry in parsed.categories {
        let Ok(category) = entry.category.parse::<RiskCategory>() else {
            tracing::warn!(category = %entry.category, "skipping finding with unknown category");
            continue;
        };
        let Ok(severity) = entry.severity.parse::<Severity>() else {
            tracing::warn!(severity = %entry.severity, "skipping finding with unknown severity");
            continue;
        };

        category_scores.insert(category, severity.category_score());
        if severity > Severity::None {
            findings.push(RiskFinding {
                category,
                description: entry.description,
                impact: entry.impact,
                mitigation: entry.mitigation,
                severity,
            });
        }
    }

    let mut review = CriticReview {
        findings,
        category_scores,
        summary: parsed.summary,
    };
    review.sort_findings();
    Ok(review)
}

/// The substring from the first `{` to the last `}`, when both exist.
fn outermost_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{"categories": [
        {"category": "unsupported_claim", "severity": "none", "description": "", "impact": "", "mitigation": ""},
        {"category": "missing_caveat", "severity": "high", "description": "no jurisdiction caveat", "impact": "reader may over-apply", "mitigation": "state the jurisdiction"}
    ], "summary": "one high risk"}"#;

    #[test]
    fn test_parse_strict_json() {
        let review = parse_review(CLEAN).unwrap();
        assert_eq!(review.findings.len(), 1);
        assert_eq!(review.findings[0].category, RiskCategory::MissingCaveat);
        assert_eq!(review.findings[0].severity, Severity::High);
        assert_eq!(review.summary, "one high risk");
    }

    #[test]
    fn test_parse_recovers_from_surrounding_prose() {
        let wrapped = format!("Here is my review:\n```json\n{CLEAN}\n```\nDone.");
        let review = parse_review(&wrapped).unwrap();
        assert_eq!(review.findings.len(), 1);
    }

    #[test]
    fn test_coverage_is_total_over_the_checklist() {
        let review = parse_review(CLEAN).unwrap();
        assert_eq!(review.category_scores.len(), RiskCategory::CHECKLIST.len());
        assert_eq!(
            review.category_scores[&RiskCategory::MissingCaveat],
            Severity::High.category_score()
        );
        // Unmentioned categories read as clean.
        assert_eq!(review.category_scores[&RiskCategory::HarmPotential], 1.0);
    }

    #[test]
    fn test_unknown_category_is_skipped_not_fatal() {
        let raw = r#"{"categories": [
            {"category": "vibes", "severity": "high", "description": "", "impact": "", "mitigation": ""},
            {"category": "speculative_content", "severity": "low", "description": "d", "impact": "i", "mitigation": "m"}
        ], "summary": "s"}"#;
        let review = parse_review(raw).unwrap();
        assert_eq!(review.findings.len(), 1);
        assert_eq!(review.findings[0].category, RiskCategory::SpeculativeContent);
    }

    #[test]
    fn test_unknown_severity_is_skipped_not_fatal() {
        let raw = r#"{"categories": [
            {"category": "harm_potential", "severity": "catastrophic", "description": "", "impact": "", "mitigation": ""}
        ], "summary": ""}"#;
        let review = parse_review(raw).unwrap();
        assert!(review.findings.is_empty());
        // Skipped entry leaves the category at its clean default.
        assert_eq!(review.category_scores[&RiskCategory::HarmPotential], 1.0);
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = parse_review("I could not review this draft.").unwrap_err();
        assert!(matches!(err, StageError::Malformed(_)));
    }

    #[test]
    fn test_braces_without_the_contract_are_malformed() {
        let err = parse_review(r#"{"verdict": ["fine"#).unwrap_err();
        assert!(matches!(err, StageError::Malformed(_)));
    }

    proptest::proptest! {
        #[test]
        fn prop_parse_review_never_panics(raw in "\\PC{0,200}") {
            let _ = parse_review(&raw);
        }
    }

    #[test]
    fn test_findings_come_back_sorted() {
        let raw = r#"{"categories": [
            {"category": "actionability_gap", "severity": "low", "description": "", "impact": "", "mitigation": ""},
            {"category": "unsupported_claim", "severity": "medium", "description": "", "impact": "", "mitigation": ""}
        ], "summary": ""}"#;
        let review = parse_review(raw).unwrap();
        assert_eq!(review.findings[0].severity, Severity::Medium);
        assert_eq!(review.findings[1].severity, Severity::Low);
    }
}
