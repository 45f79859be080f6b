//! Trust scoring: deterministic fan-in over the request's artifacts.
//!
//! The scorer is a pure function. It makes no model calls and, for a
//! fixed set of inputs, reproduces the exact same snapshot; regression
//! tests rely on that. An unevaluated safety signal stays
//! [`Score::Unknown`] and propagates to `overall` instead of being
//! averaged away.

use crate::checklist::Severity;
use crate::types::{EvidenceItem, RiskFinding, Score, TrustSnapshot};

/// Weight of the safety signal in the overall score.
const OVERALL_SAFETY_WEIGHT: f64 = 0.40;
/// Weight of the grounding signal in the overall score.
const OVERALL_GROUNDING_WEIGHT: f64 = 0.35;
/// Weight of the evidence signal in the overall score.
const OVERALL_EVIDENCE_WEIGHT: f64 = 0.25;
/// Overall penalty per high-severity finding left unmitigated.
const UNMITIGATED_HIGH_PENALTY: f64 = 0.10;

/// Inputs the scorer aggregates. All borrowed from the bundle under
/// assembly; the scorer never mutates them.
#[derive(Debug, Clone, Copy)]
pub struct TrustInputs<'a> {
    /// Retrieved evidence, ordered by rank.
    pub evidence: &'a [EvidenceItem],

    /// Evidence ids cited by the draft.
    pub cited_evidence_ids: &'a [String],

    /// Critic findings (empty when the critic found nothing or did
    /// not run).
    pub findings: &'a [RiskFinding],

    /// Whether the critic ran and produced a parseable review. When
    /// false, safety and overall become the unknown sentinel.
    pub safety_evaluated: bool,

    /// Whether the rewrite changed the draft text, i.e. the findings
    /// were addressed rather than ignored.
    pub rewrite_applied: bool,
}

/// Derives a [`TrustSnapshot`] from collected request artifacts.
pub struct TrustScorer;

impl TrustScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, inputs: &TrustInputs) -> TrustSnapshot {
        let evidence = self.evidence_score(inputs);
        let grounding = self.grounding_score(inputs, evidence);
        let safety = self.safety_score(inputs);
        let overall = self.overall_score(inputs, grounding, safety, evidence);

        TrustSnapshot {
            overall,
            grounding: Score::known(grounding),
            safety,
            evidence: Score::known(evidence),
        }
    }

    /// Strength of the retrieved evidence: the best similarity seen,
    /// or the lowest bound when nothing was retrieved.
    fn evidence_score(&self, inputs: &TrustInputs) -> f64 {
        inputs
            .evidence
            .iter()
            .map(|e| e.similarity)
            .fold(0.0, f64::max)
            .clamp(0.0, 1.0)
    }

    /// Traceability of the answer to cited evidence: mean of citation
    /// coverage and evidence strength. No evidence means no grounding.
    fn grounding_score(&self, inputs: &TrustInputs, evidence_score: f64) -> f64 {
        if inputs.evidence.is_empty() {
            return 0.0;
        }

        let cited = inputs
            .cited_evidence_ids
            .iter()
            .filter(|id| inputs.evidence.iter().any(|e| e.source_id == **id))
            .count();
        let coverage = cited as f64 / inputs.evidence.len() as f64;

        ((coverage + evidence_score) / 2.0).clamp(0.0, 1.0)
    }

    /// Safety: 1.0 minus severity penalties. Addressed findings cost
    /// half as much as ignored ones. Unknown when never evaluated.
    fn safety_score(&self, inputs: &TrustInputs) -> Score {
        if !inputs.safety_evaluated {
            return Score::Unknown;
        }

        let penalty: f64 = inputs.findings.iter().map(|f| f.severity.penalty()).sum();
        let penalty = if inputs.rewrite_applied {
            penalty / 2.0
        } else {
            penalty
        };

        Score::known(1.0 - penalty)
    }

    /// Weighted mean of the three signals, minus a penalty per
    /// unmitigated high-severity finding. Unknown safety propagates.
    fn overall_score(
        &self,
        inputs: &TrustInputs,
        grounding: f64,
        safety: Score,
        evidence: f64,
    ) -> Score {
        let safety = match safety.value() {
            Some(v) => v,
            None => return Score::Unknown,
        };

        let mut overall = OVERALL_SAFETY_WEIGHT * safety
            + OVERALL_GROUNDING_WEIGHT * grounding
            + OVERALL_EVIDENCE_WEIGHT * evidence;

        if !inputs.rewrite_applied {
            let high = inputs
                .findings
                .iter()
                .filter(|f| f.severity == Severity::High)
                .count();
            overall -= high as f64 * UNMITIGATED_HIGH_PENALTY;
        }

        Score::known(overall)
    }
}

impl Default for TrustScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::RiskCategory;
    use proptest::prelude::*;

    fn evidence_item(id: &str, rank: usize, similarity: f64) -> EvidenceItem {
        EvidenceItem {
            source_id: id.to_string(),
            text: "snippet".to_string(),
            rank,
            similarity,
        }
    }

    fn finding(severity: Severity) -> RiskFinding {
        RiskFinding {
            category: RiskCategory::MissingCaveat,
            description: "caveat missing".to_string(),
            impact: "overconfident answer".to_string(),
            mitigation: "state the limitation".to_string(),
            severity,
        }
    }

    #[test]
    fn test_no_evidence_means_lowest_grounding() {
        let snapshot = TrustScorer::new().score(&TrustInputs {
            evidence: &[],
            cited_evidence_ids: &[],
            findings: &[],
            safety_evaluated: false,
            rewrite_applied: false,
        });

        assert_eq!(snapshot.grounding, Score::Known(0.0));
        assert_eq!(snapshot.evidence, Score::Known(0.0));
        assert!(snapshot.safety.is_unknown());
        assert!(snapshot.overall.is_unknown());
    }

    #[test]
    fn test_cited_evidence_raises_grounding() {
        let evidence = vec![evidence_item("a#0", 1, 0.8), evidence_item("b#1", 2, 0.6)];
        let scorer = TrustScorer::new();

        let uncited = scorer.score(&TrustInputs {
            evidence: &evidence,
            cited_evidence_ids: &[],
            findings: &[],
            safety_evaluated: false,
            rewrite_applied: false,
        });
        let cited_ids = vec!["a#0".to_string()];
        let cited = scorer.score(&TrustInputs {
            evidence: &evidence,
            cited_evidence_ids: &cited_ids,
            findings: &[],
            safety_evaluated: false,
            rewrite_applied: false,
        });

        let (u, c) = (uncited.grounding.value().unwrap(), cited.grounding.value().unwrap());
        assert!(c > u);
        assert!(u > 0.0); // evidence strength still counts
    }

    #[test]
    fn test_mitigated_high_finding_scores_higher_than_ignored() {
        let evidence = vec![evidence_item("a#0", 1, 0.9)];
        let cited = vec!["a#0".to_string()];
        let findings = vec![finding(Severity::High)];
        let scorer = TrustScorer::new();

        let base = TrustInputs {
            evidence: &evidence,
            cited_evidence_ids: &cited,
            findings: &findings,
            safety_evaluated: true,
            rewrite_applied: false,
        };
        let ignored = scorer.score(&base);
        let mitigated = scorer.score(&TrustInputs {
            rewrite_applied: true,
            ..base
        });

        assert!(mitigated.safety.value().unwrap() > ignored.safety.value().unwrap());
        assert!(mitigated.overall.value().unwrap() > ignored.overall.value().unwrap());
    }

    #[test]
    fn test_unknown_safety_propagates_to_overall() {
        let evidence = vec![evidence_item("a#0", 1, 0.9)];
        let cited = vec!["a#0".to_string()];
        let snapshot = TrustScorer::new().score(&TrustInputs {
            evidence: &evidence,
            cited_evidence_ids: &cited,
            findings: &[],
            safety_evaluated: false,
            rewrite_applied: false,
        });

        assert!(snapshot.safety.is_unknown());
        assert!(snapshot.overall.is_unknown());
        // Grounding and evidence stay known.
        assert!(snapshot.grounding.value().is_some());
    }

    #[test]
    fn test_clean_review_scores_full_safety() {
        let snapshot = TrustScorer::new().score(&TrustInputs {
            evidence: &[],
            cited_evidence_ids: &[],
            findings: &[],
            safety_evaluated: true,
            rewrite_applied: false,
        });
        assert_eq!(snapshot.safety, Score::Known(1.0));
    }

    #[test]
    fn test_score_is_reproducible() {
        let evidence = vec![evidence_item("a#0", 1, 0.71), evidence_item("b#1", 2, 0.42)];
        let cited = vec!["b#1".to_string()];
        let findings = vec![finding(Severity::Medium), finding(Severity::Low)];
        let inputs = TrustInputs {
            evidence: &evidence,
            cited_evidence_ids: &cited,
            findings: &findings,
            safety_evaluated: true,
            rewrite_applied: true,
        };

        let scorer = TrustScorer::new();
        assert_eq!(scorer.score(&inputs), scorer.score(&inputs));
    }

    proptest! {
        #[test]
        fn prop_scores_stay_in_bounds(
            similarities in proptest::collection::vec(0.0f64..=1.0, 0..6),
            cite_first in any::<bool>(),
            severities in proptest::collection::vec(0usize..4, 0..6),
            safety_evaluated in any::<bool>(),
            rewrite_applied in any::<bool>(),
        ) {
            let evidence: Vec<EvidenceItem> = similarities
                .iter()
                .enumerate()
                .map(|(i, s)| evidence_item(&format!("doc#{i}"), i + 1, *s))
                .collect();
            let cited: Vec<String> = if cite_first && !evidence.is_empty() {
                vec![evidence[0].source_id.clone()]
            } else {
                vec![]
            };
            let findings: Vec<RiskFinding> = severities
                .iter()
                .map(|s| finding(match s {
                    0 => Severity::None,
                    1 => Severity::Low,
                    2 => Severity::Medium,
                    _ => Severity::High,
                }))
                .collect();

            let snapshot = TrustScorer::new().score(&TrustInputs {
                evidence: &evidence,
                cited_evidence_ids: &cited,
                findings: &findings,
                safety_evaluated,
                rewrite_applied,
            });

            for score in [snapshot.overall, snapshot.grounding, snapshot.safety, snapshot.evidence] {
                if let Some(v) = score.value() {
                    prop_assert!((0.0..=1.0).contains(&v));
                }
            }
            prop_assert_eq!(snapshot.safety.is_unknown(), !safety_evaluated);
            prop_assert_eq!(snapshot.overall.is_unknown(), !safety_evaluated);
        }
    }
}
