//! Grounder: produces the draft answer.
//!
//! With evidence, the model sees the documents numbered `[S1]`,
//! `[S2]`, ... in rank order and is asked to cite with those markers.
//! The markers in its output are resolved locally; model output is
//! never trusted to name source ids itself. Without evidence the
//! grounder falls back to an uncited, knowledge-only draft.

use std::sync::Arc;

use trustrag_core::citations;
use trustrag_core::{Draft, EvidenceItem, PlanStep};

use super::StageError;
use crate::client::ModelClient;
use crate::prompts::{BASELINE_SYSTEM_PROMPT, DRAFT_SYSTEM_PROMPT};
use crate::providers::ChatMessage;

pub struct Grounder {
    client: Arc<ModelClient>,
}

impl Grounder {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    /// Draft an answer to `query`. `plan` is included as context when
    /// non-empty; `evidence` decides between the grounded and the
    /// knowledge-only prompt.
    pub async fn draft(
        &self,
        query: &str,
        evidence: &[EvidenceItem],
        plan: &[PlanStep],
    ) -> Result<Draft, StageError> {
        let messages = if evidence.is_empty() {
            vec![
                ChatMessage::system(BASELINE_SYSTEM_PROMPT),
                ChatMessage::user(query),
            ]
        } else {
            vec![
                ChatMessage::system(DRAFT_SYSTEM_PROMPT),
                ChatMessage::user(grounded_request(query, evidence, plan)),
            ]
        };

        let text = self.client.generate(messages).await?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(StageError::Malformed("empty draft".to_string()));
        }

        let cited = citations::resolve_citations(&text, evidence);
        tracing::debug!(cited = cited.len(), chars = text.len(), "draft produced");
        Ok(Draft::new(text, cited))
    }
}

fn grounded_request(query: &str, evidence: &[EvidenceItem], plan: &[PlanStep]) -> String {
    let mut request = String::from("Documents:\n");
    for item in evidence {
        request.push_str(&format!(
            "[S{}] (from {})\n{}\n\n",
            item.rank, item.source_id, item.text
        ));
    }

    if !plan.is_empty() {
        request.push_str("Answer plan:\n");
        for (i, step) in plan.iter().enumerate() {
            request.push_str(&format!("{}. {}\n", i + 1, step.description));
        }
        request.push('\n');
    }

    request.push_str("Question: ");
    request.push_str(query);
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(ids: &[&str]) -> Vec<EvidenceItem> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| EvidenceItem {
                source_id: id.to_string(),
                text: format!("snippet {i}"),
                rank: i + 1,
                similarity: 0.5,
            })
            .collect()
    }

    #[test]
    fn test_grounded_request_numbers_by_rank() {
        let request = grounded_request("q?", &evidence(&["a.txt#0", "b.txt#3"]), &[]);
        assert!(request.contains("[S1] (from a.txt#0)"));
        assert!(request.contains("[S2] (from b.txt#3)"));
        assert!(request.ends_with("Question: q?"));
    }

    #[test]
    fn test_grounded_request_includes_plan() {
        let plan = vec![PlanStep::new("identify the definition")];
        let request = grounded_request("q?", &evidence(&["a.txt#0"]), &plan);
        assert!(request.contains("Answer plan:\n1. identify the definition"));
    }
}
