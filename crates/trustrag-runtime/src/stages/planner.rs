//! Planner: a short reasoning trace for the request.
//!
//! The plan is advisory. An empty or failed plan never blocks the
//! request; the orchestrator degrades to an empty plan instead.

use std::sync::Arc;

use trustrag_core::{EvidenceItem, PlanStep};

use super::StageError;
use crate::client::ModelClient;
use crate::prompts::PLANNER_SYSTEM_PROMPT;
use crate::providers::ChatMessage;

pub struct Planner {
    client: Arc<ModelClient>,
}

impl Planner {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    pub async fn plan(
        &self,
        query: &str,
        evidence: &[EvidenceItem],
    ) -> Result<Vec<PlanStep>, StageError> {
        let mut request = String::new();
        if !evidence.is_empty() {
            request.push_str("Available documents:\n");
            for item in evidence {
                request.push_str(&format!("- {}\n", item.source_id));
            }
            request.push('\n');
        }
        request.push_str("Question: ");
        request.push_str(query);

        let text = self
            .client
            .generate(vec![
                ChatMessage::system(PLANNER_SYSTEM_PROMPT),
                ChatMessage::user(request),
            ])
            .await?;

        Ok(parse_steps(&text))
    }
}

/// Parse plan steps from model output, one step per non-empty line.
/// Leading list prefixes (`1.`, `1)`, `-`, `*`) are stripped. Lines
/// that are only a prefix are dropped; an unlistable output yields an
/// empty plan rather than an error.
pub fn parse_steps(text: &str) -> Vec<PlanStep> {
    text.lines()
        .filter_map(|line| {
            let step = strip_list_prefix(line.trim());
            if step.is_empty() {
                None
            } else {
                Some(PlanStep::new(step))
            }
        })
        .collect()
}

fn strip_list_prefix(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix(['-', '*']) {
        return rest.trim();
    }
    let after_digits = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if after_digits.len() < line.len() {
        if let Some(rest) = after_digits.strip_prefix(['.', ')']) {
            return rest.trim();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered_steps() {
        let steps = parse_steps("1. Find the definition\n2) Check the scope\n");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].description, "Find the definition");
        assert_eq!(steps[1].description, "Check the scope");
    }

    #[test]
    fn test_parse_bulleted_steps() {
        let steps = parse_steps("- first\n* second");
        assert_eq!(steps[0].description, "first");
        assert_eq!(steps[1].description, "second");
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let steps = parse_steps("\n1. only step\n\n");
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_unlisted_prose_becomes_one_step_per_line() {
        let steps = parse_steps("Check the source documents first.");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].description, "Check the source documents first.");
    }

    #[test]
    fn test_leading_number_without_delimiter_is_kept() {
        let steps = parse_steps("2024 figures need verification");
        assert_eq!(steps[0].description, "2024 figures need verification");
    }

    #[test]
    fn test_empty_output_is_empty_plan() {
        assert!(parse_steps("").is_empty());
        assert!(parse_steps("  \n\n").is_empty());
    }
}
