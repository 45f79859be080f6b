//! Rewriter: revises the draft to address critic findings.
//!
//! When the review is clean the rewrite is the identity: the draft
//! text is returned verbatim and no model call is made. When the model
//! does rewrite, any citation markers it invented beyond the evidence
//! range are stripped so the final answer never cites a document the
//! bundle does not carry.

use std::sync::Arc;

use trustrag_core::citations;
use trustrag_core::{CriticReview, Draft, FinalAnswer};

use super::StageError;
use crate::client::ModelClient;
use crate::prompts::REWRITE_SYSTEM_PROMPT;
use crate::providers::ChatMessage;

pub struct Rewriter {
    client: Arc<ModelClient>,
}

impl Rewriter {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    pub async fn rewrite(
        &self,
        query: &str,
        draft: &Draft,
        review: &CriticReview,
        evidence_count: usize,
    ) -> Result<FinalAnswer, StageError> {
        if review.findings.is_empty() {
            tracing::debug!("clean review, keeping draft verbatim");
            return Ok(FinalAnswer {
                text: draft.text.clone(),
                based_on_draft: draft.id.clone(),
            });
        }

        let mut request = format!("Question: {query}\n\nDraft answer:\n{}\n\nFindings:\n", draft.text);
        for finding in &review.findings {
            request.push_str(&format!(
                "- [{}] {}: {}. Mitigation: {}\n",
                finding.severity, finding.category, finding.description, finding.mitigation
            ));
        }

        let text = self
            .client
            .generate(vec![
                ChatMessage::system(REWRITE_SYSTEM_PROMPT),
                ChatMessage::user(request),
            ])
            .await?;

        let text = citations::strip_out_of_range_markers(text.trim(), evidence_count);
        if text.is_empty() {
            return Err(StageError::Malformed("empty rewrite".to_string()));
        }

        let kept = citations::extract_markers(&text);
        for marker in citations::extract_markers(&draft.text) {
            if !kept.contains(&marker) {
                tracing::warn!(marker, "rewrite dropped a citation the draft carried");
            }
        }

        Ok(FinalAnswer {
            text,
            based_on_draft: draft.id.clone(),
        })
    }
}
