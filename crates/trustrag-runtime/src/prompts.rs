//! System prompts for the model-backed stages.
//!
//! Prompts are part of the wire contract with the model: the critic
//! prompt pins the JSON shape `parse_review` expects, and the drafting
//! prompts pin the `[S<n>]` marker syntax the citation module
//! extracts. Change them together.

use trustrag_core::{RiskCategory, CHECKLIST_VERSION};

/// Drafting without evidence: answer from model knowledge alone.
pub const BASELINE_SYSTEM_PROMPT: &str = "\
You are a careful assistant. Answer the user's question directly and \
concisely from your own knowledge. If you are unsure, say so rather \
than guessing.";

/// Drafting with retrieved evidence.
///
/// The user message numbers the evidence `[S1]`, `[S2]`, ... in rank
/// order; the model must cite with those markers.
pub const DRAFT_SYSTEM_PROMPT: &str = "\
You are a careful assistant answering from retrieved documents. Use \
only the provided documents to answer. After each claim that a \
document supports, cite it with its marker, for example [S1] or [S2]. \
Do not invent markers for documents that were not provided. If the \
documents do not contain the answer, say so explicitly.";

/// Planning: a short reasoning trace, one step per line.
pub const PLANNER_SYSTEM_PROMPT: &str = "\
You are a reasoning planner. Given a question and optionally some \
retrieved documents, produce a short numbered list of steps a careful \
answer should take: what to establish first, what evidence to rely \
on, what caveats to check. Output only the numbered steps, one per \
line, with no preamble and no final answer.";

/// Rewriting: address the critic's findings without losing citations.
pub const REWRITE_SYSTEM_PROMPT: &str = "\
You are an editor who revises draft answers to address reviewer \
findings. Apply each mitigation the reviewer suggested: add missing \
caveats, soften or remove unsupported claims, and qualify speculation. \
Preserve the draft's citation markers such as [S1] exactly; never add \
markers that were not in the draft. Keep everything in the draft that \
no finding objects to. Output only the revised answer.";

/// Critic prompt, generated from the risk checklist so prompt and
/// parser can never cover different categories.
pub fn critic_system_prompt() -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(
        "You are a factuality and safety critic reviewing a draft answer \
         against retrieved documents. Evaluate the draft on every \
         category of risk checklist version ",
    );
    prompt.push_str(CHECKLIST_VERSION);
    prompt.push_str(":\n\n");

    for category in RiskCategory::CHECKLIST {
        prompt.push_str("- ");
        prompt.push_str(category.as_str());
        prompt.push_str(": ");
        prompt.push_str(category.question());
        prompt.push('\n');
    }

    prompt.push_str(
        "\nRespond with a single JSON object and nothing else, in this \
         exact shape:\n\
         {\"categories\": [{\"category\": \"<one of the names above>\", \
         \"severity\": \"none|low|medium|high\", \
         \"description\": \"what you observed in the draft\", \
         \"impact\": \"why it matters to the user\", \
         \"mitigation\": \"concrete fix for a revision\"}], \
         \"summary\": \"one-paragraph plain-language assessment\"}\n\
         Include one entry per category, even when its severity is \
         \"none\". Do not wrap the JSON in markdown fences.",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critic_prompt_covers_every_category() {
        let prompt = critic_system_prompt();
        for category in RiskCategory::CHECKLIST {
            assert!(
                prompt.contains(category.as_str()),
                "prompt missing {category}"
            );
        }
    }

    #[test]
    fn test_critic_prompt_pins_checklist_version() {
        assert!(critic_system_prompt().contains(CHECKLIST_VERSION));
    }

    #[test]
    fn test_draft_prompt_mentions_markers() {
        assert!(DRAFT_SYSTEM_PROMPT.contains("[S1]"));
        assert!(REWRITE_SYSTEM_PROMPT.contains("[S1]"));
    }
}
