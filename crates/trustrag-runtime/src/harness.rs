//! Side-by-side mode comparison.
//!
//! Runs the same query through every mode concurrently and collects
//! the bundles, so baseline, grounded, and responsible behavior can be
//! inspected against each other.

use serde::{Deserialize, Serialize};
use trustrag_core::{Mode, ResponseBundle};

use crate::client::LlmUsage;
use crate::error::PipelineError;
use crate::orchestrator::Pipeline;

/// One query answered under every mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeComparison {
    pub query: String,
    pub baseline: ResponseBundle,
    pub rag: ResponseBundle,
    pub responsible: ResponseBundle,

    /// Usage counters after all three runs.
    pub usage: LlmUsage,
}

impl ModeComparison {
    /// The bundle for a given mode.
    pub fn bundle(&self, mode: Mode) -> &ResponseBundle {
        match mode {
            Mode::Baseline => &self.baseline,
            Mode::Rag => &self.rag,
            Mode::Responsible => &self.responsible,
        }
    }
}

impl Pipeline {
    /// Run `query` under every mode concurrently.
    pub async fn compare_modes(&self, query: &str) -> Result<ModeComparison, PipelineError> {
        let (baseline, rag, responsible) = futures::future::join3(
            self.run(query, Mode::Baseline),
            self.run(query, Mode::Rag),
            self.run(query, Mode::Responsible),
        )
        .await;

        let responsible = responsible?;
        Ok(ModeComparison {
            query: query.to_string(),
            baseline: baseline?.bundle,
            rag: rag?.bundle,
            responsible: responsible.bundle,
            usage: responsible.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::providers::{
        ChatMessage, CompletionConfig, CompletionResponse, ModelProvider, ProviderError,
        TokenUsage,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use trustrag_core::{EvidenceItem, RetrievalError, Retriever};

    struct RoutingProvider;

    #[async_trait]
    impl ModelProvider for RoutingProvider {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
            let content = if system.contains("factuality and safety critic") {
                r#"{"categories": [], "summary": "clean"}"#.to_string()
            } else if system.contains("reasoning planner") {
                "1. Check the definition".to_string()
            } else if system.contains("retrieved documents") {
                "Grounded answer [S1].".to_string()
            } else {
                "Ungrounded answer.".to_string()
            };
            Ok(CompletionResponse {
                content,
                usage: TokenUsage::default(),
                model: "mock".to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "routing"
        }
    }

    struct OneDocRetriever;

    impl Retriever for OneDocRetriever {
        fn retrieve(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<EvidenceItem>, RetrievalError> {
            Ok(vec![EvidenceItem {
                source_id: "doc.txt#0".to_string(),
                text: "the definition".to_string(),
                rank: 1,
                similarity: 0.8,
            }])
        }
    }

    #[tokio::test]
    async fn test_compare_runs_every_mode() {
        let pipeline = Pipeline::new(
            Arc::new(RoutingProvider),
            Arc::new(OneDocRetriever),
            PipelineConfig::default(),
        );

        let comparison = pipeline.compare_modes("what is it?").await.unwrap();

        assert_eq!(comparison.baseline.mode, Mode::Baseline);
        assert_eq!(comparison.rag.mode, Mode::Rag);
        assert_eq!(comparison.responsible.mode, Mode::Responsible);

        assert!(comparison.baseline.evidence.is_empty());
        assert_eq!(comparison.rag.evidence.len(), 1);
        assert!(comparison.responsible.is_complete());

        for mode in Mode::ALL {
            assert!(comparison.bundle(mode).final_answer.is_some());
        }
    }
}
