//! Model client: caching and usage accounting in front of a provider.
//!
//! Stages never talk to a [`ModelProvider`] directly; they go through
//! a [`ModelClient`], which caches completions (stage prompts are
//! deterministic for a fixed request, so identical prompts may recur
//! across retries and comparison runs) and accumulates usage.

use moka::future::Cache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::config::{CacheSettings, PipelineConfig};
use crate::providers::{ChatMessage, CompletionConfig, ModelProvider, ProviderError};

/// Accumulated model usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Number of model calls made
    pub llm_calls: u32,

    /// Completions served from the cache
    pub cache_hits: u32,
}

/// Shared client wrapping a provider with a completion cache.
pub struct ModelClient {
    provider: Arc<dyn ModelProvider>,
    completion: CompletionConfig,
    cache: Cache<u64, String>,
    usage: RwLock<LlmUsage>,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn ModelProvider>, config: &PipelineConfig) -> Self {
        Self::with_cache_settings(
            provider,
            CompletionConfig {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                ..CompletionConfig::default()
            },
            &config.cache,
        )
    }

    pub fn with_cache_settings(
        provider: Arc<dyn ModelProvider>,
        completion: CompletionConfig,
        cache: &CacheSettings,
    ) -> Self {
        Self {
            provider,
            completion,
            cache: Cache::builder()
                .max_capacity(cache.max_entries)
                .time_to_live(cache.ttl)
                .build(),
            usage: RwLock::new(LlmUsage::default()),
        }
    }

    /// Generate a completion at the configured temperature.
    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String, ProviderError> {
        self.generate_at(messages, self.completion.temperature).await
    }

    /// Generate a completion at an explicit temperature (the critic
    /// runs at 0 regardless of the configured default).
    pub async fn generate_at(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let key = cache_key(&self.completion.model, temperature, &messages);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(provider = self.provider.name(), "completion cache hit");
            self.usage.write().cache_hits += 1;
            return Ok(cached);
        }

        let config = CompletionConfig {
            temperature,
            ..self.completion.clone()
        };
        let response = self.provider.complete(messages, &config).await?;

        {
            let mut usage = self.usage.write();
            usage.prompt_tokens += response.usage.prompt_tokens;
            usage.completion_tokens += response.usage.completion_tokens;
            usage.total_tokens += response.usage.total();
            usage.llm_calls += 1;
        }

        self.cache.insert(key, response.content.clone()).await;
        Ok(response.content)
    }

    /// Snapshot of accumulated usage.
    pub fn usage(&self) -> LlmUsage {
        self.usage.read().clone()
    }

    /// Provider name, for logs.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

fn cache_key(model: &str, temperature: f32, messages: &[ChatMessage]) -> u64 {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    temperature.to_bits().hash(&mut hasher);
    for msg in messages {
        msg.role.hash(&mut hasher);
        msg.content.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionResponse, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ModelProvider for CountingProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompletionResponse {
                content: "answer".to_string(),
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                },
                model: "mock".to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn client() -> (Arc<CountingProvider>, ModelClient) {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
        });
        let client = ModelClient::new(provider.clone(), &PipelineConfig::default());
        (provider, client)
    }

    #[tokio::test]
    async fn test_identical_prompt_is_cached() {
        let (provider, client) = client();
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("q")];

        let first = client.generate(messages.clone()).await.unwrap();
        let second = client.generate(messages).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let usage = client.usage();
        assert_eq!(usage.llm_calls, 1);
        assert_eq!(usage.cache_hits, 1);
        assert_eq!(usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_temperature_is_part_of_the_key() {
        let (provider, client) = client();
        let messages = vec![ChatMessage::user("q")];

        client.generate_at(messages.clone(), 0.0).await.unwrap();
        client.generate_at(messages, 0.7).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_different_prompts_miss() {
        let (provider, client) = client();

        client.generate(vec![ChatMessage::user("a")]).await.unwrap();
        client.generate(vec![ChatMessage::user("b")]).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
