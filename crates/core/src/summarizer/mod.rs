//! Free-text commentary from a language model.

mod llm;

pub use llm::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{SummarizerConfig, SummarizerProvider};
use crate::metrics::{LLM_TOKENS, SUMMARIZER_REQUESTS};

/// Turns a prompt into free text.
///
/// Never fails: anything other than rate limiting degrades to an empty
/// string, and callers substitute placeholder text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn complete(&self, prompt: &str) -> String;
}

/// [`Summarizer`] over an [`LlmClient`] with prompt truncation and
/// fixed-delay retry on rate limiting.
pub struct LlmSummarizer {
    client: Arc<dyn LlmClient>,
    max_prompt_chars: usize,
    max_output_tokens: u32,
    rate_limit_backoff: Duration,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn LlmClient>, config: &SummarizerConfig) -> Self {
        Self {
            client,
            max_prompt_chars: config.max_prompt_tokens.saturating_mul(config.chars_per_token),
            max_output_tokens: config.max_output_tokens,
            rate_limit_backoff: Duration::from_secs(config.rate_limit_backoff_secs),
        }
    }

    pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }
}

/// Cut `prompt` to at most `max_chars` characters.
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> &str {
    match prompt.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &prompt[..byte_idx],
        None => prompt,
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn complete(&self, prompt: &str) -> String {
        let prompt = truncate_prompt(prompt, self.max_prompt_chars);
        let provider = self.client.provider().to_string();

        loop {
            let request = CompletionRequest::commentary(prompt, self.max_output_tokens);

            match self.client.complete(request).await {
                Ok(response) => {
                    SUMMARIZER_REQUESTS
                        .with_label_values(&[&provider, "success"])
                        .inc();
                    LLM_TOKENS
                        .with_label_values(&[&provider, "input"])
                        .inc_by(response.usage.input_tokens as u64);
                    LLM_TOKENS
                        .with_label_values(&[&provider, "output"])
                        .inc_by(response.usage.output_tokens as u64);
                    debug!(
                        "Summarizer answered with {} chars ({})",
                        response.text.len(),
                        response.model
                    );
                    return response.text;
                }
                Err(LlmError::RateLimited(reason)) => {
                    SUMMARIZER_REQUESTS
                        .with_label_values(&[&provider, "rate_limited"])
                        .inc();
                    warn!(
                        "Summarizer rate limited ({}), retrying in {:?}",
                        reason, self.rate_limit_backoff
                    );
                    tokio::time::sleep(self.rate_limit_backoff).await;
                }
                Err(e) => {
                    SUMMARIZER_REQUESTS
                        .with_label_values(&[&provider, "error"])
                        .inc();
                    warn!("Summarizer request failed: {}", e);
                    return String::new();
                }
            }
        }
    }
}

/// Build the configured LLM client.
pub fn create_llm_client(config: &SummarizerConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider {
        SummarizerProvider::Openai => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    LlmError::NotConfigured("summarizer.api_key is required for openai".into())
                })?;
            let mut client = OpenAiClient::new(api_key, config.model.clone());
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Ok(Arc::new(client))
        }
        SummarizerProvider::Ollama => {
            let mut client = OllamaClient::new(config.model.clone());
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results and records the prompts it saw.
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<String, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn provider(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.prompts.lock().unwrap().push(request.prompt);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Http("script exhausted".into())));
            next.map(|text| CompletionResponse {
                text,
                usage: LlmUsage::default(),
                model: "test".to_string(),
            })
        }
    }

    fn summarizer(client: Arc<ScriptedClient>, max_prompt_tokens: usize) -> LlmSummarizer {
        let config = SummarizerConfig {
            max_prompt_tokens,
            chars_per_token: 1,
            ..SummarizerConfig::default()
        };
        LlmSummarizer::new(client, &config).with_rate_limit_backoff(Duration::ZERO)
    }

    fn rate_limited() -> Result<String, LlmError> {
        Err(LlmError::RateLimited("Rate limit reached".to_string()))
    }

    #[test]
    fn test_truncate_prompt() {
        assert_eq!(truncate_prompt("abcdef", 3), "abc");
        assert_eq!(truncate_prompt("abc", 10), "abc");
        assert_eq!(truncate_prompt("héllo", 2), "hé");
        assert_eq!(truncate_prompt("", 0), "");
    }

    #[tokio::test]
    async fn test_returns_text_on_success() {
        let client = Arc::new(ScriptedClient::new(vec![Ok("\"Looks fine\"".into())]));
        let out = summarizer(client.clone(), 100).complete("prompt").await;
        assert_eq!(out, "\"Looks fine\"");
        assert_eq!(client.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retries_while_rate_limited() {
        let client = Arc::new(ScriptedClient::new(vec![
            rate_limited(),
            rate_limited(),
            Ok("done".into()),
        ]));
        let out = summarizer(client.clone(), 100).complete("prompt").await;
        assert_eq!(out, "done");
        assert_eq!(client.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_other_errors_yield_empty_string() {
        let client = Arc::new(ScriptedClient::new(vec![Err(LlmError::Api {
            status: 500,
            message: "boom".into(),
        })]));
        let out = summarizer(client.clone(), 100).complete("prompt").await;
        assert_eq!(out, "");
        assert_eq!(client.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prompt_is_truncated_before_sending() {
        let client = Arc::new(ScriptedClient::new(vec![Ok("ok".into())]));
        summarizer(client.clone(), 5)
            .complete("0123456789")
            .await;
        assert_eq!(client.prompts.lock().unwrap()[0], "01234");
    }

    #[test]
    fn test_create_llm_client_requires_openai_key() {
        let config = SummarizerConfig::default();
        assert!(matches!(
            create_llm_client(&config),
            Err(LlmError::NotConfigured(_))
        ));

        let config = SummarizerConfig {
            api_key: Some("sk-test".into()),
            ..SummarizerConfig::default()
        };
        assert_eq!(create_llm_client(&config).unwrap().provider(), "openai");
    }

    #[test]
    fn test_create_llm_client_ollama() {
        let config = SummarizerConfig {
            provider: SummarizerProvider::Ollama,
            model: "llama3".into(),
            ..SummarizerConfig::default()
        };
        let client = create_llm_client(&config).unwrap();
        assert_eq!(client.provider(), "ollama");
        assert_eq!(client.model(), "llama3");
    }
}
