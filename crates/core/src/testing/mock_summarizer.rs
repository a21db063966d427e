//! Mock summarizer for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::summarizer::Summarizer;

/// Mock implementation of the Summarizer trait.
///
/// Answers with the first rule whose marker occurs in the prompt, or with
/// the default answer. Prompts are recorded in call order.
#[derive(Debug)]
pub struct MockSummarizer {
    rules: Arc<RwLock<Vec<(String, String)>>>,
    default_answer: Arc<RwLock<String>>,
    prompts: Arc<RwLock<Vec<String>>>,
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSummarizer {
    /// Mock answering `"Looks reasonable."` to everything.
    pub fn new() -> Self {
        Self::with_default("\"Looks reasonable.\"")
    }

    pub fn with_default(answer: impl Into<String>) -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            default_answer: Arc::new(RwLock::new(answer.into())),
            prompts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Answer `answer` to prompts containing `marker`.
    pub async fn respond_when(&self, marker: impl Into<String>, answer: impl Into<String>) {
        self.rules.write().await.push((marker.into(), answer.into()));
    }

    pub async fn set_default(&self, answer: impl Into<String>) {
        *self.default_answer.write().await = answer.into();
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.read().await.len()
    }

    pub async fn clear_recorded(&self) {
        self.prompts.write().await.clear();
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn complete(&self, prompt: &str) -> String {
        self.prompts.write().await.push(prompt.to_string());

        let rules = self.rules.read().await;
        if let Some((_, answer)) = rules.iter().find(|(marker, _)| prompt.contains(marker)) {
            return answer.clone();
        }
        self.default_answer.read().await.clone()
    }
}
