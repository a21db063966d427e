//! Chat-model backends used by [`super::LlmSummarizer`].

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered 429. Retrying later is expected to succeed.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Json(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One prompt for a single non-streaming answer.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Low temperature keeps commentary on the same metrics stable across runs.
    pub fn commentary(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: LlmUsage,
    pub model: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Label used in logs and metrics, e.g. `openai`.
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Base URL plus the shared HTTP client of one backend.
struct Endpoint {
    http: reqwest::Client,
    base: String,
}

impl Endpoint {
    fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// POST `body` to `path` and decode a 200 answer as `R`.
    ///
    /// `error_message` pulls the human-readable message out of a failure body.
    async fn post<B, R>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
        error_message: fn(&str) -> Option<String>,
    ) -> Result<R, LlmError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut builder = self.http.post(format!("{}{}", self.base, path)).json(body);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(failure(status, &text, error_message));
        }
        response
            .json()
            .await
            .map_err(|e| LlmError::Json(e.to_string()))
    }
}

fn failure(status: u16, body: &str, error_message: fn(&str) -> Option<String>) -> LlmError {
    let message = error_message(body).unwrap_or_else(|| body.to_string());
    if status == 429 {
        LlmError::RateLimited(message)
    } else {
        LlmError::Api { status, message }
    }
}

// OpenAI-compatible chat completions

pub struct OpenAiClient {
    endpoint: Endpoint,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub const DEFAULT_BASE: &'static str = "https://api.openai.com";

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(Self::DEFAULT_BASE),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Point at a proxy or another OpenAI-compatible server.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.endpoint = Endpoint::new(api_base);
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatAnswer {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

fn openai_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }
    serde_json::from_str::<Envelope>(body)
        .ok()
        .map(|e| e.error.message)
}

impl ChatAnswer {
    fn into_response(self) -> CompletionResponse {
        let usage = self.usage.map_or_else(LlmUsage::default, |u| LlmUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });
        CompletionResponse {
            text: self
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .unwrap_or_default(),
            usage,
            model: self.model,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let messages = request
            .system
            .map(|content| Message {
                role: "system".into(),
                content,
            })
            .into_iter()
            .chain(std::iter::once(Message {
                role: "user".into(),
                content: request.prompt,
            }))
            .collect();
        let body = ChatBody {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let answer: ChatAnswer = self
            .endpoint
            .post(
                "/v1/chat/completions",
                Some(self.api_key.as_str()),
                &body,
                openai_error_message,
            )
            .await?;
        Ok(answer.into_response())
    }
}

// Ollama generate API, for a local model without an API key

pub struct OllamaClient {
    endpoint: Endpoint,
    model: String,
}

impl OllamaClient {
    pub const DEFAULT_BASE: &'static str = "http://localhost:11434";

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(Self::DEFAULT_BASE),
            model: model.into(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.endpoint = Endpoint::new(api_base);
        self
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateAnswer {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

fn ollama_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Envelope {
        error: String,
    }
    serde_json::from_str::<Envelope>(body).ok().map(|e| e.error)
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = GenerateBody {
            model: &self.model,
            prompt: request.prompt,
            system: request.system,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let answer: GenerateAnswer = self
            .endpoint
            .post("/api/generate", None, &body, ollama_error_message)
            .await?;
        Ok(CompletionResponse {
            text: answer.response,
            usage: LlmUsage {
                input_tokens: answer.prompt_eval_count,
                output_tokens: answer.eval_count,
            },
            model: answer.model,
        })
    }
}
