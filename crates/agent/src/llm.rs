//! Generative model clients used by the AI field extractor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use quotedesk_core::config::{LlmConfig, LlmProvider};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MAX_OUTPUT_TOKENS: u32 = 400;

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, instruction: &str, text: &str) -> Result<String>;
}

/// Builds the configured client, or `None` when AI extraction is switched off.
pub fn from_config(config: &LlmConfig) -> Result<Option<Arc<dyn LlmClient>>> {
    if !config.enabled {
        return Ok(None);
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiCompatibleClient::new(
            config.base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            config.api_key.clone(),
            config.model.clone(),
            timeout,
        )?),
        LlmProvider::Ollama => {
            let base_url = config.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);
            Arc::new(OpenAiCompatibleClient::new(
                format!("{}/v1", base_url.trim_end_matches('/')),
                config.api_key.clone(),
                config.model.clone(),
                timeout,
            )?)
        }
        LlmProvider::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow!("llm.api_key is required for gemini"))?;
            Arc::new(GeminiClient::new(
                config.base_url.clone().unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
                api_key,
                config.model.clone(),
                timeout,
            )?)
        }
    };
    Ok(Some(client))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions client for OpenAI and servers exposing the same API (Ollama).
pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build().context("building http client")?;
        Ok(Self { http, base_url: base_url.into(), api_key, model: model.into() })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn complete(&self, instruction: &str, text: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: instruction },
                ChatMessage { role: "user", content: text },
            ],
            temperature: 0.0,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            warn!(error = %error, "chat completion request failed");
            anyhow!("chat completion request failed: {error}")
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "chat completion API error");
            bail!("chat completion API error ({status}): {error_text}");
        }

        let parsed: ChatResponse =
            response.json().await.context("decoding chat completion response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no content"))?;

        debug!(model = %self.model, chars = content.len(), "chat completion received");
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            bail!("gemini api key is empty");
        }
        let http = Client::builder().timeout(timeout).build().context("building http client")?;
        Ok(Self { http, base_url: base_url.into(), api_key, model: model.into() })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, instruction: &str, text: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: instruction }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.0,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                warn!(error = %error, "gemini request failed");
                anyhow!("gemini request failed: {error}")
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "gemini API error");
            bail!("gemini API error ({status}): {error_text}");
        }

        let parsed: GeminiResponse = response.json().await.context("decoding gemini response")?;
        let content = parsed
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .map(|part| part.text)
            .collect::<String>();
        if content.trim().is_empty() {
            bail!("gemini returned no text");
        }

        debug!(model = %self.model, chars = content.len(), "gemini completion received");
        Ok(content)
    }
}
