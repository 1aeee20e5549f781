use crate::traits::{LlmClient, LlmError, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use webinfo_common::{Result, WebinfoError};
use webinfo_http::{HttpClient, HttpError, RequestOpts};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

/// One element in the `choices` array
#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl OpenAiClient {
    /// Create a new client for the given API key and model against the public endpoint.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(api_key, model, OPENAI_API_BASE)
    }

    /// Create a client against an OpenAI-compatible endpoint (Azure, gateways, mocks).
    pub fn with_base_url(api_key: String, model: String, base_url: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("OpenAI API key is empty".to_string()).into());
        }

        // `Url::join` drops the last segment unless the base ends in a slash.
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let client = HttpClient::new(&base)
            .map_err(|e| WebinfoError::Config(format!("HttpClient init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.client = self.client.with_retries(retries);
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let req = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature,
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            ?max_tokens,
            ?temperature,
            "llm.openai.request"
        );

        let resp: ChatCompletionResponse = self
            .client
            .post_json_opts(
                "chat/completions",
                &req,
                RequestOpts {
                    bearer: Some(&self.api_key),
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_webinfo)?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyCompletion)?;

        let tokens_used = resp.usage.as_ref().map(|u| u.total_tokens);
        tracing::debug!(
            id = %resp.id,
            model = %resp.model,
            ?tokens_used,
            finish_reason = ?choice.finish_reason,
            "llm.openai.response"
        );

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            model: Some(resp.model),
            tokens_used,
            finish_reason: choice.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn http_to_webinfo(e: HttpError) -> WebinfoError {
    LlmError::Api(e.to_string()).into()
}
