use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use webinfo_common::{Result, WebinfoError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
    pub finish_reason: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Completion contained no choices")]
    EmptyCompletion,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<LlmError> for WebinfoError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Config(msg) => WebinfoError::Config(msg),
            other => WebinfoError::Llm(other.to_string()),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
