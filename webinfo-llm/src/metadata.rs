//! Page metadata request: prompt construction, the completion call, and the
//! schema the reply is expected to follow.
//!
//! The requester returns the model's reply as text. Parsing it into a
//! [`MetaRecord`] is left to the caller so a malformed reply can still be
//! reported alongside the rest of the record.

use crate::traits::LlmClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use webinfo_common::Result;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_MAX_TOKENS: u32 = 800;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

const FENCE: &str = "```";
/// Characters dropped from the front of a fenced reply: the fence plus a
/// four-letter language tag such as `json`.
const FENCE_OPEN_LEN: usize = 7;
const FENCE_CLOSE_LEN: usize = 3;

/// Sampling knobs for the metadata completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Structured summary the model is asked to produce for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub website_name: String,
    pub img_url: String,
    pub summary: String,
    pub key_features: Vec<String>,
    pub associated_links: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum MetaParseError {
    #[error("Invalid JSON returned from OpenAI")]
    InvalidJson(#[source] serde_json::Error),

    #[error("JSON returned from OpenAI does not match the expected schema")]
    Schema(#[source] serde_json::Error),
}

impl MetaRecord {
    /// Parse a raw model reply, distinguishing broken JSON from JSON of the wrong shape.
    ///
    /// ```
    /// use webinfo_llm::metadata::{MetaParseError, MetaRecord};
    ///
    /// let ok = MetaRecord::parse(
    ///     r#"{"website_name":"Example","img_url":"","summary":"s","key_features":[],"associated_links":[]}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(ok.website_name, "Example");
    ///
    /// assert!(matches!(MetaRecord::parse("not json"), Err(MetaParseError::InvalidJson(_))));
    /// assert!(matches!(MetaRecord::parse(r#"{"summary":1}"#), Err(MetaParseError::Schema(_))));
    /// ```
    pub fn parse(reply: &str) -> std::result::Result<Self, MetaParseError> {
        let value: serde_json::Value =
            serde_json::from_str(reply).map_err(MetaParseError::InvalidJson)?;
        serde_json::from_value(value).map_err(MetaParseError::Schema)
    }
}

/// Sends the metadata prompt for one page to the configured model.
pub struct MetadataRequester {
    llm: Arc<dyn LlmClient>,
    settings: CompletionSettings,
}

impl MetadataRequester {
    pub fn new(llm: Arc<dyn LlmClient>, settings: CompletionSettings) -> Self {
        Self { llm, settings }
    }

    pub fn settings(&self) -> CompletionSettings {
        self.settings
    }

    /// Ask the model to describe `url` from its extracted Markdown.
    ///
    /// Returns the trimmed reply with any code fence removed by
    /// [`strip_code_fence`]. Transport and service failures are returned as
    /// errors; nothing is retried.
    pub async fn request(&self, url: &str, markdown: &str) -> Result<String> {
        let prompt = build_prompt(url, markdown);

        tracing::info!(
            %url,
            model = %self.llm.model_name(),
            markdown_chars = markdown.len(),
            max_tokens = self.settings.max_tokens,
            temperature = self.settings.temperature,
            "llm.metadata.request"
        );

        let response = self
            .llm
            .generate(
                &prompt,
                Some(DEFAULT_SYSTEM_PROMPT),
                Some(self.settings.max_tokens),
                Some(self.settings.temperature),
            )
            .await?;

        let reply = strip_code_fence(&response.text);
        tracing::debug!(reply_chars = reply.len(), tokens_used = ?response.tokens_used, "llm.metadata.reply");
        Ok(reply)
    }
}

/// Trim the reply and, when it is wrapped in a code fence, cut the fence away.
///
/// The cut is positional: seven characters from the front (the fence and a
/// `json` tag) and three from the back. A bare fence followed by a newline
/// therefore also loses the first three characters of its payload.
///
/// ```
/// use webinfo_llm::metadata::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(strip_code_fence("  {\"a\":1}\n"), "{\"a\":1}");
/// ```
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !(trimmed.starts_with(FENCE) && trimmed.ends_with(FENCE)) {
        return trimmed.to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= FENCE_OPEN_LEN + FENCE_CLOSE_LEN {
        return String::new();
    }
    chars[FENCE_OPEN_LEN..chars.len() - FENCE_CLOSE_LEN]
        .iter()
        .collect::<String>()
        .trim()
        .to_string()
}

/// Render the instruction sent to the model for one page.
pub fn build_prompt(url: &str, markdown: &str) -> String {
    format!(
        r#"
Given the following website content in markdown format and website url:

{url}
{markdown}

1. Website or company name
2. A valid website logo image url or favicon url
3. Please provide a summary of the website.
4. Highlight the key topics that the website covers. if the website is a news website, then list the specific topics mentioned in the news article.
if the website is a company website, then list the key features of the company's product. if the website doesnt fit either of these, then provide a list of
available information that a user can find on the website
5. Compile a list of associated links from the website

Please respond **strictly in valid JSON format**, without additional explanations.
Ensure the JSON structure is properly formatted as follows:
{{
    "website_name": "string",
    "img_url": "string",
    "summary": "string",
    "key_features": ["feature1", "feature2", ...],
    "associated_links": ["link1", "link2", ...]
}}
"#
    )
}
