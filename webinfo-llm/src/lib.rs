//! LLM integration for webinfo.
//!
//! This crate exposes a small [`traits::LlmClient`] interface, the OpenAI
//! Chat Completions implementation in [`openai`], and the page metadata
//! request built on top of it in [`metadata`].
//!
//! # Examples
//! ```no_run
//! use std::sync::Arc;
//! use webinfo_common::Result;
//! use webinfo_llm::metadata::{CompletionSettings, MetadataRequester};
//! use webinfo_llm::openai::OpenAiClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let client = OpenAiClient::new("sk-...".into(), webinfo_llm::DEFAULT_OPENAI_MODEL.into())?;
//! let requester = MetadataRequester::new(Arc::new(client), CompletionSettings::default());
//! let reply = requester.request("https://example.com", "# Example").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
pub mod metadata;
pub mod openai;
pub mod traits;

/// Model used for metadata summaries unless configured otherwise.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
