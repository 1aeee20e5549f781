//! Common types and utilities shared across webinfo crates.
//!
//! This crate defines the shared error type and the observability helpers
//! used throughout the webinfo workspace. It is intentionally lightweight
//! so that every crate can depend on it without pulling in the HTTP or
//! parsing stacks.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`WebinfoError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use webinfo_common::WebinfoError;
//!
//! let err = WebinfoError::Config("OPENAI_API_KEY is not set".into());
//! assert_eq!(err.to_string(), "Configuration error: OPENAI_API_KEY is not set");
//! ```

pub mod observability;

/// Error types used across the webinfo pipeline.
#[derive(thiserror::Error, Debug)]
pub enum WebinfoError {
    /// The target page could not be fetched.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The completion service failed or returned an unusable response.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The final record could not be written.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Anything else bubbling up from a collaborator.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`WebinfoError`].
pub type Result<T> = std::result::Result<T, WebinfoError>;
