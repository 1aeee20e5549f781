//! Page acquisition and content extraction.
//!
//! - One-shot page download (`fetch`)
//! - Charset detection and decoding (`charset`)
//! - Main-content selection and noise removal (`extract`)
//! - HTML to Markdown conversion of the pruned subtree (`markdown`)

pub mod charset;
pub mod extract;
pub mod fetch;
pub mod markdown;
