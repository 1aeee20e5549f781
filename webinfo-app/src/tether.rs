//! Ties the loaded configuration to concrete components.

use crate::pipeline::Pipeline;
use std::sync::Arc;
use webinfo_common::observability::{LogConfig, LogFormat};
use webinfo_common::{Result, WebinfoError};
use webinfo_config::{ExtractSettings, HttpSettings, LogSettings, OpenAiSettings, WebinfoConfig};
use webinfo_llm::metadata::{CompletionSettings, MetadataRequester};
use webinfo_llm::openai::OpenAiClient;
use webinfo_llm::traits::LlmClient;
use webinfo_web::extract::{ContentExtractor, ExtractRules};
use webinfo_web::fetch::HttpFetcher;
use webinfo_web::markdown::{HeadingStyle, MarkdownOptions};

pub fn build_from_config(cfg: &WebinfoConfig) -> Result<Pipeline> {
    let fetcher = Arc::new(HttpFetcher::new(cfg.http.timeout(), cfg.http.retries));
    let extractor = build_extractor(&cfg.extract)?;
    let llm = build_llm_client(&cfg.openai, &cfg.http)?;
    let requester = MetadataRequester::new(
        llm,
        CompletionSettings {
            max_tokens: cfg.openai.max_tokens,
            temperature: cfg.openai.temperature,
        },
    );

    tracing::debug!(
        model = %cfg.openai.model,
        base_url = %cfg.openai.base_url,
        timeout_secs = cfg.http.timeout_secs,
        retries = cfg.http.retries,
        "pipeline.built"
    );
    Ok(Pipeline::new(fetcher, extractor, requester))
}

pub fn build_llm_client(cfg: &OpenAiSettings, http: &HttpSettings) -> Result<Arc<dyn LlmClient>> {
    let client =
        OpenAiClient::with_base_url(cfg.api_key.clone(), cfg.model.clone(), &cfg.base_url)?
            .with_timeout(http.timeout())
            .with_retries(http.retries);
    Ok(Arc::new(client))
}

pub fn build_extractor(cfg: &ExtractSettings) -> Result<ContentExtractor> {
    let heading_style: HeadingStyle = cfg
        .heading_style
        .parse()
        .map_err(|e: String| WebinfoError::Config(format!("extract.heading_style: {e}")))?;

    let rules = ExtractRules {
        noise_tags: cfg.noise_tags.clone(),
        ad_classes: cfg.ad_classes.clone(),
    };
    let options = MarkdownOptions {
        heading_style,
        ..Default::default()
    };
    Ok(ContentExtractor::new(rules, options))
}

pub fn log_config(cfg: &LogSettings) -> Result<LogConfig> {
    let format: LogFormat = cfg
        .format
        .parse()
        .map_err(|e: String| WebinfoError::Config(format!("log.format: {e}")))?;

    Ok(LogConfig {
        app_name: "webinfo",
        log_dir: cfg.dir.clone(),
        emit_stderr: cfg.stderr,
        format,
        default_filter: cfg.filter.clone(),
    })
}
