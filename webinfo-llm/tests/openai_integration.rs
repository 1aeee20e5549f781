mod common;
use std::sync::Arc;
use webinfo_common::Result;
use webinfo_llm::metadata::{CompletionSettings, MetaRecord, MetadataRequester};
use webinfo_llm::openai::OpenAiClient;

/// Live call against api.openai.com. Run with
/// `OPENAI_API_KEY=... cargo test -p webinfo-llm -- --ignored`.
#[tokio::test]
#[ignore]
async fn live_metadata_reply_parses() -> Result<()> {
    common::init_test_tracing();
    let Ok(key) = std::env::var("OPENAI_API_KEY") else {
        tracing::debug!("skipping: OPENAI_API_KEY not set");
        return Ok(());
    };

    let client = OpenAiClient::new(key, webinfo_llm::DEFAULT_OPENAI_MODEL.to_string())?;
    let requester = MetadataRequester::new(Arc::new(client), CompletionSettings::default());

    let reply = requester
        .request(
            "https://example.com",
            "# Example Domain\n\nThis domain is for use in illustrative examples in documents.",
        )
        .await?;
    tracing::debug!(%reply, "live metadata reply");

    let record = MetaRecord::parse(&reply).expect("model reply should follow the schema");
    assert!(!record.website_name.trim().is_empty());
    Ok(())
}
