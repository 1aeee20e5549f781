//! Fetch, extract, describe, assemble. One page per run, stages awaited in order.

use crate::record::{MetaData, OutputRecord};
use std::io::Write;
use std::sync::Arc;
use webinfo_common::Result;
use webinfo_llm::metadata::MetadataRequester;
use webinfo_web::extract::ContentExtractor;
use webinfo_web::fetch::PageFetcher;

pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    extractor: ContentExtractor,
    requester: MetadataRequester,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: ContentExtractor,
        requester: MetadataRequester,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            requester,
        }
    }

    /// Build the record for `url`.
    ///
    /// Fetch and completion failures are returned as errors. An unusable
    /// model reply is not: its error object becomes `metaData` and is also
    /// written as one line to `diag`.
    pub async fn describe<D: Write>(&self, url: &str, diag: &mut D) -> Result<OutputRecord> {
        let page = self.fetcher.fetch(url).await?;
        let markdown = self.extractor.extract_page(&page);

        let meta = match markdown.as_deref() {
            Some(md) if !md.trim().is_empty() => {
                let reply = self.requester.request(url, md).await?;
                let meta = MetaData::from_reply(&reply);
                if let Some(line) = meta.diagnostic() {
                    writeln!(diag, "{line}")?;
                }
                meta
            }
            _ => {
                tracing::info!(%url, has_root = markdown.is_some(), "pipeline.metadata.skipped");
                MetaData::Skipped {}
            }
        };

        Ok(OutputRecord::new(url, markdown, meta))
    }

    /// [`describe`](Self::describe) and write the record as one JSON line to `out`.
    pub async fn run<W: Write, D: Write>(
        &self,
        url: &str,
        out: &mut W,
        diag: &mut D,
    ) -> Result<OutputRecord> {
        let record = self.describe(url, diag).await?;
        let line = record.to_json_line()?;
        writeln!(out, "{line}")?;
        out.flush()?;
        tracing::info!(%url, bytes = line.len(), "pipeline.done");
        Ok(record)
    }
}
