//! The JSON record written for each run.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use webinfo_common::{Result, WebinfoError};
use webinfo_llm::metadata::MetaRecord;

/// The `metaData` field of an [`OutputRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaData {
    /// The model reply parsed and matched the expected schema.
    Record(MetaRecord),
    /// The reply could not be used; serialized as `{"error": "..."}`.
    Error { error: String },
    /// No content was extracted, so no completion was requested. Serialized as `{}`.
    Skipped {},
}

impl MetaData {
    /// Interpret a fence-stripped model reply.
    ///
    /// ```
    /// use webinfo_app::record::MetaData;
    ///
    /// let meta = MetaData::from_reply("not json");
    /// assert_eq!(
    ///     serde_json::to_string(&meta).unwrap(),
    ///     r#"{"error":"Invalid JSON returned from OpenAI"}"#
    /// );
    /// ```
    pub fn from_reply(reply: &str) -> Self {
        match MetaRecord::parse(reply) {
            Ok(record) => Self::Record(record),
            Err(e) => {
                tracing::warn!(error = %e, reply_chars = reply.len(), "record.metadata.rejected");
                Self::Error {
                    error: e.to_string(),
                }
            }
        }
    }

    /// The line reported on the diagnostic stream, for error values only.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::Error { .. } => serde_json::to_string(self).ok(),
            _ => None,
        }
    }
}

/// One run's result. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub url: String,
    pub markdown: Option<String>,
    #[serde(rename = "metaData")]
    pub meta_data: MetaData,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl OutputRecord {
    pub fn new(url: impl Into<String>, markdown: Option<String>, meta_data: MetaData) -> Self {
        Self {
            url: url.into(),
            markdown,
            meta_data,
            created_at: created_at_now(),
        }
    }

    /// Compact single-line JSON.
    pub fn to_json_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WebinfoError::Internal(e.into()))
    }
}

/// Current UTC time as ISO-8601 with microseconds and a `Z` suffix.
pub fn created_at_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use serde_json::{Value, json};

    fn record() -> MetaRecord {
        MetaRecord {
            website_name: "Example".into(),
            img_url: "https://example.com/logo.png".into(),
            summary: "An example.".into(),
            key_features: vec!["one".into()],
            associated_links: vec!["https://example.com/about".into()],
        }
    }

    #[test]
    fn keys_are_ordered_and_named() {
        let out = OutputRecord::new(
            "https://example.com",
            Some("# Hi".into()),
            MetaData::Record(record()),
        );
        let line = out.to_json_line().unwrap();
        let url = line.find("\"url\"").unwrap();
        let md = line.find("\"markdown\"").unwrap();
        let meta = line.find("\"metaData\"").unwrap();
        let created = line.find("\"createdAt\"").unwrap();
        assert!(url < md && md < meta && meta < created, "{line}");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn skipped_metadata_is_an_empty_object_and_markdown_null() {
        let out = OutputRecord::new("https://example.com", None, MetaData::Skipped {});
        let v: Value = serde_json::from_str(&out.to_json_line().unwrap()).unwrap();
        assert_eq!(v["markdown"], Value::Null);
        assert_eq!(v["metaData"], json!({}));
    }

    #[test]
    fn created_at_is_utc_with_z_suffix_and_micros() {
        let ts = created_at_now();
        assert!(ts.ends_with('Z'), "{ts}");
        assert!(!ts.contains("+00:00"), "{ts}");
        let (_, frac) = ts.trim_end_matches('Z').rsplit_once('.').unwrap();
        assert_eq!(frac.len(), 6, "{ts}");
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn valid_reply_becomes_record() {
        let reply = serde_json::to_string(&record()).unwrap();
        assert_eq!(MetaData::from_reply(&reply), MetaData::Record(record()));
        assert_eq!(MetaData::from_reply(&reply).diagnostic(), None);
    }

    #[test]
    fn invalid_json_becomes_error_object() {
        let meta = MetaData::from_reply("Sure! Here is the JSON you asked for");
        assert_eq!(
            meta,
            MetaData::Error {
                error: "Invalid JSON returned from OpenAI".into()
            }
        );
        assert_eq!(
            meta.diagnostic().as_deref(),
            Some(r#"{"error":"Invalid JSON returned from OpenAI"}"#)
        );
    }

    #[test]
    fn wrong_shape_becomes_schema_error() {
        let meta = MetaData::from_reply(r#"{"website_name": 3}"#);
        let v = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            v,
            json!({"error": "JSON returned from OpenAI does not match the expected schema"})
        );
    }
}
