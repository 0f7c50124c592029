//! Post models and their projection from API documents

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rich_text::RichText;
use crate::error::Result;

/// A document as returned by the content API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type")]
    pub doc_type: String,

    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<DateTime<FixedOffset>>,

    #[serde(default, with = "timestamp")]
    pub last_publication_date: Option<DateTime<FixedOffset>>,

    /// Custom fields of the document type
    #[serde(default)]
    pub data: Value,
}

/// One page of a paginated query.
///
/// `next_page` is the API's opaque cursor URL; `None` means no more pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct PagedResult<T> {
    #[serde(default)]
    pub next_page: Option<String>,

    #[serde(default)]
    pub results: Vec<T>,
}

impl<T> PagedResult<T> {
    /// Project every result, keeping order and cursor
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            next_page: self.next_page,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// A post as shown on the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,

    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<DateTime<FixedOffset>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Reshape an API document into a summary
    pub fn from_document(doc: &RawDocument) -> Self {
        Self {
            uid: doc.uid.clone().unwrap_or_default(),
            first_publication_date: doc.first_publication_date,
            title: text_field(&doc.data, "title"),
            subtitle: text_field(&doc.data, "subtitle"),
            author: text_field(&doc.data, "author"),
        }
    }
}

/// A section of a post: a heading followed by a rich-text body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,

    #[serde(default)]
    pub body: RichText,
}

/// A post as shown on its own page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: String,

    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<DateTime<FixedOffset>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub content: Vec<ContentBlock>,
}

impl PostDetail {
    /// Reshape an API document into a full post
    pub fn from_document(doc: &RawDocument) -> Result<Self> {
        let content = match doc.data.get("content") {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value::<Vec<RawContentBlock>>(value.clone())?
                .into_iter()
                .map(|block| ContentBlock {
                    heading: block.heading.unwrap_or_default(),
                    body: block.body.unwrap_or_default(),
                })
                .collect(),
        };

        let banner_url = doc
            .data
            .get("banner")
            .and_then(|banner| banner.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            uid: doc.uid.clone().unwrap_or_default(),
            first_publication_date: doc.first_publication_date,
            title: text_field(&doc.data, "title"),
            subtitle: text_field(&doc.data, "subtitle"),
            author: text_field(&doc.data, "author"),
            banner_url,
            content,
        })
    }
}

/// Content group item as the API stores it; both fields may be null
#[derive(Deserialize)]
struct RawContentBlock {
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    body: Option<RichText>,
}

fn text_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Serde helpers for the API's timestamps.
///
/// The API writes `2021-09-12T15:00:00+0000`; RFC 3339 is accepted too.
pub mod timestamp {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_some(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
