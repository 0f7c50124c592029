//! Content source: the headless API the blog reads posts from

mod prismic;

pub use prismic::PrismicClient;

use async_trait::async_trait;
use std::fmt;

use crate::content::{PagedResult, RawDocument};
use crate::error::Result;

/// A document selector in the API's predicate language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field at `path` equals `value`
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// All documents of a custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// The document of a custom type carrying a uid
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                let value = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "[at({}, \"{}\")]", path, value)
            }
        }
    }
}

/// Render predicates as the `q` query parameter
pub fn render_query(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(|p| p.to_string()).collect();
    format!("[{}]", inner)
}

/// Options of a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Restrict returned fields, e.g. `posts.title`
    pub fetch: Vec<String>,
    /// Results per page; the API default when `None`
    pub page_size: Option<usize>,
}

/// Read access to the content API
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of documents matching all predicates
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<PagedResult<RawDocument>>;

    /// The single document of `doc_type` with `uid`
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument>;

    /// Follow a `next_page` cursor, failing loudly
    async fn follow(&self, cursor: &str) -> Result<PagedResult<RawDocument>>;

    /// Follow a `next_page` cursor. Every failure collapses into `None`.
    async fn fetch_page(&self, cursor: &str) -> Option<PagedResult<RawDocument>> {
        match self.follow(cursor).await {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::warn!("Failed to load page {}: {}", cursor, e);
                None
            }
        }
    }
}

/// Every document matching the predicates, following cursors to the end
pub async fn query_all(
    source: &dyn ContentSource,
    predicates: &[Predicate],
    options: &QueryOptions,
) -> Result<Vec<RawDocument>> {
    let mut page = source.query(predicates, options).await?;
    let mut documents = std::mem::take(&mut page.results);

    while let Some(cursor) = page.next_page.take() {
        page = source.follow(&cursor).await?;
        documents.append(&mut page.results);
    }

    Ok(documents)
}
