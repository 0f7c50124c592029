//! HTTP client for the Prismic v2 REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{render_query, ContentSource, Predicate, QueryOptions};
use crate::config::ContentConfig;
use crate::content::{PagedResult, RawDocument};
use crate::error::{Error, Result};

/// How long a resolved master ref is reused before asking the API again
const REF_TTL: Duration = Duration::from_secs(5);

/// API root document; only the refs matter here
#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default, rename = "isMasterRef")]
    is_master_ref: bool,
}

/// Content source backed by a Prismic repository
pub struct PrismicClient {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    master_ref: Mutex<Option<(String, Instant)>>,
}

impl PrismicClient {
    /// Creates a client from the site's content configuration
    pub fn new(config: &ContentConfig) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token(),
            master_ref: Mutex::new(None),
        })
    }

    /// Resolve the ref that points at the published content
    async fn master_ref(&self) -> Result<String> {
        let mut cached = self.master_ref.lock().await;
        if let Some((reference, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < REF_TTL {
                return Ok(reference.clone());
            }
        }

        let mut request = self.client.get(&self.endpoint);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }
        let root: ApiRoot = self.send(request, &self.endpoint).await?;

        let reference = root
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| Error::NoMasterRef(self.endpoint.clone()))?;

        debug!("Resolved master ref {}", reference);
        *cached = Some((reference.clone(), Instant::now()));
        Ok(reference)
    }

    /// Run a search against the master ref
    async fn search(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<PagedResult<RawDocument>> {
        let reference = self.master_ref().await?;
        let url = format!("{}/documents/search", self.endpoint);

        let mut params: Vec<(&str, String)> =
            vec![("ref", reference), ("q", render_query(predicates))];
        if !options.fetch.is_empty() {
            params.push(("fetch", options.fetch.join(",")));
        }
        if let Some(size) = options.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }

        let page: PagedResult<RawDocument> =
            self.send(self.client.get(&url).query(&params), &url).await?;
        info!(
            "Fetched {} documents from {} (more: {})",
            page.results.len(),
            url,
            page.next_page.is_some()
        );
        Ok(page)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<PagedResult<RawDocument>> {
        self.search(predicates, options).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument> {
        let options = QueryOptions {
            page_size: Some(1),
            ..QueryOptions::default()
        };
        let page = self
            .search(&[Predicate::uid(doc_type, uid)], &options)
            .await?;

        page.results.into_iter().next().ok_or_else(|| Error::NotFound {
            doc_type: doc_type.to_string(),
            uid: uid.to_string(),
        })
    }

    async fn follow(&self, cursor: &str) -> Result<PagedResult<RawDocument>> {
        // The cursor already carries ref, query and token
        self.send(self.client.get(cursor), cursor).await
    }
}
