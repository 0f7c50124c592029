//! Listing controller: the home page's post cards and "load more"

use anyhow::Result;
use serde::Serialize;

use super::{DateView, PageContext};
use crate::config::ContentConfig;
use crate::content::{PagedResult, PostSummary};
use crate::helpers::post_url;
use crate::source::{ContentSource, Predicate, QueryOptions};
use crate::templates::TemplateRenderer;

/// Client-side state of the listing: what is shown and where the next page is.
///
/// Mutated only through [`append_page`](Self::append_page) and
/// [`mark_error`](Self::mark_error). `fetch_more` borrows the state mutably for
/// the whole request, so one listing never has two requests in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingState {
    results: Vec<PostSummary>,
    next_page: Option<String>,
    error: bool,
}

impl ListingState {
    /// State right after the build-time load
    pub fn new(initial: PagedResult<PostSummary>) -> Self {
        Self {
            results: initial.results,
            next_page: initial.next_page,
            error: false,
        }
    }

    pub fn results(&self) -> &[PostSummary] {
        &self.results
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether the error message is shown
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Whether the "load more" control is shown
    pub fn can_load_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Append a fetched page and move the cursor to its `next_page`
    pub fn append_page(&mut self, page: PagedResult<PostSummary>) {
        self.results.extend(page.results);
        self.next_page = page.next_page;
    }

    /// Record a failed fetch. Results and cursor stay as they were, so the
    /// control remains visible and can be clicked again.
    pub fn mark_error(&mut self) {
        self.error = true;
    }

    /// Load the page behind the stored cursor. No-op without a cursor.
    pub async fn fetch_more(&mut self, source: &dyn ContentSource) {
        let Some(cursor) = self.next_page.clone() else {
            return;
        };

        match source.fetch_page(&cursor).await {
            Some(page) => {
                tracing::debug!("Loaded {} more posts", page.results.len());
                self.append_page(page.map(|doc| PostSummary::from_document(&doc)));
            }
            None => self.mark_error(),
        }
    }
}

/// Build-time load: the first page of post summaries
pub async fn load_initial(
    source: &dyn ContentSource,
    config: &ContentConfig,
) -> Result<PagedResult<PostSummary>> {
    let doc_type = &config.document_type;
    let options = QueryOptions {
        fetch: ["title", "subtitle", "author"]
            .iter()
            .map(|field| format!("{}.{}", doc_type, field))
            .collect(),
        page_size: Some(config.page_size),
    };

    let page = source
        .query(&[Predicate::document_type(doc_type)], &options)
        .await?;
    Ok(page.map(|doc| PostSummary::from_document(&doc)))
}

/// A post card as rendered on the listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub uid: String,
    pub url: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: Option<DateView>,
}

impl PostCard {
    pub fn new(summary: &PostSummary, ctx: &PageContext) -> Self {
        Self {
            uid: summary.uid.clone(),
            url: post_url(&summary.uid),
            title: summary.title.clone(),
            subtitle: summary.subtitle.clone(),
            author: summary.author.clone(),
            date: ctx.format_date(summary.first_publication_date.as_ref()),
        }
    }

    /// Empty card cloned by the browser script for fetched posts
    fn blank() -> Self {
        Self {
            uid: String::new(),
            url: String::new(),
            title: String::new(),
            subtitle: String::new(),
            author: String::new(),
            date: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ListingView<'a> {
    posts: Vec<PostCard>,
    next_page: Option<&'a str>,
    error: bool,
}

/// Render the home page for a listing state
pub fn render(
    renderer: &TemplateRenderer,
    state: &ListingState,
    ctx: &PageContext,
) -> Result<String> {
    let view = ListingView {
        posts: state.results().iter().map(|s| PostCard::new(s, ctx)).collect(),
        next_page: state.next_page(),
        error: state.has_error(),
    };

    let mut context = ctx.base_context();
    context.insert("page_title", &format!("{} | {}", ctx.i18n().get("home"), ctx.title));
    context.insert("listing", &view);
    context.insert("card_templates", &[PostCard::blank()]);
    context.insert("months_json", &serde_json::to_string(ctx.months())?);
    renderer.render("index.html", &context)
}
