//! Detail controller: one post's reader page

use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;

use super::{DateView, PageContext};
use crate::config::ContentConfig;
use crate::content::rich_text::as_html;
use crate::content::{format_read_time, PostDetail};
use crate::source::{query_all, ContentSource, Predicate, QueryOptions};
use crate::templates::TemplateRenderer;

/// Documents of the post type that can become a page: `(uid, last_publication_date)`
pub async fn enumerate_posts(
    source: &dyn ContentSource,
    config: &ContentConfig,
) -> Result<Vec<(String, Option<String>)>> {
    let documents = query_all(
        source,
        &[Predicate::document_type(&config.document_type)],
        &QueryOptions::default(),
    )
    .await?;

    Ok(documents
        .into_iter()
        .filter_map(|doc| {
            let last_published = doc.last_publication_date.map(|d| d.to_rfc3339());
            match doc.uid {
                Some(uid) if !uid.is_empty() => Some((uid, last_published)),
                _ => {
                    tracing::warn!("Skipping document {} without uid", doc.id);
                    None
                }
            }
        })
        .collect())
}

/// Fetch one post by uid
pub async fn fetch_post(
    source: &dyn ContentSource,
    config: &ContentConfig,
    uid: &str,
) -> Result<PostDetail> {
    let document = source.get_by_uid(&config.document_type, uid).await?;
    Ok(PostDetail::from_document(&document)?)
}

/// A content block as rendered: heading plus trusted markup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub heading: String,
    /// Rich-text markup, injected into the page without escaping
    pub html: String,
}

/// Everything the post template shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub date: Option<DateView>,
    pub read_time: String,
    pub sections: Vec<SectionView>,
}

impl PostView {
    pub fn new(post: &PostDetail, ctx: &PageContext) -> Self {
        let mut seen = HashSet::new();
        let sections = post
            .content
            .iter()
            .map(|block| {
                if !seen.insert(block.heading.as_str()) {
                    tracing::warn!(
                        "Post '{}' repeats the heading '{}'",
                        post.uid,
                        block.heading
                    );
                }
                SectionView {
                    heading: block.heading.clone(),
                    html: as_html(&block.body),
                }
            })
            .collect();

        Self {
            uid: post.uid.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            banner_url: post.banner_url.clone(),
            date: ctx.format_date(post.first_publication_date.as_ref()),
            read_time: format_read_time(&post.content),
            sections,
        }
    }
}

/// Render a post page
pub fn render(
    renderer: &TemplateRenderer,
    post: &PostDetail,
    ctx: &PageContext,
) -> Result<String> {
    let view = PostView::new(post, ctx);
    let mut context = ctx.base_context();
    context.insert("page_title", &format!("{} | {}", view.title, ctx.title));
    context.insert("post", &view);
    renderer.render("post.html", &context)
}

/// Placeholder shown while a post page is being generated
pub fn render_loading(renderer: &TemplateRenderer, ctx: &PageContext) -> Result<String> {
    let mut context = ctx.base_context();
    context.insert("page_title", &ctx.title);
    renderer.render("loading.html", &context)
}

/// Error page for a post that could not be shown
pub fn render_error(
    renderer: &TemplateRenderer,
    ctx: &PageContext,
    not_found: bool,
) -> Result<String> {
    let mut context = ctx.base_context();
    context.insert("page_title", &ctx.title);
    context.insert("not_found", &not_found);
    renderer.render("error.html", &context)
}
