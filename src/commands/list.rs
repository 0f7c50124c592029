//! List posts

use anyhow::Result;
use std::io::Write;

use crate::pages::listing::{self, ListingState};
use crate::pages::PageContext;
use crate::source::ContentSource;
use crate::Blog;

/// Page through every post the way the home page's "load more" does
pub async fn run(blog: &Blog, source: &dyn ContentSource) -> Result<()> {
    let ctx = blog.page_context()?;
    let state = collect(source, blog).await?;

    let mut out = std::io::stdout().lock();
    write_listing(&mut out, &state, &ctx)?;
    if state.has_error() {
        anyhow::bail!("Failed to load every page of posts");
    }
    Ok(())
}

/// Load the first page, then follow cursors until exhausted or failed
async fn collect(source: &dyn ContentSource, blog: &Blog) -> Result<ListingState> {
    let initial = listing::load_initial(source, &blog.config.content).await?;
    let mut state = ListingState::new(initial);
    while state.can_load_more() && !state.has_error() {
        state.fetch_more(source).await;
    }
    Ok(state)
}

fn write_listing(out: &mut impl Write, state: &ListingState, ctx: &PageContext) -> Result<()> {
    writeln!(out, "Posts ({}):", state.results().len())?;
    for post in state.results() {
        let date = ctx
            .format_date(post.first_publication_date.as_ref())
            .map(|d| d.display)
            .unwrap_or_else(|| "-".to_string());
        writeln!(out, "  {} - {} [{}]", date, post.title, post.uid)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{post_document, MemorySource};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_every_page() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let source = MemorySource::new(
            vec![
                post_document("a", "Primeiro", 1),
                post_document("b", "Segundo", 1),
                post_document("c", "Terceiro", 1),
            ],
            1,
        );

        let state = collect(&source, &blog).await.unwrap();
        let mut out = Vec::new();
        write_listing(&mut out, &state, &blog.page_context().unwrap()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Posts (3):"));
        assert!(text.contains("  12 set 2021 - Primeiro [a]"));
        assert!(text.contains("Terceiro [c]"));
    }

    #[tokio::test]
    async fn test_stops_on_failed_page() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let source = MemorySource::new(
            vec![post_document("a", "A", 1), post_document("b", "B", 1)],
            1,
        );
        source
            .cursor_overrides
            .lock()
            .unwrap()
            .insert("page:1".to_string(), None);

        let state = collect(&source, &blog).await.unwrap();
        assert!(state.has_error());
        assert_eq!(state.results().len(), 1);
        assert!(run(&blog, &source).await.is_err());
    }
}
