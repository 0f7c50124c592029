//! Generator module - renders pages from the content source into the public dir

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cache::{BuildManifest, CachedPage, ChangeSet};
use crate::config::ContentConfig;
use crate::error::Error;
use crate::helpers::{is_safe_uid, post_output_path};
use crate::pages::{detail, listing, PageContext};
use crate::source::ContentSource;
use crate::templates::{TemplateRenderer, ASSETS};
use crate::Blog;

/// Static site generator using Tera templates
pub struct Generator {
    renderer: TemplateRenderer,
    context: PageContext,
    content: ContentConfig,
    public_dir: PathBuf,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            renderer: TemplateRenderer::new()?,
            context: blog.page_context()?,
            content: blog.config.content.clone(),
            public_dir: blog.public_dir.clone(),
        })
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Render every changed page and drop the deleted ones. Returns the
    /// manifest describing what is now on disk.
    pub async fn generate(
        &self,
        source: &dyn ContentSource,
        posts: &[(String, Option<String>)],
        changeset: &ChangeSet,
        previous: &BuildManifest,
    ) -> Result<BuildManifest> {
        fs::create_dir_all(&self.public_dir)?;
        self.write_assets()?;
        self.generate_listing(source).await?;

        let mut manifest = BuildManifest::new();
        for (uid, published) in posts {
            if changeset.changed.contains(uid) {
                let html = self.render_post(source, uid).await?;
                let output_path = self.write_post(uid, &html)?;
                manifest.record(uid, published.clone(), output_path);
            } else if let Some(entry) = previous.posts.get(uid) {
                manifest.posts.insert(uid.clone(), entry.clone());
            }
        }

        for uid in &changeset.deleted {
            if let Some(entry) = previous.posts.get(uid) {
                self.remove_output(&entry.output_path)?;
            }
        }

        tracing::info!(
            "Generated {} post pages ({} unchanged, {} removed)",
            changeset.changed.len(),
            posts.len() - changeset.changed.len(),
            changeset.deleted.len()
        );
        Ok(manifest)
    }

    /// Write the embedded stylesheet and script
    pub fn write_assets(&self) -> Result<()> {
        for (path, contents) in ASSETS {
            self.write_file(path, contents)?;
        }
        Ok(())
    }

    /// Render and write the home page
    pub async fn generate_listing(&self, source: &dyn ContentSource) -> Result<()> {
        let initial = listing::load_initial(source, &self.content).await?;
        let state = listing::ListingState::new(initial);
        let html = listing::render(&self.renderer, &state, &self.context)?;
        self.write_file("index.html", &html)?;
        tracing::debug!("Generated: index.html ({} posts)", state.results().len());
        Ok(())
    }

    /// Render the page of one post
    pub async fn render_post(&self, source: &dyn ContentSource, uid: &str) -> Result<String> {
        if !is_safe_uid(uid) {
            return Err(Error::NotFound {
                doc_type: self.content.document_type.clone(),
                uid: uid.to_string(),
            }
            .into());
        }
        let post = detail::fetch_post(source, &self.content, uid).await?;
        detail::render(&self.renderer, &post, &self.context)
    }

    /// Write a rendered post page. Returns its path relative to the public dir.
    pub fn write_post(&self, uid: &str, html: &str) -> Result<String> {
        let output_path = post_output_path(uid);
        self.write_file(&output_path, html)?;
        tracing::debug!("Generated: {}", output_path);
        Ok(output_path)
    }

    /// A previously written post page, stamped with its modification time
    pub fn read_post(&self, uid: &str) -> Option<CachedPage> {
        if !is_safe_uid(uid) {
            return None;
        }
        let path = self.public_dir.join(post_output_path(uid));
        let html = fs::read_to_string(&path).ok()?;
        let generated_at = fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        Some(CachedPage::generated_at(html, generated_at))
    }

    pub fn render_loading(&self) -> Result<String> {
        detail::render_loading(&self.renderer, &self.context)
    }

    pub fn render_error(&self, not_found: bool) -> Result<String> {
        detail::render_error(&self.renderer, &self.context, not_found)
    }

    fn write_file(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.public_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(())
    }

    fn remove_output(&self, relative: &str) -> Result<()> {
        let path = self.public_dir.join(relative);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!("Removed: {}", relative);
        }
        if let Some(dir) = path.parent() {
            // Only succeeds on the now empty post directory
            let _ = fs::remove_dir(dir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::detect_changes;
    use crate::source::testing::{post_document, MemorySource};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Generator) {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let generator = Generator::new(&blog).unwrap();
        (dir, generator)
    }

    fn listed(source: &MemorySource) -> Vec<(String, Option<String>)> {
        source
            .documents
            .lock()
            .unwrap()
            .iter()
            .map(|d| {
                (
                    d.uid.clone().unwrap(),
                    d.last_publication_date.map(|date| date.to_rfc3339()),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_generation_writes_every_page() {
        let (dir, generator) = setup();
        let source = MemorySource::new(
            vec![post_document("a", "Post A", 10), post_document("b", "Post B", 10)],
            1,
        );
        let posts = listed(&source);
        let changes = detect_changes(&BuildManifest::new(), 0, &posts);

        let manifest = generator
            .generate(&source, &posts, &changes, &BuildManifest::new())
            .await
            .unwrap();

        let public = dir.path().join("public");
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains("Post A"));
        assert!(!index.contains("Post B"));
        assert!(index.contains(r#"data-next-page="page:1""#));
        assert!(public.join("post/a/index.html").exists());
        assert!(public.join("post/b/index.html").exists());
        assert!(public.join("css/style.css").exists());
        assert!(public.join("js/listing.js").exists());
        assert_eq!(manifest.posts.len(), 2);
    }

    #[tokio::test]
    async fn test_incremental_generation_removes_deleted_posts() {
        let (dir, generator) = setup();
        let source = MemorySource::new(
            vec![post_document("a", "Post A", 10), post_document("b", "Post B", 10)],
            1,
        );
        let posts = listed(&source);
        let first = generator
            .generate(
                &source,
                &posts,
                &detect_changes(&BuildManifest::new(), 0, &posts),
                &BuildManifest::new(),
            )
            .await
            .unwrap();

        source.set_documents(vec![post_document("a", "Post A", 10)]);
        let posts = listed(&source);
        let changes = detect_changes(&first, 0, &posts);
        assert!(changes.changed.is_empty());
        assert_eq!(changes.deleted, ["b"]);

        let second = generator
            .generate(&source, &posts, &changes, &first)
            .await
            .unwrap();
        let public = dir.path().join("public");
        assert!(public.join("post/a/index.html").exists());
        assert!(!public.join("post/b").exists());
        assert_eq!(second.posts.keys().collect::<Vec<_>>(), ["a"]);
    }

    #[tokio::test]
    async fn test_render_post_rejects_unsafe_uid() {
        let (_dir, generator) = setup();
        let source = MemorySource::default();
        let err = generator.render_post(&source, "..").await.unwrap_err();
        assert!(err.downcast_ref::<Error>().unwrap().is_not_found());
        assert_eq!(
            source
                .get_by_uid_calls
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[test]
    fn test_read_post_after_write() {
        let (_dir, generator) = setup();
        assert!(generator.read_post("a").is_none());
        generator.write_post("a", "<p>a</p>").unwrap();
        let page = generator.read_post("a").unwrap();
        assert_eq!(&*page.html, "<p>a</p>");
    }
}
