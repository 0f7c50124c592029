//! Generate static files

use anyhow::Result;

use crate::cache::{self, BuildManifest, ChangeSet};
use crate::generator::Generator;
use crate::pages::detail;
use crate::source::ContentSource;
use crate::Blog;

/// Generate the static site (with incremental support)
pub async fn run(blog: &Blog, source: &dyn ContentSource, force: bool) -> Result<()> {
    let start = std::time::Instant::now();

    let posts = detail::enumerate_posts(source, &blog.config.content).await?;
    tracing::info!("Found {} posts", posts.len());

    let previous = BuildManifest::load(&blog.base_dir);
    let config_hash = cache::hash_config(&blog.base_dir);

    let changeset = if force {
        tracing::info!("Full generation (force)");
        ChangeSet {
            changed: posts.iter().map(|(uid, _)| uid.clone()).collect(),
            deleted: cache::detect_changes(&previous, config_hash, &posts).deleted,
            full_rebuild: true,
        }
    } else {
        cache::detect_changes(&previous, config_hash, &posts)
    };
    tracing::info!("Changes detected: {}", changeset.summary());

    // The listing is rebuilt every time; only post pages are incremental
    let generator = Generator::new(blog)?;
    let mut manifest = generator
        .generate(source, &posts, &changeset, &previous)
        .await?;

    manifest.config_hash = config_hash;
    manifest.save(&blog.base_dir)?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{post_document, MemorySource};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_second_run_renders_nothing_new() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let source = MemorySource::new(
            vec![post_document("a", "A", 1), post_document("b", "B", 1)],
            1,
        );

        run(&blog, &source, false).await.unwrap();
        assert_eq!(source.get_by_uid_calls.load(Ordering::SeqCst), 2);
        assert_eq!(BuildManifest::load(dir.path()).posts.len(), 2);

        run(&blog, &source, false).await.unwrap();
        assert_eq!(source.get_by_uid_calls.load(Ordering::SeqCst), 2);

        run(&blog, &source, true).await.unwrap();
        assert_eq!(source.get_by_uid_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_source_failure_fails_the_build() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let source = MemorySource::new(vec![post_document("a", "A", 1)], 1);
        source
            .cursor_overrides
            .lock()
            .unwrap()
            .insert("page:1".to_string(), None);
        source.set_documents(vec![post_document("a", "A", 1), post_document("b", "B", 1)]);

        assert!(run(&blog, &source, false).await.is_err());
        assert!(!blog.public_dir.join("index.html").exists());
    }
}
