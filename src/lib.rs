//! spacetraveling: a blog generated from a headless CMS
//!
//! Posts live in a Prismic repository. The home page lists them with a
//! "load more" control, each post gets its own reader page, and pages that
//! were never built are generated on first request and revalidated after a
//! configurable interval.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod pages;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use source::{ContentSource, PrismicClient};

/// The blog application rooted at a site directory
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
        })
    }

    /// Cache directory holding the build manifest
    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join(cache::CACHE_DIR)
    }

    /// Translations for the site language, with the site's overrides applied
    pub fn i18n(&self) -> Result<i18n::I18n> {
        let mut i18n = i18n::I18n::new(&self.config.language);
        i18n.load_languages(self.base_dir.join(&self.config.i18n_dir))?;
        Ok(i18n)
    }

    pub fn page_context(&self) -> Result<pages::PageContext> {
        Ok(pages::PageContext::new(&self.config, self.i18n()?))
    }

    /// Content source for the configured repository
    pub fn source(&self) -> Result<Arc<dyn ContentSource>> {
        Ok(Arc::new(PrismicClient::new(&self.config.content)?))
    }

    /// Initialize a new site
    pub fn init(&self) -> Result<()> {
        commands::init::run(self)
    }

    /// Generate the static site
    pub async fn generate(&self, force: bool) -> Result<()> {
        let source = self.source()?;
        commands::generate::run(self, source.as_ref(), force).await
    }

    /// Clean the public directory and the build cache
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.config.title, "Space Traveling");
        assert_eq!(blog.public_dir, dir.path().join("public"));
        assert_eq!(blog.cache_dir(), dir.path().join(".spacetraveling-cache"));
    }

    #[test]
    fn test_config_is_loaded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("_config.yml"),
            "title: Meu Blog\npublic_dir: site\n",
        )
        .unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.config.title, "Meu Blog");
        assert_eq!(blog.public_dir, dir.path().join("site"));
    }

    #[test]
    fn test_site_translation_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("languages")).unwrap();
        std::fs::write(
            dir.path().join("languages/pt-BR.yml"),
            "listing:\n  load_more: Mais posts\n",
        )
        .unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let i18n = blog.i18n().unwrap();
        assert_eq!(i18n.get("listing.load_more"), "Mais posts");
        assert_eq!(i18n.get("post.loading"), "Carregando...");
    }
}
