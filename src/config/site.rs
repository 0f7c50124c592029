//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted when `content.access_token` is unset
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,

    // Directory
    pub public_dir: String,
    pub i18n_dir: String,

    // Regeneration
    pub revalidate_secs: u64,
    pub fallback: FallbackMode,

    // Content API
    #[serde(default)]
    pub content: ContentConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Space Traveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),

            public_dir: "public".to_string(),
            i18n_dir: "languages".to_string(),

            revalidate_secs: 60 * 60 * 24,
            fallback: FallbackMode::Blocking,

            content: ContentConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// How long a generated post page stays fresh
    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }

    /// Timezone used to render publication dates (UTC when unset or unknown)
    pub fn tz(&self) -> chrono_tz::Tz {
        if self.timezone.is_empty() {
            return chrono_tz::UTC;
        }
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!("Unknown timezone '{}', using UTC", self.timezone);
                chrono_tz::UTC
            }
        }
    }
}

/// How the server answers a post path that has not been generated yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Hold the request until the page is generated
    #[default]
    Blocking,
    /// Answer with a loading placeholder and generate in the background
    Placeholder,
}

/// Content API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// API root, e.g. `https://<repo>.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Page size of the initial listing query
    pub page_size: usize,
    /// Request timeout; no timeout when unset
    pub timeout_secs: Option<u64>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://spacetraveling.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            timeout_secs: None,
        }
    }
}

impl ContentConfig {
    /// Access token from the config file, falling back to the environment
    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Space Traveling");
        assert_eq!(config.language, "pt-BR");
        assert_eq!(config.revalidate(), Duration::from_secs(86_400));
        assert_eq!(config.fallback, FallbackMode::Blocking);
        assert_eq!(config.content.page_size, 1);
        assert_eq!(config.content.document_type, "posts");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
timezone: America/Sao_Paulo
fallback: placeholder
content:
  endpoint: https://myblog.cdn.prismic.io/api/v2
  page_size: 5
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.fallback, FallbackMode::Placeholder);
        assert_eq!(config.content.page_size, 5);
        assert_eq!(config.content.document_type, "posts");
        assert_eq!(config.tz(), chrono_tz::America::Sao_Paulo);
        assert_eq!(config.revalidate_secs, 86_400);
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let config = SiteConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(config.tz(), chrono_tz::UTC);
    }

    #[test]
    fn test_access_token_from_file_wins() {
        let content = ContentConfig {
            access_token: Some("from-file".to_string()),
            ..ContentConfig::default()
        };
        assert_eq!(content.access_token().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SiteConfig::load(dir.path().join("_config.yml")).is_err());
    }
}
