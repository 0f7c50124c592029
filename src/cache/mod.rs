//! Cache module for incremental generation and on-demand pages
//!
//! The build manifest records which posts were rendered from which
//! publication date, so a later `generate` only re-renders what changed.
//! [`PageCache`] keeps rendered post pages in memory for the server.

mod page;

pub use page::{CachedPage, Freshness, PageCache, MAX_MISSING};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Cache directory, relative to the site root
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Manifest file inside the cache directory
const MANIFEST_FILE: &str = "manifest.json";

/// What the last build rendered for one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// `last_publication_date` the page was rendered from
    pub last_publication_date: Option<String>,
    /// Output path relative to the public dir
    pub output_path: String,
}

/// Record of the last build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Version of the manifest format
    pub version: u32,
    /// Hash of the site config (changes trigger full rebuild)
    pub config_hash: u64,
    /// Rendered posts, keyed by uid
    pub posts: BTreeMap<String, ManifestEntry>,
}

impl BuildManifest {
    /// Current manifest format version
    const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load the manifest from disk, or start an empty one
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(CACHE_DIR).join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str::<BuildManifest>(&content) {
                Ok(manifest) if manifest.version == Self::VERSION => return manifest,
                Ok(_) => tracing::info!("Manifest version mismatch, rebuilding"),
                Err(e) => tracing::warn!("Ignoring unreadable manifest {:?}: {}", path, e),
            }
        }
        Self::new()
    }

    /// Save the manifest to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    /// Record a rendered post
    pub fn record(
        &mut self,
        uid: &str,
        last_publication_date: Option<String>,
        output_path: String,
    ) {
        self.posts.insert(
            uid.to_string(),
            ManifestEntry {
                last_publication_date,
                output_path,
            },
        );
    }
}

/// Change detection result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Posts that need rendering (uid)
    pub changed: Vec<String>,
    /// Posts that disappeared from the source (uid)
    pub deleted: Vec<String>,
    /// Whether every page must be rendered again
    pub full_rebuild: bool,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        self.full_rebuild || !self.changed.is_empty() || !self.deleted.is_empty()
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        if self.full_rebuild {
            return "full rebuild required".to_string();
        }

        let mut parts = Vec::new();
        if !self.changed.is_empty() {
            parts.push(format!("{} posts changed", self.changed.len()));
        }
        if !self.deleted.is_empty() {
            parts.push(format!("{} posts deleted", self.deleted.len()));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Calculate a hash for file content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Hash of `_config.yml`, 0 when the site has none
pub fn hash_config(base_dir: &Path) -> u64 {
    fs::read_to_string(base_dir.join("_config.yml"))
        .map(|content| hash_content(&content))
        .unwrap_or(0)
}

/// Compare the posts the source has now, `(uid, last_publication_date)`,
/// with what the manifest says was rendered
pub fn detect_changes(
    manifest: &BuildManifest,
    config_hash: u64,
    current: &[(String, Option<String>)],
) -> ChangeSet {
    let current_uids: HashSet<&str> = current.iter().map(|(uid, _)| uid.as_str()).collect();
    let deleted: Vec<String> = manifest
        .posts
        .keys()
        .filter(|uid| !current_uids.contains(uid.as_str()))
        .cloned()
        .collect();

    let full_rebuild = if manifest.posts.is_empty() {
        true
    } else if manifest.config_hash != config_hash {
        tracing::info!("Config changed, full rebuild required");
        true
    } else {
        false
    };

    if full_rebuild {
        return ChangeSet {
            changed: current.iter().map(|(uid, _)| uid.clone()).collect(),
            deleted,
            full_rebuild,
        };
    }

    let mut changed = Vec::new();
    for (uid, published) in current {
        match manifest.posts.get(uid) {
            Some(entry) if entry.last_publication_date == *published => {}
            Some(_) => {
                tracing::debug!("Post changed: {}", uid);
                changed.push(uid.clone());
            }
            None => {
                tracing::debug!("New post: {}", uid);
                changed.push(uid.clone());
            }
        }
    }
    for uid in &deleted {
        tracing::debug!("Deleted post: {}", uid);
    }

    ChangeSet {
        changed,
        deleted,
        full_rebuild,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest_with(posts: &[(&str, &str)]) -> BuildManifest {
        let mut manifest = BuildManifest::new();
        for (uid, date) in posts {
            manifest.record(uid, Some(date.to_string()), format!("post/{}/index.html", uid));
        }
        manifest
    }

    fn current(posts: &[(&str, &str)]) -> Vec<(String, Option<String>)> {
        posts
            .iter()
            .map(|(uid, date)| (uid.to_string(), Some(date.to_string())))
            .collect()
    }

    #[test]
    fn test_manifest_roundtrip_on_disk() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_with(&[("a", "2021-01-01")]);
        manifest.save(dir.path()).unwrap();

        assert_eq!(BuildManifest::load(dir.path()), manifest);
        assert!(dir.path().join(CACHE_DIR).join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_load_missing_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = BuildManifest::load(dir.path());
        assert_eq!(manifest.version, BuildManifest::VERSION);
        assert!(manifest.posts.is_empty());
    }

    #[test]
    fn test_empty_manifest_means_full_rebuild() {
        let changes = detect_changes(&BuildManifest::new(), 0, &current(&[("a", "d1")]));
        assert!(changes.full_rebuild);
        assert_eq!(changes.changed, ["a"]);
    }

    #[test]
    fn test_detects_changed_new_and_deleted_posts() {
        let manifest = manifest_with(&[("a", "d1"), ("b", "d1"), ("gone", "d1")]);
        let changes = detect_changes(
            &manifest,
            0,
            &current(&[("a", "d1"), ("b", "d2"), ("new", "d1")]),
        );

        assert!(!changes.full_rebuild);
        assert_eq!(changes.changed, ["b", "new"]);
        assert_eq!(changes.deleted, ["gone"]);
        assert_eq!(changes.summary(), "2 posts changed, 1 posts deleted");
    }

    #[test]
    fn test_config_change_means_full_rebuild() {
        let mut manifest = manifest_with(&[("a", "d1")]);
        manifest.config_hash = 1;
        let changes = detect_changes(&manifest, 2, &current(&[("b", "d1")]));
        assert!(changes.full_rebuild);
        assert_eq!(changes.changed, ["b"]);
        assert_eq!(changes.deleted, ["a"]);
    }

    #[test]
    fn test_unchanged_posts() {
        let manifest = manifest_with(&[("a", "d1")]);
        let changes = detect_changes(&manifest, 0, &current(&[("a", "d1")]));
        assert!(!changes.has_changes());
        assert_eq!(changes.summary(), "no changes");
    }
}
