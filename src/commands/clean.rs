//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::Blog;

/// Clean the public directory and the build cache
pub fn run(blog: &Blog) -> Result<()> {
    for dir in [blog.public_dir.clone(), blog.cache_dir()] {
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            tracing::info!("Deleted: {:?}", dir);
        }
    }

    Ok(())
}
