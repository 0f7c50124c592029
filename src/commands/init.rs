//! Initialize a new blog site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::Blog;

const CONFIG_TEMPLATE: &str = r#"# Space Traveling configuration

# Site
title: Space Traveling
description: ''
language: pt-BR
timezone: ''

# URL
url: http://localhost:4000

# Directory
public_dir: public
i18n_dir: languages

# Post pages
## Seconds a generated post page is served before it is rebuilt
revalidate_secs: 86400
## blocking: build unknown posts while the request waits
## placeholder: answer with a loading page and build in the background
fallback: blocking

# Content API
content:
  endpoint: https://spacetraveling.cdn.prismic.io/api/v2
  ## Leave empty to read PRISMIC_ACCESS_TOKEN from the environment
  access_token:
  document_type: posts
  page_size: 1
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        bail!("{:?} already exists", config_path);
    }

    fs::create_dir_all(target_dir.join("languages"))?;
    fs::write(&config_path, CONFIG_TEMPLATE)?;
    Ok(())
}

/// Run the init command with an existing Blog instance
pub fn run(blog: &Blog) -> Result<()> {
    init_site(&blog.base_dir)
}
