//! Built-in theme templates using Tera template engine
//!
//! Templates and static assets are embedded directly in the binary.

use anyhow::Result;
use tera::{Context, Tera};

use crate::helpers::html_escape;

/// Stylesheet written to `css/style.css`
pub const STYLE_CSS: &str = include_str!("theme/assets/style.css");

/// Listing "load more" script written to `js/listing.js`
pub const LISTING_JS: &str = include_str!("theme/assets/listing.js");

/// Static assets as `(path under the public dir, contents)`
pub const ASSETS: &[(&str, &str)] = &[("css/style.css", STYLE_CSS), ("js/listing.js", LISTING_JS)];

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all theme templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Autoescape stays on for .html; URLs keep their slashes
        tera.set_escape_fn(html_escape);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("loading.html", include_str!("theme/loading.html")),
            ("error.html", include_str!("theme/error.html")),
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/post_card.html",
                include_str!("theme/partials/post_card.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}
