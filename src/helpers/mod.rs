//! Helper functions for templates and page controllers

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
