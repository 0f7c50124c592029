//! Content module - post models, rich text and reading time

mod post;
pub mod reading;
pub mod rich_text;

pub use post::timestamp;
pub use post::{ContentBlock, PagedResult, PostDetail, PostSummary, RawDocument};
pub use reading::{format_read_time, read_minutes};
pub use rich_text::{Block, RichText};
