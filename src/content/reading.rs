//! Reading-time estimate

use super::post::ContentBlock;
use super::rich_text::as_text;

/// Words read per minute
pub const WORDS_PER_MINUTE: usize = 200;

/// Number of whitespace-separated words in a text
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes to read a post.
///
/// Each block is rounded up to whole minutes on its own and the results are
/// summed, so two 100-word blocks read as 2 minutes.
pub fn read_minutes(blocks: &[ContentBlock]) -> usize {
    blocks
        .iter()
        .map(|block| word_count(&as_text(&block.body)).div_ceil(WORDS_PER_MINUTE))
        .sum()
}

/// Reading time as shown on the post page, e.g. `"4 min"`
pub fn format_read_time(blocks: &[ContentBlock]) -> String {
    format!("{} min", read_minutes(blocks))
}
