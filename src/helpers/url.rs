//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Public URL of a post page
///
/// # Examples
/// ```ignore
/// post_url("como-utilizar-hooks") // -> "/post/como-utilizar-hooks"
/// ```
pub fn post_url(uid: &str) -> String {
    format!("/post/{}", utf8_percent_encode(uid, SEGMENT))
}

/// Path of a post page relative to the public directory
pub fn post_output_path(uid: &str) -> String {
    format!("{}/index.html", post_url(uid).trim_start_matches('/'))
}

/// Whether a uid can be used as a single path segment on disk
pub fn is_safe_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid != "."
        && uid != ".."
        && !uid.contains(['/', '\\'])
        && !uid.chars().any(char::is_control)
}
