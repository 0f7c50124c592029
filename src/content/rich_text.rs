//! Structured rich text as stored by the content API
//!
//! A body is a list of blocks. Text blocks carry `spans` that mark ranges of
//! the text as strong, emphasised, linked or labelled. Span offsets count
//! UTF-16 code units, the way the API's editor counts them.
//!
//! The markup produced by [`as_html`] is trusted: embed blocks pass their
//! provider HTML through untouched and nothing here sanitizes. Templates
//! inject it verbatim.

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// A structured rich-text body
pub type RichText = Vec<Block>;

/// One block of structured rich text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Block {
    Heading1(TextBlock),
    Heading2(TextBlock),
    Heading3(TextBlock),
    Heading4(TextBlock),
    Heading5(TextBlock),
    Heading6(TextBlock),
    Paragraph(TextBlock),
    Preformatted(TextBlock),
    ListItem(TextBlock),
    OListItem(TextBlock),
    Image(ImageBlock),
    Embed(EmbedBlock),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedBlock {
    pub oembed: Oembed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Oembed {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
}

/// A formatted range inside a text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Block {
    /// The text of a text block; `None` for images, embeds and unknown blocks
    pub fn text_block(&self) -> Option<&TextBlock> {
        match self {
            Block::Heading1(t)
            | Block::Heading2(t)
            | Block::Heading3(t)
            | Block::Heading4(t)
            | Block::Heading5(t)
            | Block::Heading6(t)
            | Block::Paragraph(t)
            | Block::Preformatted(t)
            | Block::ListItem(t)
            | Block::OListItem(t) => Some(t),
            _ => None,
        }
    }
}

/// Plain text of a body: the text of every text block, joined by a space
pub fn as_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter_map(Block::text_block)
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Markup of a body
pub fn as_html(blocks: &[Block]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list_tag = match block {
            Block::ListItem(_) => Some("ul"),
            Block::OListItem(_) => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }

        match block {
            Block::Heading1(t) => push_element(&mut html, "h1", t),
            Block::Heading2(t) => push_element(&mut html, "h2", t),
            Block::Heading3(t) => push_element(&mut html, "h3", t),
            Block::Heading4(t) => push_element(&mut html, "h4", t),
            Block::Heading5(t) => push_element(&mut html, "h5", t),
            Block::Heading6(t) => push_element(&mut html, "h6", t),
            Block::Paragraph(t) => push_element(&mut html, "p", t),
            Block::Preformatted(t) => push_element(&mut html, "pre", t),
            Block::ListItem(t) | Block::OListItem(t) => push_element(&mut html, "li", t),
            Block::Image(image) => {
                html.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    html_escape(&image.url),
                    html_escape(image.alt.as_deref().unwrap_or(""))
                ));
            }
            Block::Embed(embed) => {
                let oembed = &embed.oembed;
                html.push_str(&format!(
                    r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
                    html_escape(oembed.embed_url.as_deref().unwrap_or("")),
                    html_escape(oembed.kind.as_deref().unwrap_or("")),
                    html_escape(&oembed.provider_name.as_deref().unwrap_or("").to_lowercase()),
                    oembed.html.as_deref().unwrap_or("")
                ));
            }
            Block::Unsupported => {
                tracing::debug!("Skipping unsupported rich text block");
            }
        }
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn push_element(html: &mut String, tag: &str, block: &TextBlock) {
    html.push_str(&format!("<{}>", tag));
    html.push_str(&render_spans(&block.text, &block.spans));
    html.push_str(&format!("</{}>", tag));
}

/// A span with offsets converted to byte positions in the text
struct ByteSpan<'a> {
    start: usize,
    end: usize,
    span: &'a Span,
}

fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut byte_spans: Vec<ByteSpan> = spans
        .iter()
        .map(|span| ByteSpan {
            start: utf16_to_byte(text, span.start),
            end: utf16_to_byte(text, span.end),
            span,
        })
        .filter(|s| s.start < s.end)
        .collect();

    // Outer spans first so that inner ones nest inside them
    byte_spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    render_range(text, 0, text.len(), &byte_spans)
}

fn render_range(text: &str, start: usize, end: usize, spans: &[ByteSpan]) -> String {
    let mut out = String::new();
    let mut pos = start;
    let mut i = 0;

    while i < spans.len() {
        let span_start = spans[i].start.max(pos);
        let span_end = spans[i].end.min(end);
        if span_start >= span_end {
            i += 1;
            continue;
        }

        out.push_str(&escape_text(&text[pos..span_start]));

        let mut j = i + 1;
        while j < spans.len() && spans[j].start < span_end {
            j += 1;
        }

        let inner = render_range(text, span_start, span_end, &spans[i + 1..j]);
        out.push_str(&wrap_span(spans[i].span, &inner));

        pos = span_end;
        i = j;
    }

    out.push_str(&escape_text(&text[pos..end]));
    out
}

fn wrap_span(span: &Span, inner: &str) -> String {
    let data = span.data.clone().unwrap_or_default();
    match span.kind.as_str() {
        "strong" => format!("<strong>{}</strong>", inner),
        "em" => format!("<em>{}</em>", inner),
        "hyperlink" => {
            let href = html_escape(data.url.as_deref().unwrap_or(""));
            match data.target {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener">{}</a>"#,
                    href,
                    html_escape(&target),
                    inner
                ),
                None => format!(r#"<a href="{}">{}</a>"#, href, inner),
            }
        }
        "label" => format!(
            r#"<span class="{}">{}</span>"#,
            html_escape(data.label.as_deref().unwrap_or("")),
            inner
        ),
        _ => inner.to_string(),
    }
}

fn escape_text(text: &str) -> String {
    html_escape(text).replace('\n', "<br />")
}

/// Byte index of a UTF-16 offset, clamped to the text length
fn utf16_to_byte(text: &str, offset: usize) -> usize {
    let mut units = 0;
    for (byte, c) in text.char_indices() {
        if units >= offset {
            return byte;
        }
        units += c.len_utf16();
    }
    text.len()
}
