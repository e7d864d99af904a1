//! Markdown links and images: `[text](destination "title")` and `![text](…)`.
//!
//! Link text may hold balanced brackets and complete nested links (an image
//! wrapped in a link is the common case). Destinations in legacy content
//! embed shortcodes such as `{{< baseurl >}}`, which contain whitespace, so
//! a shortcode sequence inside a destination is consumed as one token.

use super::nested::{is_escaped, Ignore, NestedMatcher};
use super::shortcodes;
use once_cell::sync::Lazy;
use relink_types::Span;
use serde::Serialize;

static BRACKETS: Lazy<NestedMatcher> =
    Lazy::new(|| NestedMatcher::new("[", "]", Ignore::Escapes('\\')));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkdownLink {
    pub text: String,
    pub destination: String,
    pub title: Option<String>,
    pub is_image: bool,
}

impl MarkdownLink {
    pub fn new(text: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            destination: destination.into(),
            title: None,
            is_image: false,
        }
    }

    pub fn image(text: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            is_image: true,
            ..Self::new(text, destination)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Serialize back to markdown; a title is always written in double quotes
    pub fn to_markdown(&self) -> String {
        let bang = if self.is_image { "!" } else { "" };
        match &self.title {
            Some(title) => format!(
                "{bang}[{}]({} \"{}\")",
                self.text,
                self.destination,
                title.replace('"', "\\\"")
            ),
            None => format!("{bang}[{}]({})", self.text, self.destination),
        }
    }

    /// Destination split at the first `#` into (path, fragment)
    pub fn split_fragment(&self) -> (&str, Option<&str>) {
        match self.destination.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (self.destination.as_str(), None),
        }
    }
}

/// A parsed link and the exact source it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkMatch {
    pub span: Span,
    pub original: String,
    /// Span of the link text within the source
    pub text_span: Span,
    pub link: MarkdownLink,
}

impl LinkMatch {
    /// Links and images inside this link's text, with spans relative to the text
    pub fn nested(&self) -> Links<'_> {
        find_links(&self.link.text)
    }
}

/// Lazily find every top-level link or image in `text`
pub fn find_links(text: &str) -> Links<'_> {
    find_links_from(text, 0)
}

/// Like [`find_links`], starting the scan at byte `pos`
pub fn find_links_from(text: &str, pos: usize) -> Links<'_> {
    Links {
        text,
        pos: pos.min(text.len()),
    }
}

/// Iterator returned by [`find_links`]
#[derive(Debug)]
pub struct Links<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Iterator for Links<'t> {
    type Item = LinkMatch;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(brackets) = BRACKETS.find_at(self.text, self.pos) {
            match parse_link(self.text, brackets.span, brackets.inner_span) {
                Some(found) => {
                    self.pos = found.span.end;
                    return Some(found);
                }
                // Retry just inside the failed construct so inner links survive
                None => self.pos = brackets.span.start + 1,
            }
        }
        self.pos = self.text.len();
        None
    }
}

fn parse_link(text: &str, brackets: Span, text_span: Span) -> Option<LinkMatch> {
    let inner = &text[text_span.range()];
    if inner.contains("\n\n") {
        return None;
    }

    let is_image = brackets.start > 0
        && text[..brackets.start].ends_with('!')
        && !is_escaped(text, brackets.start - 1, '\\');
    let start = if is_image {
        brackets.start - 1
    } else {
        brackets.start
    };

    if !text[brackets.end..].starts_with('(') {
        return None;
    }

    let dest_start = brackets.end + 1;
    let dest_end = scan_destination(text, dest_start)?;
    let (title, end) = scan_title(text, dest_end)?;

    Some(LinkMatch {
        span: Span::new(start, end),
        original: text[start..end].to_string(),
        text_span,
        link: MarkdownLink {
            text: inner.to_string(),
            destination: text[dest_start..dest_end].to_string(),
            title,
            is_image,
        },
    })
}

/// End of the destination starting at `from`
///
/// Stops at unescaped whitespace or at the `)` that is not balanced by an
/// earlier `(`. Returns `None` when the text ends first.
fn scan_destination(text: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    let mut depth = 0usize;

    loop {
        let rest = &text[pos..];
        let c = rest.chars().next()?;

        if c == '{' {
            if let Some((shortcode, _)) = shortcodes::extent_at(text, pos) {
                pos = shortcode.span.end;
                continue;
            }
        }

        match c {
            '\\' => {
                pos += 1;
                if let Some(next) = text[pos..].chars().next() {
                    pos += next.len_utf8();
                }
            }
            c if c.is_whitespace() => return Some(pos),
            '(' => {
                depth += 1;
                pos += 1;
            }
            ')' if depth == 0 => return Some(pos),
            ')' => {
                depth -= 1;
                pos += 1;
            }
            c => pos += c.len_utf8(),
        }
    }
}

/// Parse the optional title after a destination; returns it and the position past `)`
fn scan_title(text: &str, from: usize) -> Option<(Option<String>, usize)> {
    let c = text[from..].chars().next()?;
    if c == ')' {
        return Some((None, from + 1));
    }
    if !c.is_whitespace() {
        return None;
    }

    let quote_pos = from + c.len_utf8();
    let quote = text[quote_pos..].chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }

    let end = super::nested::quoted_end(text, quote_pos, quote, '\\')?;
    let raw = &text[quote_pos + 1..end - 1];
    if raw.contains("\n\n") {
        return None;
    }

    if !text[end..].starts_with(')') {
        return None;
    }

    let escaped = format!("\\{quote}");
    Some((Some(raw.replace(&escaped, &quote.to_string())), end + 1))
}
