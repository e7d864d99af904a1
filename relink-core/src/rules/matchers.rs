use super::{Found, Matcher};
use crate::markup::{
    find_links, find_links_from, find_shortcodes, shortcode_spans, LinkMatch, MarkupError,
    ShortcodeMatch,
};
use regex::Regex;
use relink_types::Span;
use std::collections::BTreeMap;

/// Capture groups of one regex match, detached from the source text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    groups: Vec<Option<String>>,
    named: BTreeMap<String, String>,
}

impl Captures {
    /// Group by index; 0 is the whole match
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index)?.as_deref()
    }

    /// Named group, `None` when it did not participate
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

/// The shortcode span strictly enclosing `pos`, if any
fn enclosing(spans: &[Span], pos: usize) -> Option<Span> {
    spans
        .iter()
        .copied()
        .find(|span| span.start < pos && pos < span.end)
}

/// Regex matches outside shortcodes
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    outside_links: bool,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(Regex::new(pattern)?))
    }

    pub fn from_regex(regex: Regex) -> Self {
        Self {
            regex,
            outside_links: false,
        }
    }

    /// Also skip matches that start inside the text of a markdown link
    pub fn outside_links(mut self) -> Self {
        self.outside_links = true;
        self
    }
}

impl Matcher for RegexMatcher {
    type Value = Captures;

    fn find(&self, text: &str) -> Result<Vec<Found<Captures>>, MarkupError> {
        let names: Vec<Option<&str>> = self.regex.capture_names().collect();
        let mut skip = shortcode_spans(text);
        if self.outside_links {
            skip.extend(find_links(text).map(|link| link.span));
        }

        let found = self
            .regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                if enclosing(&skip, whole.start()).is_some() {
                    return None;
                }
                let groups = caps
                    .iter()
                    .map(|g| g.map(|m| m.as_str().to_string()))
                    .collect();
                let named = names
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, name)| {
                        let group = caps.get(idx)?;
                        Some(((*name)?.to_string(), group.as_str().to_string()))
                    })
                    .collect();
                Some(Found::new(
                    text,
                    Span::new(whole.start(), whole.end()),
                    Captures { groups, named },
                ))
            })
            .collect();
        Ok(found)
    }
}

/// Top-level markdown links and images outside shortcodes
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkMatcher;

impl Matcher for LinkMatcher {
    type Value = LinkMatch;

    fn find(&self, text: &str) -> Result<Vec<Found<LinkMatch>>, MarkupError> {
        let shortcodes = shortcode_spans(text);
        let mut found = Vec::new();
        let mut links = find_links(text);

        while let Some(link) = links.next() {
            // A link inside a quoted argument is argument text; rescan after the shortcode
            if let Some(span) = enclosing(&shortcodes, link.span.start) {
                links = find_links_from(text, span.end);
                continue;
            }
            found.push(Found {
                span: link.span,
                original: link.original.clone(),
                value: link,
            });
        }
        Ok(found)
    }
}

/// Every shortcode, closers included
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcodeMatcher;

impl Matcher for ShortcodeMatcher {
    type Value = ShortcodeMatch;

    fn find(&self, text: &str) -> Result<Vec<Found<ShortcodeMatch>>, MarkupError> {
        find_shortcodes(text)
            .map(|found| {
                found.map(|shortcode| Found {
                    span: shortcode.span,
                    original: shortcode.original.clone(),
                    value: shortcode,
                })
            })
            .collect()
    }
}
