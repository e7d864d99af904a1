//! Balanced delimiter matching.
//!
//! Regular expressions cannot pair `[` with its partner once brackets nest,
//! so both grammars are built on this small scanner. It counts openers and
//! closers of a single delimiter pair, optionally skipping escaped
//! characters and quoted strings, and reports the exact source span of
//! every balanced construct it finds.

use relink_types::Span;

/// What the scanner steps over without looking at it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignore {
    /// Every character is significant
    Nothing,
    /// The character following `escape` is never a delimiter
    Escapes(char),
    /// Like `Escapes`, and inside an open construct a whole quoted string is
    /// skipped. An unterminated quote is an ordinary character.
    QuotesAndEscapes { quote: char, escape: char },
}

impl Ignore {
    fn escape(&self) -> Option<char> {
        match self {
            Ignore::Nothing => None,
            Ignore::Escapes(escape) => Some(*escape),
            Ignore::QuotesAndEscapes { escape, .. } => Some(*escape),
        }
    }

    fn quote(&self) -> Option<char> {
        match self {
            Ignore::QuotesAndEscapes { quote, .. } => Some(*quote),
            _ => None,
        }
    }
}

/// A balanced construct found in some source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nested<'t> {
    /// Span of the whole construct, delimiters included
    pub span: Span,
    /// `source[span]`
    pub original: &'t str,
    /// Text between the outermost delimiters
    pub inner: &'t str,
    pub inner_span: Span,
}

/// Matcher for one opening/closing delimiter pair
#[derive(Debug, Clone)]
pub struct NestedMatcher {
    open: String,
    close: String,
    ignore: Ignore,
}

impl NestedMatcher {
    pub fn new(open: impl Into<String>, close: impl Into<String>, ignore: Ignore) -> Self {
        let open = open.into();
        let close = close.into();
        assert!(
            !open.is_empty() && !close.is_empty(),
            "delimiters must not be empty"
        );
        Self {
            open,
            close,
            ignore,
        }
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }

    /// Lazily iterate over all balanced constructs, left to right, without overlap
    pub fn find_iter<'m, 't>(&'m self, text: &'t str) -> NestedIter<'m, 't> {
        NestedIter {
            matcher: self,
            text,
            pos: 0,
        }
    }

    /// First balanced construct starting at or after `from`
    ///
    /// Openers that never balance are stepped over one character at a time,
    /// so a construct nested inside an unbalanced one is still found.
    pub fn find_at<'t>(&self, text: &'t str, from: usize) -> Option<Nested<'t>> {
        let first = self.open.chars().next()?;
        let escape = self.ignore.escape();
        let mut pos = from;

        while pos < text.len() {
            let rel = text[pos..].find(|c| c == first || Some(c) == escape)?;
            let at = pos + rel;
            let c = text[at..].chars().next()?;

            if Some(c) == escape {
                pos = skip_escaped(text, at, c);
                continue;
            }

            if let Some(found) = self.match_at(text, at) {
                return Some(found);
            }
            pos = at + c.len_utf8();
        }

        None
    }

    /// Match a construct whose opener sits exactly at `start`
    pub fn match_at<'t>(&self, text: &'t str, start: usize) -> Option<Nested<'t>> {
        if !text.get(start..)?.starts_with(&self.open) {
            return None;
        }

        let escape = self.ignore.escape();
        let quote = self.ignore.quote();
        let inner_start = start + self.open.len();
        let mut pos = inner_start;
        let mut depth = 1usize;

        while pos < text.len() {
            let rest = &text[pos..];
            let c = rest.chars().next()?;

            if Some(c) == escape {
                pos = skip_escaped(text, pos, c);
                continue;
            }

            if let (Some(q), Some(e)) = (quote, escape) {
                if c == q {
                    if let Some(end) = quoted_end(text, pos, q, e) {
                        pos = end;
                        continue;
                    }
                }
            }

            if rest.starts_with(&self.close) {
                depth -= 1;
                let inner_end = pos;
                pos += self.close.len();
                if depth == 0 {
                    return Some(Nested {
                        span: Span::new(start, pos),
                        original: &text[start..pos],
                        inner: &text[inner_start..inner_end],
                        inner_span: Span::new(inner_start, inner_end),
                    });
                }
                continue;
            }

            if rest.starts_with(&self.open) {
                depth += 1;
                pos += self.open.len();
                continue;
            }

            pos += c.len_utf8();
        }

        None
    }
}

/// Iterator returned by [`NestedMatcher::find_iter`]
#[derive(Debug)]
pub struct NestedIter<'m, 't> {
    matcher: &'m NestedMatcher,
    text: &'t str,
    pos: usize,
}

impl<'m, 't> Iterator for NestedIter<'m, 't> {
    type Item = Nested<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let found = self.matcher.find_at(self.text, self.pos)?;
        self.pos = found.span.end;
        Some(found)
    }
}

/// True when the character at `idx` is preceded by an odd run of `escape` characters
pub fn is_escaped(text: &str, idx: usize, escape: char) -> bool {
    let run = text[..idx]
        .chars()
        .rev()
        .take_while(|c| *c == escape)
        .count();
    run % 2 == 1
}

/// Position after an escape character and the character it escapes
fn skip_escaped(text: &str, at: usize, escape: char) -> usize {
    let after = at + escape.len_utf8();
    match text[after..].chars().next() {
        Some(next) => after + next.len_utf8(),
        None => after,
    }
}

/// Position just past the quote that closes the string opened at `start`
pub(crate) fn quoted_end(text: &str, start: usize, quote: char, escape: char) -> Option<usize> {
    let mut pos = start + quote.len_utf8();
    while pos < text.len() {
        let c = text[pos..].chars().next()?;
        if c == escape {
            pos = skip_escaped(text, pos, c);
        } else if c == quote {
            return Some(pos + c.len_utf8());
        } else {
            pos += c.len_utf8();
        }
    }
    None
}
