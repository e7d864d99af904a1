//! Shortcode tags: `{{< name args >}}`, `{{% name args %}}` and their closers.
//!
//! A delimiter sequence inside a quoted argument belongs to that argument.
//! The renderer downstream cannot expand a shortcode nested in another
//! shortcode's parameters, so the boundary implied by the quoting is kept
//! exactly as written. An *unquoted* nested sequence is corrupt data and is
//! reported as [`MarkupError::NestedShortcode`].

use super::nested::{Ignore, Nested, NestedMatcher};
use super::MarkupError;
use once_cell::sync::Lazy;
use relink_types::Span;
use serde::Serialize;
use std::fmt;

static PLAIN: Lazy<NestedMatcher> = Lazy::new(|| {
    NestedMatcher::new(
        "{{<",
        ">}}",
        Ignore::QuotesAndEscapes {
            quote: '"',
            escape: '\\',
        },
    )
});

static RICH: Lazy<NestedMatcher> = Lazy::new(|| {
    NestedMatcher::new(
        "{{%",
        "%}}",
        Ignore::QuotesAndEscapes {
            quote: '"',
            escape: '\\',
        },
    )
});

/// Delimiter family of a shortcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortcodeStyle {
    /// `{{< … >}}`: arguments are passed through untouched
    Plain,
    /// `{{% … %}}`: arguments may carry markup that the renderer processes
    Rich,
}

impl ShortcodeStyle {
    pub fn open(&self) -> &'static str {
        match self {
            ShortcodeStyle::Plain => "{{<",
            ShortcodeStyle::Rich => "{{%",
        }
    }

    pub fn close(&self) -> &'static str {
        match self {
            ShortcodeStyle::Plain => ">}}",
            ShortcodeStyle::Rich => "%}}",
        }
    }
}

/// One shortcode parameter; `name` is set for `key=value` parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortcodeParam {
    pub name: Option<String>,
    pub value: String,
}

impl ShortcodeParam {
    pub fn positional(value: impl Into<String>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortcode {
    pub name: String,
    pub params: Vec<ShortcodeParam>,
    pub style: ShortcodeStyle,
    /// `{{</ name >}}` closing tag of a block shortcode
    pub closer: bool,
}

impl Shortcode {
    pub fn new(name: impl Into<String>, style: ShortcodeStyle) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            style,
            closer: false,
        }
    }

    pub fn closing(name: impl Into<String>, style: ShortcodeStyle) -> Self {
        Self {
            closer: true,
            ..Self::new(name, style)
        }
    }

    /// Append a positional parameter
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.params.push(ShortcodeParam::positional(value));
        self
    }

    /// Append a named parameter
    pub fn named(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(ShortcodeParam::named(name, value));
        self
    }

    /// The `index`-th positional parameter
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.params
            .iter()
            .filter(|p| p.name.is_none())
            .nth(index)
            .map(|p| p.value.as_str())
    }

    /// Value of a named parameter
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
            .map(|p| p.value.as_str())
    }

    /// Serialize back to markup
    ///
    /// Every value is wrapped in double quotes and only `"` is escaped;
    /// brackets, backticks and asterisks pass through unchanged.
    pub fn to_markup(&self) -> String {
        let open = self.style.open();
        let close = self.style.close();
        if self.closer {
            return format!("{open}/ {} {close}", self.name);
        }

        let mut out = format!("{open} {}", self.name);
        for param in &self.params {
            out.push(' ');
            if let Some(name) = &param.name {
                out.push_str(name);
                out.push('=');
            }
            out.push('"');
            out.push_str(&param.value.replace('"', "\\\""));
            out.push('"');
        }
        out.push(' ');
        out.push_str(close);
        out
    }
}

impl fmt::Display for Shortcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

/// A parsed shortcode and the exact text it was parsed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortcodeMatch {
    pub span: Span,
    pub original: String,
    pub shortcode: Shortcode,
}

/// Lazily find every top-level shortcode in `text`
pub fn find_shortcodes(text: &str) -> Shortcodes<'_> {
    Shortcodes { text, pos: 0 }
}

/// Parse the shortcode that starts exactly at `pos`, if any
pub fn shortcode_at(text: &str, pos: usize) -> Result<Option<ShortcodeMatch>, MarkupError> {
    match extent_at(text, pos) {
        Some((nested, style)) => parse_construct(nested, style),
        None => Ok(None),
    }
}

/// Balanced extent of a shortcode sequence starting at `pos`, without parsing its arguments
pub(crate) fn extent_at(text: &str, pos: usize) -> Option<(Nested<'_>, ShortcodeStyle)> {
    let rest = text.get(pos..)?;
    if rest.starts_with(ShortcodeStyle::Plain.open()) {
        PLAIN
            .match_at(text, pos)
            .map(|n| (n, ShortcodeStyle::Plain))
    } else if rest.starts_with(ShortcodeStyle::Rich.open()) {
        RICH.match_at(text, pos).map(|n| (n, ShortcodeStyle::Rich))
    } else {
        None
    }
}

/// Iterator returned by [`find_shortcodes`]
#[derive(Debug)]
pub struct Shortcodes<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Iterator for Shortcodes<'t> {
    type Item = Result<ShortcodeMatch, MarkupError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let at = self.pos + self.text[self.pos..].find("{{")?;
            match extent_at(self.text, at) {
                Some((nested, style)) => match parse_construct(nested, style) {
                    Ok(Some(found)) => {
                        self.pos = found.span.end;
                        return Some(Ok(found));
                    }
                    Ok(None) => self.pos = at + 1,
                    Err(err) => {
                        // Nothing after a corrupt construct is trustworthy
                        self.pos = self.text.len();
                        return Some(Err(err));
                    }
                },
                None => self.pos = at + 1,
            }
        }
        None
    }
}

/// Spans of every top-level shortcode sequence in `text`, parsed or not
///
/// Text inside these spans belongs to a shortcode (usually a quoted
/// argument), so nothing in it is a construct of its own.
pub fn shortcode_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(offset) = text[pos..].find("{{") {
        let at = pos + offset;
        match extent_at(text, at) {
            Some((nested, _)) => {
                spans.push(nested.span);
                pos = nested.span.end;
            }
            None => pos = at + 1,
        }
    }
    spans
}

fn parse_construct(
    nested: Nested<'_>,
    style: ShortcodeStyle,
) -> Result<Option<ShortcodeMatch>, MarkupError> {
    let mut rest = nested.inner.trim_start();
    let closer = rest.starts_with('/');
    if closer {
        rest = rest[1..].trim_start();
    }

    let name_len = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    let name = &rest[..name_len];
    if !is_valid_name(name) {
        return Ok(None);
    }

    let params = match tokenize(&rest[name_len..]) {
        Ok(Some(params)) => params,
        Ok(None) => return Ok(None),
        Err(snippet) => {
            return Err(MarkupError::NestedShortcode {
                span: nested.span,
                snippet,
            })
        }
    };

    if closer && !params.is_empty() {
        return Ok(None);
    }

    Ok(Some(ShortcodeMatch {
        span: nested.span,
        original: nested.original.to_string(),
        shortcode: Shortcode {
            name: name.to_string(),
            params,
            style,
            closer,
        },
    }))
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '/' | '.'))
        && !name.starts_with('/')
}

/// Split an argument list into parameters
///
/// `Ok(None)` means the arguments are malformed (an unterminated quote);
/// `Err` carries the offending token when an unquoted delimiter sequence
/// appears as an argument.
fn tokenize(args: &str) -> Result<Option<Vec<ShortcodeParam>>, String> {
    let mut params = Vec::new();
    let mut rest = args;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(Some(params));
        }

        if rest.starts_with('"') {
            let Some((value, len)) = read_quoted(rest) else {
                return Ok(None);
            };
            params.push(ShortcodeParam::positional(value));
            rest = &rest[len..];
            continue;
        }

        if rest.starts_with("{{<") || rest.starts_with("{{%") {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            return Err(rest[..end].to_string());
        }

        let key_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '"')
            .unwrap_or(rest.len());
        if rest[key_end..].starts_with('=') && key_end > 0 {
            let key = &rest[..key_end];
            let value_part = &rest[key_end + 1..];
            if value_part.starts_with('"') {
                let Some((value, len)) = read_quoted(value_part) else {
                    return Ok(None);
                };
                params.push(ShortcodeParam::named(key, value));
                rest = &value_part[len..];
            } else {
                if value_part.starts_with("{{<") || value_part.starts_with("{{%") {
                    let end = value_part
                        .find(char::is_whitespace)
                        .unwrap_or(value_part.len());
                    return Err(value_part[..end].to_string());
                }
                let end = value_part
                    .find(char::is_whitespace)
                    .unwrap_or(value_part.len());
                params.push(ShortcodeParam::named(key, &value_part[..end]));
                rest = &value_part[end..];
            }
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        params.push(ShortcodeParam::positional(&rest[..end]));
        rest = &rest[end..];
    }
}

/// Read a `"…"` string at the start of `s`; returns the unescaped value and bytes consumed
fn read_quoted(s: &str) -> Option<(String, usize)> {
    let end = super::nested::quoted_end(s, 0, '"', '\\')?;
    let raw = &s[1..end - 1];
    Some((raw.replace("\\\"", "\""), end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(text: &str) -> Vec<ShortcodeMatch> {
        find_shortcodes(text)
            .collect::<Result<Vec<_>, _>>()
            .expect("no fatal errors")
    }

    #[test]
    fn test_plain_shortcode_without_args() {
        let found = parse_all("see {{< baseurl >}}/x");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].original, "{{< baseurl >}}");
        assert_eq!(found[0].span, Span::new(4, 19));
        assert_eq!(found[0].shortcode.name, "baseurl");
        assert_eq!(found[0].shortcode.style, ShortcodeStyle::Plain);
        assert!(found[0].shortcode.params.is_empty());
    }

    #[test]
    fn test_rich_shortcode_with_mixed_params() {
        let text = r#"{{% resource_link "abc" "The *title*" anchor=top %}}"#;
        let found = parse_all(text);
        let sc = &found[0].shortcode;
        assert_eq!(sc.style, ShortcodeStyle::Rich);
        assert_eq!(sc.positional(0), Some("abc"));
        assert_eq!(sc.positional(1), Some("The *title*"));
        assert_eq!(sc.get("anchor"), Some("top"));
    }

    #[test]
    fn test_escaped_quotes_are_unescaped() {
        let found = parse_all(r#"{{< quote "He said \"hi\"" >}}"#);
        assert_eq!(found[0].shortcode.positional(0), Some(r#"He said "hi""#));
    }

    #[test]
    fn test_quoted_nested_delimiters_stay_literal() {
        let text = r#"{{< outer "has {{< inner x >}} inside" >}}"#;
        let found = parse_all(text);
        assert_eq!(found.len(), 1);
        let sc = &found[0].shortcode;
        assert_eq!(sc.name, "outer");
        assert_eq!(sc.params.len(), 1);
        assert_eq!(sc.params[0].value, "has {{< inner x >}} inside");
        assert_eq!(found[0].original, text);
    }

    #[test]
    fn test_unquoted_nesting_is_fatal() {
        let text = "{{< outer {{< inner >}} >}}";
        let err = find_shortcodes(text).next().unwrap().unwrap_err();
        assert!(matches!(err, MarkupError::NestedShortcode { .. }));
    }

    #[test]
    fn test_closing_tags() {
        let found = parse_all("{{< div-with-class \"x\" >}}body{{</ div-with-class >}}");
        assert_eq!(found.len(), 2);
        assert!(!found[0].shortcode.closer);
        assert!(found[1].shortcode.closer);
        assert_eq!(found[1].shortcode.name, "div-with-class");

        let rich = parse_all("{{%/ quiz %}}");
        assert!(rich[0].shortcode.closer);
        assert_eq!(rich[0].shortcode.style, ShortcodeStyle::Rich);
    }

    #[test]
    fn test_comment_form_is_not_a_shortcode() {
        assert!(parse_all("{{</* resource x */>}}").is_empty());
    }

    #[test]
    fn test_unbalanced_is_skipped() {
        let found = parse_all("{{< broken and then {{< ok >}}");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shortcode.name, "ok");
    }

    #[test]
    fn test_shortcode_spans_cover_quoted_arguments() {
        let text = r#"a {{< quote "see [x]({{< baseurl >}}/y)" >}} b {{< broken {{% ok %}}"#;
        let spans = shortcode_spans(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(
            &text[spans[0].range()],
            r#"{{< quote "see [x]({{< baseurl >}}/y)" >}}"#
        );
        assert_eq!(&text[spans[1].range()], "{{% ok %}}");
    }

    #[test]
    fn test_serialization_requotes_every_argument() {
        let found = parse_all(r#"{{< resource uuid=abc `code` "a [b] *c*" >}}"#);
        insta::assert_snapshot!(
            found[0].shortcode.to_markup(),
            @r#"{{< resource uuid="abc" "`code`" "a [b] *c*" >}}"#
        );
    }

    #[test]
    fn test_serialization_escapes_only_double_quotes() {
        let sc = Shortcode::new("resource_link", ShortcodeStyle::Rich)
            .arg("id")
            .arg(r#"say "x" [y]"#);
        assert_eq!(
            sc.to_markup(),
            r#"{{% resource_link "id" "say \"x\" [y]" %}}"#
        );
        assert_eq!(
            Shortcode::closing("quiz", ShortcodeStyle::Plain).to_markup(),
            "{{</ quiz >}}"
        );
    }

    #[test]
    fn test_reparse_of_serialized_form_is_stable() {
        let sc = Shortcode::new("resource_link", ShortcodeStyle::Rich)
            .arg("id")
            .arg(r#"say "x" {{< sup 1 >}}"#);
        let markup = sc.to_markup();
        let found = parse_all(&markup);
        assert_eq!(found[0].shortcode, sc);
        assert_eq!(found[0].shortcode.to_markup(), markup);
    }

    #[test]
    fn test_shortcode_at_requires_exact_position() {
        let text = "x{{< baseurl >}}";
        assert!(shortcode_at(text, 0).unwrap().is_none());
        assert_eq!(
            shortcode_at(text, 1).unwrap().unwrap().shortcode.name,
            "baseurl"
        );
    }
}
