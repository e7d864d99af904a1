//! The two markup languages relink reads and writes.
//!
//! - [`links`]: markdown links and images
//! - [`shortcodes`]: `{{< >}}` / `{{% %}}` template tags
//! - [`xref`]: the permanent-identifier tags relink emits
//!
//! Both grammars sit on [`nested`], a quote-aware balanced delimiter matcher.

pub mod links;
pub mod nested;
pub mod shortcodes;
pub mod xref;

use relink_types::Span;
use thiserror::Error;

pub use links::{find_links, find_links_from, LinkMatch, MarkdownLink};
pub use shortcodes::{
    find_shortcodes, shortcode_spans, Shortcode, ShortcodeMatch, ShortcodeParam, ShortcodeStyle,
};
pub use xref::{ResourceEmbed, ResourceLink};

/// Conditions that must stop processing of a record
///
/// A construct that merely fails to parse is not an error; it is left as
/// text. These variants describe data that would corrupt rendering if
/// rewritten.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("Shortcode nested without quoting at {span:?}: {snippet}")]
    NestedShortcode { span: Span, snippet: String },

    #[error("Invalid cross-reference target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },
}
