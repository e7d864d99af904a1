//! The rule contract shared by every rewrite.
//!
//! A rule pairs a [`Matcher`] (what to look for) with a replacement function
//! (what to put there). Matchers are either regex-driven or driven by one of
//! the markup grammars; the engine does not care which.

mod matchers;
mod scope;

pub use matchers::{Captures, LinkMatcher, RegexMatcher, ShortcodeMatcher};
pub use scope::RewriteScope;

use crate::markup::MarkupError;
use crate::models::{ContentRecord, Field, FieldError};
use relink_types::Span;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Invalid options for rule {alias}: {message}")]
    Options { alias: String, message: String },
}

impl RuleError {
    pub fn options(alias: &str, message: impl Into<String>) -> Self {
        RuleError::Options {
            alias: alias.to_string(),
            message: message.into(),
        }
    }
}

/// One match reported by a matcher
///
/// `original` is always the exact slice `text[span]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Found<V> {
    pub span: Span,
    pub original: String,
    pub value: V,
}

impl<V> Found<V> {
    pub fn new(text: &str, span: Span, value: V) -> Self {
        Self {
            span,
            original: text[span.range()].to_string(),
            value,
        }
    }
}

/// Finds candidate constructs in a piece of text
pub trait Matcher {
    type Value;

    /// Every non-overlapping match, left to right
    fn find(&self, text: &str) -> Result<Vec<Found<Self::Value>>, MarkupError>;
}

/// The text to splice in for a match, plus notes for the audit trail
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement<N> {
    pub text: String,
    pub notes: Option<N>,
}

impl<N> Replacement<N> {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            notes: None,
        }
    }

    /// Leave the match as it was
    pub fn unchanged<V>(found: &Found<V>) -> Self {
        Self::new(found.original.clone())
    }

    pub fn with_notes(mut self, notes: N) -> Self {
        self.notes = Some(notes);
        self
    }
}

/// A rewrite over record fields
///
/// `replace` must be idempotent: its output, re-scanned, yields no match the
/// rule accepts, or yields matches that rewrite to themselves.
pub trait Rule {
    type Matcher: Matcher;

    /// Audit note columns, in field declaration order
    type Notes: Serialize + Default;

    /// Short name used on the command line and for the audit file
    fn alias(&self) -> &'static str;

    fn fields(&self) -> &[Field];

    fn matcher(&self) -> &Self::Matcher;

    /// Cheap check to skip text that cannot contain a match
    fn prefilter(&self, _text: &str) -> bool {
        true
    }

    /// Whether a parsed value counts as a match attempt for this rule
    fn accepts(&self, _found: &Found<<Self::Matcher as Matcher>::Value>) -> bool {
        true
    }

    fn replace(
        &self,
        found: &Found<<Self::Matcher as Matcher>::Value>,
        record: &ContentRecord,
        scope: &mut RewriteScope<'_>,
    ) -> Result<Replacement<Self::Notes>, RuleError>;
}
