//! Cross-reference tags that point at a record by permanent identifier.
//!
//! These are the only shortcodes relink writes. A tag naming something that
//! is not a valid identifier would render as a broken link with no error
//! anywhere downstream, so construction refuses it.

use super::shortcodes::{Shortcode, ShortcodeStyle};
use super::MarkupError;
use uuid::Uuid;

/// Validate a permanent identifier and return it trimmed, in its stored spelling
pub fn validate_target(target: &str) -> Result<String, MarkupError> {
    let trimmed = target.trim();
    match Uuid::parse_str(trimmed) {
        Ok(uuid) if uuid.is_nil() => Err(MarkupError::InvalidTarget {
            target: target.to_string(),
            reason: "nil identifier".to_string(),
        }),
        Ok(_) => Ok(trimmed.to_string()),
        Err(err) => Err(MarkupError::InvalidTarget {
            target: target.to_string(),
            reason: err.to_string(),
        }),
    }
}

/// `{{% resource_link "<id>" "<text>" ["#<fragment>"] %}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    target: String,
    text: String,
    fragment: Option<String>,
}

impl ResourceLink {
    pub fn new(target: &str, text: impl Into<String>) -> Result<Self, MarkupError> {
        Ok(Self {
            target: validate_target(target)?,
            text: text.into(),
            fragment: None,
        })
    }

    /// Attach an anchor; a leading `#` is optional and an empty fragment is dropped
    pub fn with_fragment(mut self, fragment: Option<&str>) -> Self {
        self.fragment = fragment
            .map(|f| f.trim_start_matches('#'))
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        self
    }

    pub fn to_shortcode(&self) -> Shortcode {
        let shortcode = Shortcode::new("resource_link", ShortcodeStyle::Rich)
            .arg(&self.target)
            .arg(&self.text);
        match &self.fragment {
            Some(fragment) => shortcode.arg(format!("#{fragment}")),
            None => shortcode,
        }
    }

    pub fn to_markup(&self) -> String {
        self.to_shortcode().to_markup()
    }
}

/// Where an embedded resource links to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Href {
    /// Another record, by permanent identifier
    Record(String),
    /// A literal URL kept as written
    Url(String),
}

/// `{{< resource uuid="<id>" [href_uuid="<id>" | href="<url>"] >}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEmbed {
    target: String,
    href: Option<Href>,
}

impl ResourceEmbed {
    pub fn new(target: &str) -> Result<Self, MarkupError> {
        Ok(Self {
            target: validate_target(target)?,
            href: None,
        })
    }

    pub fn with_href_record(mut self, target: &str) -> Result<Self, MarkupError> {
        self.href = Some(Href::Record(validate_target(target)?));
        Ok(self)
    }

    pub fn with_href_url(mut self, url: impl Into<String>) -> Self {
        self.href = Some(Href::Url(url.into()));
        self
    }

    pub fn to_shortcode(&self) -> Shortcode {
        let shortcode =
            Shortcode::new("resource", ShortcodeStyle::Plain).named("uuid", &self.target);
        match &self.href {
            Some(Href::Record(id)) => shortcode.named("href_uuid", id),
            Some(Href::Url(url)) => shortcode.named("href", url),
            None => shortcode,
        }
    }

    pub fn to_markup(&self) -> String {
        self.to_shortcode().to_markup()
    }
}
