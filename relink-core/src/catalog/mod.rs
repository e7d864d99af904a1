//! The concrete rewrite rules.
//!
//! Every rule has a typed options struct (deserialized from the `rules:`
//! section of `relink.yml`) and a typed notes struct whose fields become the
//! extra columns of its audit file.

mod baseurl;
mod external;
mod legacy_files;
mod resolveuid;
mod root_relative;
mod shortcode_quotes;
mod unresolved;
mod wrapped;

pub use baseurl::{BaseUrlNotes, BaseUrlOptions, BaseUrlRule};
pub use external::{ExternalLinkAction, ExternalLinkNotes, ExternalLinkOptions, ExternalLinkRule};
pub use legacy_files::{LegacyFileNotes, LegacyFileOptions, LegacyFileRule};
pub use resolveuid::{ResolveUidNotes, ResolveUidOptions, ResolveUidRule};
pub use root_relative::{RootRelativeNotes, RootRelativeOptions, RootRelativeRule};
pub use shortcode_quotes::{ShortcodeQuoteNotes, ShortcodeQuoteOptions, ShortcodeQuoteRule};
pub use unresolved::{UnresolvedLinkNotes, UnresolvedLinkOptions, UnresolvedLinkRule};
pub use wrapped::WrappedCase;

use crate::markup::{shortcodes, LinkMatch};
use crate::models::{parse_fields, Field};
use crate::rules::RuleError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Every rule in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    BaseUrl,
    ResolveUid,
    UnresolvedLinks,
    RootRelative,
    LegacyFiles,
    ShortcodeQuotes,
    ExternalLinks,
}

impl RuleKind {
    pub const ALL: [RuleKind; 7] = [
        RuleKind::BaseUrl,
        RuleKind::ResolveUid,
        RuleKind::UnresolvedLinks,
        RuleKind::RootRelative,
        RuleKind::LegacyFiles,
        RuleKind::ShortcodeQuotes,
        RuleKind::ExternalLinks,
    ];

    pub fn alias(&self) -> &'static str {
        match self {
            RuleKind::BaseUrl => "baseurl",
            RuleKind::ResolveUid => "resolveuid",
            RuleKind::UnresolvedLinks => "unresolved-links",
            RuleKind::RootRelative => "root-relative",
            RuleKind::LegacyFiles => "legacy-files",
            RuleKind::ShortcodeQuotes => "shortcode-quotes",
            RuleKind::ExternalLinks => "external-links",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RuleKind::BaseUrl => "Replace {{< baseurl >}} links and images with id tags",
            RuleKind::ResolveUid => "Resolve ./resolveuid/<uid> links by id, title or legacy uid",
            RuleKind::UnresolvedLinks => "Resolve relative links by exact path, then by file name",
            RuleKind::RootRelative => "Resolve /site/path links; canonicalize cross-site links",
            RuleKind::LegacyFiles => "Embed images that still point at pre-migration file names",
            RuleKind::ShortcodeQuotes => "Rewrite shortcodes with canonical argument quoting",
            RuleKind::ExternalLinks => "Turn http(s) links into links to external-resource records",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.alias() == s.trim())
            .ok_or_else(|| {
                let known: Vec<_> = RuleKind::ALL.iter().map(|k| k.alias()).collect();
                format!("unknown rule '{}' (known: {})", s, known.join(", "))
            })
    }
}

/// How a link appeared in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Link,
    Image,
    WrappedImage,
}

fn default_fields() -> Vec<String> {
    vec![String::from("body")]
}

fn rule_fields(alias: &str, names: &[String]) -> Result<Vec<Field>, RuleError> {
    if names.is_empty() {
        return Err(RuleError::options(alias, "at least one field is required"));
    }
    Ok(parse_fields(names)?)
}

/// Path after a leading placeholder shortcode such as `{{< baseurl >}}`
fn strip_placeholder<'d>(destination: &'d str, placeholder: &str) -> Option<&'d str> {
    let found = shortcodes::shortcode_at(destination, 0).ok()??;
    let shortcode = &found.shortcode;
    if shortcode.name == placeholder && shortcode.params.is_empty() && !shortcode.closer {
        Some(&destination[found.span.end..])
    } else {
        None
    }
}

/// Destination without query string or fragment
fn path_part(destination: &str) -> &str {
    destination
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
}

fn fragment_of(destination: &str) -> Option<&str> {
    destination.split_once('#').map(|(_, fragment)| fragment)
}

fn link_kind(found: &LinkMatch) -> LinkKind {
    if found.link.is_image {
        LinkKind::Image
    } else if wrapped::wrapped_image(found).is_some() {
        LinkKind::WrappedImage
    } else {
        LinkKind::Link
    }
}
