use super::wrapped::{rewrite_wrapped, wrapped_image, OuterTarget, WrappedCase};
use super::{default_fields, fragment_of, link_kind, rule_fields, LinkKind};
use crate::lookup::{Indices, Lookup, LookupOutcome};
use crate::markup::{LinkMatch, MarkdownLink, ResourceEmbed, ResourceLink};
use crate::models::{ContentRecord, Field, Site};
use crate::rules::{Found, LinkMatcher, Replacement, RewriteScope, Rule, RuleError};
use serde::{Deserialize, Serialize};

pub const ALIAS: &str = "root-relative";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootRelativeOptions {
    #[serde(default)]
    pub commit: bool,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
}

impl Default for RootRelativeOptions {
    fn default() -> Self {
        Self {
            commit: false,
            fields: default_fields(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RootRelativeNotes {
    pub link_type: Option<LinkKind>,
    /// Site named by the URL
    pub site: Option<String>,
    pub relative_path: Option<String>,
    pub cross_site: bool,
    pub outcome: Option<LookupOutcome>,
    pub target_id: Option<String>,
    pub wrapped: Option<WrappedCase>,
}

/// `/courses/<site>/path` links
///
/// Links into the record's own site become cross-reference tags. Links into
/// another site stay links, with the destination rewritten to that site's
/// canonical URL.
pub struct RootRelativeRule<'s> {
    indices: &'s Indices<'s>,
    fields: Vec<Field>,
    matcher: LinkMatcher,
}

fn is_root_relative(destination: &str) -> bool {
    destination.starts_with('/') && !destination.starts_with("//")
}

impl<'s> RootRelativeRule<'s> {
    pub fn new(indices: &'s Indices<'s>, options: RootRelativeOptions) -> Result<Self, RuleError> {
        Ok(Self {
            indices,
            fields: rule_fields(ALIAS, &options.fields)?,
            matcher: LinkMatcher,
        })
    }

    fn resolve(&self, destination: &str) -> Option<(&'s Site, String, Lookup<&'s ContentRecord>)> {
        let (site, path) = self.indices.sites.relativize(destination)?;
        let lookup = self.indices.paths.lookup_url(&site.id, &path);
        Some((site, path, lookup))
    }

    fn replace_wrapped(
        &self,
        found: &Found<LinkMatch>,
        record: &ContentRecord,
        outer: OuterTarget<'s>,
        mut notes: RootRelativeNotes,
    ) -> Result<Replacement<RootRelativeNotes>, RuleError> {
        let Some(wrapped) = wrapped_image(&found.value) else {
            return Ok(Replacement::unchanged(found).with_notes(notes));
        };

        let image_destination = &wrapped.image.link.destination;
        let image = if is_root_relative(image_destination) {
            self.resolve(image_destination)
                .and_then(|(_, _, lookup)| lookup.found())
        } else {
            None
        };

        let (text, case) =
            rewrite_wrapped(image, &outer, &found.value.link.destination, &wrapped.text)?;
        notes.wrapped = Some(case);
        notes.target_id = image.map(|r| r.text_id.to_string());
        match text {
            Some(text) => Ok(Replacement::new(text).with_notes(notes)),
            None => {
                tracing::warn!(
                    "Wrapped image in record {} left as is ({:?})",
                    record.text_id,
                    case
                );
                Ok(Replacement::unchanged(found).with_notes(notes))
            }
        }
    }
}

impl Rule for RootRelativeRule<'_> {
    type Matcher = LinkMatcher;
    type Notes = RootRelativeNotes;

    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn matcher(&self) -> &LinkMatcher {
        &self.matcher
    }

    fn prefilter(&self, text: &str) -> bool {
        text.contains("](/")
    }

    fn accepts(&self, found: &Found<LinkMatch>) -> bool {
        is_root_relative(&found.value.link.destination)
    }

    fn replace(
        &self,
        found: &Found<LinkMatch>,
        record: &ContentRecord,
        _scope: &mut RewriteScope<'_>,
    ) -> Result<Replacement<RootRelativeNotes>, RuleError> {
        let link = &found.value.link;
        let kind = link_kind(&found.value);
        let mut notes = RootRelativeNotes {
            link_type: Some(kind),
            ..Default::default()
        };

        let Some((site, path, lookup)) = self.resolve(&link.destination) else {
            tracing::debug!("{} names no known site", link.destination);
            return Ok(Replacement::unchanged(found).with_notes(notes));
        };
        let cross_site = site.id != record.website;
        let canonical = format!("{}{}", site.public_path(), path);
        notes.site = Some(site.name.clone());
        notes.relative_path = Some(path);
        notes.cross_site = cross_site;
        notes.outcome = Some(lookup.outcome());

        if kind == LinkKind::WrappedImage {
            let outer = match lookup {
                Lookup::Found(_) if cross_site => OuterTarget::CrossSite(canonical),
                Lookup::Found(target) => OuterTarget::SameSite(target),
                _ => OuterTarget::Unresolved,
            };
            return self.replace_wrapped(found, record, outer, notes);
        }

        let Lookup::Found(target) = lookup else {
            tracing::warn!(
                "{} in record {} is {:?}",
                link.destination,
                record.text_id,
                notes.outcome
            );
            return Ok(Replacement::unchanged(found).with_notes(notes));
        };
        notes.target_id = Some(target.text_id.to_string());

        let text = if cross_site {
            MarkdownLink {
                destination: canonical,
                ..link.clone()
            }
            .to_markdown()
        } else if link.is_image {
            ResourceEmbed::new(target.text_id.as_str())?.to_markup()
        } else {
            ResourceLink::new(target.text_id.as_str(), link.text.as_str())?
                .with_fragment(fragment_of(&link.destination))
                .to_markup()
        };
        Ok(Replacement::new(text).with_notes(notes))
    }
}
