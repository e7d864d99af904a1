use super::wrapped::{rewrite_wrapped, wrapped_image, OuterTarget, WrappedCase};
use super::{default_fields, fragment_of, link_kind, rule_fields, strip_placeholder, LinkKind};
use crate::lookup::{Indices, Lookup, LookupOutcome};
use crate::markup::{LinkMatch, ResourceEmbed, ResourceLink};
use crate::models::{ContentRecord, Field};
use crate::rules::{Found, LinkMatcher, Replacement, RewriteScope, Rule, RuleError};
use relink_types::SiteId;
use serde::{Deserialize, Serialize};

pub const ALIAS: &str = "baseurl";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseUrlOptions {
    #[serde(default)]
    pub commit: bool,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Name of the shortcode that stands for the site root
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_placeholder() -> String {
    String::from("baseurl")
}

impl Default for BaseUrlOptions {
    fn default() -> Self {
        Self {
            commit: false,
            fields: default_fields(),
            placeholder: default_placeholder(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BaseUrlNotes {
    pub link_type: Option<LinkKind>,
    /// Site-relative path after the placeholder
    pub path: String,
    pub outcome: Option<LookupOutcome>,
    pub target_id: Option<String>,
    pub candidates: Vec<String>,
    pub wrapped: Option<WrappedCase>,
}

/// `[text]({{< baseurl >}}/path)` → cross-reference tags
pub struct BaseUrlRule<'s> {
    indices: &'s Indices<'s>,
    options: BaseUrlOptions,
    fields: Vec<Field>,
    matcher: LinkMatcher,
}

impl<'s> BaseUrlRule<'s> {
    pub fn new(indices: &'s Indices<'s>, options: BaseUrlOptions) -> Result<Self, RuleError> {
        let fields = rule_fields(ALIAS, &options.fields)?;
        if options.placeholder.trim().is_empty() {
            return Err(RuleError::options(ALIAS, "placeholder must not be empty"));
        }
        Ok(Self {
            indices,
            options,
            fields,
            matcher: LinkMatcher,
        })
    }

    fn placeholder_path<'d>(&self, destination: &'d str) -> Option<&'d str> {
        strip_placeholder(destination, &self.options.placeholder)
    }

    fn resolve(&self, site: &SiteId, path: &str) -> Lookup<&'s ContentRecord> {
        self.indices.paths.lookup_url(site, path)
    }

    fn replace_wrapped(
        &self,
        found: &Found<LinkMatch>,
        record: &ContentRecord,
        path: &str,
        mut notes: BaseUrlNotes,
    ) -> Result<Replacement<BaseUrlNotes>, RuleError> {
        let Some(wrapped) = wrapped_image(&found.value) else {
            return Ok(Replacement::unchanged(found).with_notes(notes));
        };
        let site = &record.website;

        let image = self
            .placeholder_path(&wrapped.image.link.destination)
            .and_then(|image_path| self.resolve(site, image_path).found());
        let lookup = self.resolve(site, path);
        notes.outcome = Some(lookup.outcome());
        notes.candidates = lookup.candidate_ids();
        let outer = match lookup {
            Lookup::Found(target) => OuterTarget::SameSite(target),
            _ => OuterTarget::Unresolved,
        };

        let (text, case) =
            rewrite_wrapped(image, &outer, &found.value.link.destination, &wrapped.text)?;
        notes.wrapped = Some(case);
        notes.target_id = image.map(|r| r.text_id.to_string());
        match text {
            Some(text) => Ok(Replacement::new(text).with_notes(notes)),
            None => {
                tracing::warn!("Wrapped image left as is ({:?}): {}", case, found.original);
                Ok(Replacement::unchanged(found).with_notes(notes))
            }
        }
    }
}

impl Rule for BaseUrlRule<'_> {
    type Matcher = LinkMatcher;
    type Notes = BaseUrlNotes;

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
        text.contains(self.options.placeholder.as_str())
    }

    fn accepts(&self, found: &Found<LinkMatch>) -> bool {
        self.placeholder_path(&found.value.link.destination).is_some()
    }

    fn replace(
        &self,
        found: &Found<LinkMatch>,
        record: &ContentRecord,
        _scope: &mut RewriteScope<'_>,
    ) -> Result<Replacement<BaseUrlNotes>, RuleError> {
        let link = &found.value.link;
        let Some(path) = self.placeholder_path(&link.destination) else {
            return Ok(Replacement::unchanged(found));
        };
        let kind = link_kind(&found.value);
        let notes = BaseUrlNotes {
            link_type: Some(kind),
            path: path.to_string(),
            ..Default::default()
        };

        if kind == LinkKind::WrappedImage {
            return self.replace_wrapped(found, record, path, notes);
        }

        let lookup = self.resolve(&record.website, path);
        let notes = BaseUrlNotes {
            outcome: Some(lookup.outcome()),
            candidates: lookup.candidate_ids(),
            ..notes
        };
        let target = match lookup {
            Lookup::Found(target) => target,
            _ => {
                tracing::warn!(
                    "{} in record {} is {:?}",
                    path,
                    record.text_id,
                    notes.outcome
                );
                return Ok(Replacement::unchanged(found).with_notes(notes));
            }
        };

        let text = if link.is_image {
            ResourceEmbed::new(target.text_id.as_str())?.to_markup()
        } else {
            ResourceLink::new(target.text_id.as_str(), link.text.as_str())?
                .with_fragment(fragment_of(path))
                .to_markup()
        };
        Ok(Replacement::new(text).with_notes(BaseUrlNotes {
            target_id: Some(target.text_id.to_string()),
            ..notes
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::*;
    use crate::config::Limits;
    use crate::engine::RewriteEngine;

    fn run(body: &str) -> (String, Vec<BaseUrlNotes>) {
        let snapshot = corpus(body);
        let indices = Indices::build(&snapshot, Limits::default(), "content");
        let rule = BaseUrlRule::new(&indices, BaseUrlOptions::default()).unwrap();
        let outcome = RewriteEngine::new("").run(&rule, &snapshot).unwrap();

        let text = outcome
            .changed
            .iter()
            .find(|c| c.record.text_id.as_str() == PAGE)
            .and_then(|c| c.record.markdown.clone())
            .unwrap_or_else(|| body.to_string());
        let notes = outcome.audit.into_iter().filter_map(|row| row.notes).collect();
        (text, notes)
    }

    #[test]
    fn test_link_becomes_resource_link() {
        let (text, notes) = run("See [cat]({{< baseurl >}}/resources/cat).");
        assert_eq!(
            text,
            format!(r#"See {{{{% resource_link "{CAT}" "cat" %}}}}."#)
        );
        assert_eq!(notes[0].outcome, Some(LookupOutcome::Found));
        assert_eq!(notes[0].target_id.as_deref(), Some(CAT));
    }

    #[test]
    fn test_fragment_is_kept() {
        let (text, _) = run("[grading]({{< baseurl >}}/pages/syllabus#grading)");
        assert_eq!(
            text,
            format!(r##"{{{{% resource_link "{SYLLABUS}" "grading" "#grading" %}}}}"##)
        );
    }

    #[test]
    fn test_image_becomes_embed() {
        let (text, _) = run("![a cat]({{< baseurl >}}/resources/cat.jpg)");
        assert_eq!(text, format!(r#"{{{{< resource uuid="{CAT_IMG}" >}}}}"#));
    }

    #[test]
    fn test_wrapped_image() {
        let (text, notes) =
            run("[![c]({{< baseurl >}}/resources/cat.jpg)]({{< baseurl >}}/pages/syllabus)");
        assert_eq!(
            text,
            format!(r#"{{{{< resource uuid="{CAT_IMG}" href_uuid="{SYLLABUS}" >}}}}"#)
        );
        assert_eq!(notes[0].wrapped, Some(WrappedCase::ImageOnly));
        assert_eq!(notes[0].link_type, Some(LinkKind::WrappedImage));
    }

    #[test]
    fn test_unresolved_and_ambiguous_left_alone() {
        let body = "[x]({{< baseurl >}}/resources/nope) [y]({{< baseurl >}}/other)";
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.outcome == Some(LookupOutcome::NotFound)));
    }

    #[test]
    fn test_other_links_are_not_attempts() {
        let body = "[bad][not-a-link) [plain](/resources/cat) [x](https://example.com)";
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let body = "[cat]({{< baseurl >}}/resources/cat) and ![i]({{< baseurl >}}/resources/cat.jpg)";
        let (once, _) = run(body);
        let (twice, notes) = run(&once);
        assert_eq!(once, twice);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_nested_link_is_idempotent() {
        let body = "[see [cat]({{< baseurl >}}/resources/cat)]({{< baseurl >}}/pages/syllabus)";
        let (once, _) = run(body);
        assert_eq!(
            once,
            format!(
                r#"{{{{% resource_link "{SYLLABUS}" "see [cat]({{{{< baseurl >}}}}/resources/cat)" %}}}}"#
            )
        );
        let (twice, notes) = run(&once);
        assert_eq!(once, twice);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_links_in_quoted_arguments_are_untouched() {
        let body = r#"{{< quote "see [x]({{< baseurl >}}/resources/cat)" >}}"#;
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert!(notes.is_empty());
    }
}
