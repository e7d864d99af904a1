use super::{default_fields, fragment_of, path_part, rule_fields};
use crate::lookup::{Indices, Lookup, LookupOutcome};
use crate::markup::{LinkMatch, ResourceEmbed, ResourceLink};
use crate::models::{ContentRecord, Field};
use crate::rules::{Found, LinkMatcher, Replacement, RewriteScope, Rule, RuleError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ALIAS: &str = "unresolved-links";

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("valid scheme regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedLinkOptions {
    #[serde(default)]
    pub commit: bool,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
}

impl Default for UnresolvedLinkOptions {
    fn default() -> Self {
        Self {
            commit: false,
            fields: default_fields(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UnresolvedLinkNotes {
    /// `exact` or `fuzzy`
    pub strategy: Option<String>,
    pub outcome: Option<LookupOutcome>,
    pub candidates: Vec<String>,
    pub target_id: Option<String>,
}

/// Relative links (`resources/cat`, `../pages/x`) → cross-reference tags
///
/// The destination is first looked up as a path under the content root.
/// Failing that, its last segment is looked up as a file name in every
/// category folder of the site; only a single candidate is used.
pub struct UnresolvedLinkRule<'s> {
    indices: &'s Indices<'s>,
    fields: Vec<Field>,
    matcher: LinkMatcher,
}

/// A destination with no scheme that is neither root-relative, an anchor nor templated
pub(crate) fn is_relative(destination: &str) -> bool {
    let destination = destination.trim();
    !destination.is_empty()
        && !destination.starts_with('/')
        && !destination.starts_with('#')
        && !destination.starts_with('?')
        && !destination.contains("{{")
        && !SCHEME.is_match(destination)
}

impl<'s> UnresolvedLinkRule<'s> {
    pub fn new(
        indices: &'s Indices<'s>,
        options: UnresolvedLinkOptions,
    ) -> Result<Self, RuleError> {
        Ok(Self {
            indices,
            fields: rule_fields(ALIAS, &options.fields)?,
            matcher: LinkMatcher,
        })
    }

    fn fuzzy(&self, record: &ContentRecord, name: &str) -> Lookup<&'s ContentRecord> {
        let site = &record.website;
        let root = self.indices.paths.content_root();
        let mut candidates: Vec<&'s ContentRecord> = Vec::new();

        for folder in self.indices.categories.folders(site) {
            let dirpath = format!("{root}/{folder}");
            let hits = match self.indices.paths.lookup(site, &dirpath, name) {
                Lookup::Found(hit) => vec![hit],
                Lookup::Ambiguous(hits) => hits,
                Lookup::NotFound => continue,
            };
            for hit in hits {
                if !candidates.iter().any(|c| c.text_id == hit.text_id) {
                    candidates.push(hit);
                }
            }
        }
        Lookup::from_candidates(candidates)
    }
}

impl Rule for UnresolvedLinkRule<'_> {
    type Matcher = LinkMatcher;
    type Notes = UnresolvedLinkNotes;

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
        text.contains("](")
    }

    fn accepts(&self, found: &Found<LinkMatch>) -> bool {
        is_relative(&found.value.link.destination)
    }

    fn replace(
        &self,
        found: &Found<LinkMatch>,
        record: &ContentRecord,
        _scope: &mut RewriteScope<'_>,
    ) -> Result<Replacement<UnresolvedLinkNotes>, RuleError> {
        let link = &found.value.link;
        let path = path_part(&link.destination);
        let path = path.strip_prefix("./").unwrap_or(path);
        let mut notes = UnresolvedLinkNotes::default();

        // An ambiguous exact path is final; only a missing one falls back to file names
        let (strategy, lookup) = match self.indices.paths.lookup_url(&record.website, path) {
            Lookup::NotFound => {
                let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
                ("fuzzy", self.fuzzy(record, name))
            }
            exact => ("exact", exact),
        };
        notes.strategy = Some(strategy.to_string());
        notes.outcome = Some(lookup.outcome());
        notes.candidates = lookup.candidate_ids();

        let Lookup::Found(target) = lookup else {
            tracing::warn!(
                "Relative link {} in record {} is {:?}",
                link.destination,
                record.text_id,
                notes.outcome
            );
            return Ok(Replacement::unchanged(found).with_notes(notes));
        };
        notes.target_id = Some(target.text_id.to_string());

        let markup = if link.is_image {
            ResourceEmbed::new(target.text_id.as_str())?.to_markup()
        } else {
            ResourceLink::new(target.text_id.as_str(), link.text.as_str())?
                .with_fragment(fragment_of(&link.destination))
                .to_markup()
        };
        Ok(Replacement::new(markup).with_notes(notes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::*;
    use crate::config::Limits;
    use crate::engine::RewriteEngine;
    use crate::snapshot::CorpusSnapshot;

    fn run(body: &str) -> (String, Vec<UnresolvedLinkNotes>) {
        let snapshot = corpus(body);
        let indices = Indices::build(&snapshot, Limits::default(), "content");
        let rule = UnresolvedLinkRule::new(&indices, UnresolvedLinkOptions::default()).unwrap();
        let outcome = RewriteEngine::new("").run(&rule, &snapshot).unwrap();
        let text = outcome
            .changed
            .first()
            .and_then(|c| c.record.markdown.clone())
            .unwrap_or_else(|| body.to_string());
        (text, outcome.audit.into_iter().filter_map(|r| r.notes).collect())
    }

    #[test]
    fn test_relative_destinations() {
        assert!(is_relative("resources/cat"));
        assert!(is_relative("../x"));
        assert!(!is_relative("/resources/cat"));
        assert!(!is_relative("#top"));
        assert!(!is_relative("https://example.com"));
        assert!(!is_relative("mailto:a@b.c"));
        assert!(!is_relative("{{< baseurl >}}/x"));
    }

    #[test]
    fn test_exact_lookup() {
        let (text, notes) = run("[the cat](resources/cat#whiskers)");
        assert_eq!(
            text,
            format!(r##"{{{{% resource_link "{CAT}" "the cat" "#whiskers" %}}}}"##)
        );
        assert_eq!(notes[0].strategy.as_deref(), Some("exact"));
    }

    #[test]
    fn test_fuzzy_lookup_by_file_name() {
        let (text, notes) = run("[s](../../old/path/syllabus)");
        assert_eq!(
            text,
            format!(r#"{{{{% resource_link "{SYLLABUS}" "s" %}}}}"#)
        );
        assert_eq!(notes[0].strategy.as_deref(), Some("fuzzy"));
    }

    #[test]
    fn test_ambiguous_fuzzy_left_alone() {
        let body = "[dog](old/dog)";
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert_eq!(notes[0].outcome, Some(LookupOutcome::Ambiguous));
        assert_eq!(notes[0].candidates.len(), 2);
    }

    #[test]
    fn test_ambiguous_exact_path_does_not_fall_back() {
        let body = "[s](misc/syllabus)";
        let base = corpus(body);
        let mut records = base.records().to_vec();
        records.push(
            ContentRecord::new("aaaaaaaa-0000-4000-8000-000000000001", "s1", "page")
                .at("content/misc", "syllabus"),
        );
        records.push(
            ContentRecord::new("aaaaaaaa-0000-4000-8000-000000000002", "s1", "page")
                .at("content/misc", "syllabus"),
        );
        let snapshot = CorpusSnapshot::new(base.sites().to_vec(), records).unwrap();
        let indices = Indices::build(&snapshot, Limits::default(), "content");
        let rule = UnresolvedLinkRule::new(&indices, UnresolvedLinkOptions::default()).unwrap();
        let outcome = RewriteEngine::new("").run(&rule, &snapshot).unwrap();

        assert!(outcome.changed.is_empty());
        let notes = outcome.audit[0].notes.clone().unwrap();
        assert_eq!(outcome.audit[0].replacement, body);
        assert_eq!(notes.strategy.as_deref(), Some("exact"));
        assert_eq!(notes.outcome, Some(LookupOutcome::Ambiguous));
        assert_eq!(notes.candidates.len(), 2);
        assert!(notes.target_id.is_none());
    }

    #[test]
    fn test_nested_and_quoted_links_are_idempotent() {
        let (once, notes) = run("[see [c](resources/cat)](pages/syllabus)");
        assert!(once.starts_with(&format!(r#"{{{{% resource_link "{SYLLABUS}" "#)));
        assert_eq!(notes.len(), 1);
        let (twice, notes) = run(&once);
        assert_eq!(once, twice);
        assert!(notes.is_empty());

        let quoted = r#"{{< quote "see [c](resources/cat)" >}}"#;
        let (text, notes) = run(quoted);
        assert_eq!(text, quoted);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_malformed_link_untouched() {
        let body = "[bad][not-a-link)";
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let (once, _) = run("[c](resources/cat) ![i](resources/cat.jpg)");
        assert!(once.contains("resource uuid"));
        let (twice, notes) = run(&once);
        assert_eq!(once, twice);
        assert!(notes.is_empty());
    }
}
