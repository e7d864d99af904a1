use super::{default_fields, rule_fields};
use crate::lookup::{Indices, Lookup, LookupOutcome};
use crate::markup::{ResourceEmbed, ResourceLink};
use crate::models::{ContentRecord, Field};
use crate::rules::{Captures, Found, RegexMatcher, Replacement, RewriteScope, Rule, RuleError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ALIAS: &str = "resolveuid";

static RESOLVEUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<bang>!)?\[(?P<text>[^\[\]\n]*)\]\((?:\.{0,2}/)?resolveuid/(?P<uid>[0-9A-Za-z-]+)/?(?:#(?P<fragment>[^)\s]*))?\)",
    )
    .expect("valid resolveuid regex")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveUidOptions {
    #[serde(default)]
    pub commit: bool,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
}

impl Default for ResolveUidOptions {
    fn default() -> Self {
        Self {
            commit: false,
            fields: default_fields(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveUidNotes {
    pub uid: String,
    pub id_outcome: Option<LookupOutcome>,
    pub title_outcome: Option<LookupOutcome>,
    pub legacy_outcome: Option<LookupOutcome>,
    /// Strategy that found the target: `id`, `title` or `legacy_uid`
    pub strategy: Option<String>,
    pub target_id: Option<String>,
}

/// `[text](./resolveuid/<uid>)` → cross-reference tags
///
/// Tries the uid as a permanent id, then the link text as a title within
/// the record's site, then the uid as a legacy uid within the site.
pub struct ResolveUidRule<'s> {
    indices: &'s Indices<'s>,
    fields: Vec<Field>,
    matcher: RegexMatcher,
}

impl<'s> ResolveUidRule<'s> {
    pub fn new(indices: &'s Indices<'s>, options: ResolveUidOptions) -> Result<Self, RuleError> {
        Ok(Self {
            indices,
            fields: rule_fields(ALIAS, &options.fields)?,
            matcher: RegexMatcher::from_regex(RESOLVEUID.clone()).outside_links(),
        })
    }

    fn resolve(
        &self,
        record: &ContentRecord,
        uid: &str,
        text: &str,
        notes: &mut ResolveUidNotes,
    ) -> Option<&'s ContentRecord> {
        let by_id = self.indices.identity.by_id(uid);
        notes.id_outcome = Some(by_id.outcome());
        if let Lookup::Found(target) = by_id {
            notes.strategy = Some("id".to_string());
            return Some(target);
        }

        if !text.trim().is_empty() {
            let by_title = self.indices.identity.by_title(&record.website, text);
            notes.title_outcome = Some(by_title.outcome());
            if let Lookup::Found(target) = by_title {
                notes.strategy = Some("title".to_string());
                return Some(target);
            }
        }

        let by_legacy = self.indices.identity.by_legacy_uid(&record.website, uid);
        notes.legacy_outcome = Some(by_legacy.outcome());
        if let Lookup::Found(target) = by_legacy {
            notes.strategy = Some("legacy_uid".to_string());
            return Some(target);
        }
        None
    }
}

impl Rule for ResolveUidRule<'_> {
    type Matcher = RegexMatcher;
    type Notes = ResolveUidNotes;

    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn matcher(&self) -> &RegexMatcher {
        &self.matcher
    }

    fn prefilter(&self, text: &str) -> bool {
        text.contains("resolveuid")
    }

    fn replace(
        &self,
        found: &Found<Captures>,
        record: &ContentRecord,
        _scope: &mut RewriteScope<'_>,
    ) -> Result<Replacement<ResolveUidNotes>, RuleError> {
        let caps = &found.value;
        let uid = caps.name("uid").unwrap_or_default();
        let text = caps.name("text").unwrap_or_default();
        let mut notes = ResolveUidNotes {
            uid: uid.to_string(),
            ..Default::default()
        };

        let Some(target) = self.resolve(record, uid, text, &mut notes) else {
            tracing::warn!("resolveuid {} in record {} did not resolve", uid, record.text_id);
            return Ok(Replacement::unchanged(found).with_notes(notes));
        };
        notes.target_id = Some(target.text_id.to_string());

        let markup = if caps.name("bang").is_some() {
            ResourceEmbed::new(target.text_id.as_str())?.to_markup()
        } else {
            ResourceLink::new(target.text_id.as_str(), text)?
                .with_fragment(caps.name("fragment"))
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

    fn run(body: &str) -> (String, Vec<ResolveUidNotes>) {
        let snapshot = corpus(body);
        let indices = Indices::build(&snapshot, Limits::default(), "content");
        let rule = ResolveUidRule::new(&indices, ResolveUidOptions::default()).unwrap();
        let outcome = RewriteEngine::new("").run(&rule, &snapshot).unwrap();
        let text = outcome
            .changed
            .first()
            .and_then(|c| c.record.markdown.clone())
            .unwrap_or_else(|| body.to_string());
        (text, outcome.audit.into_iter().filter_map(|r| r.notes).collect())
    }

    #[test]
    fn test_resolves_by_id_first() {
        let undashed = CAT.replace('-', "");
        let (text, notes) = run(&format!("[Syllabus](./resolveuid/{undashed}#top)"));
        assert_eq!(
            text,
            format!(r##"{{{{% resource_link "{CAT}" "Syllabus" "#top" %}}}}"##)
        );
        assert_eq!(notes[0].strategy.as_deref(), Some("id"));
        assert_eq!(notes[0].title_outcome, None);
    }

    #[test]
    fn test_falls_back_to_title_then_legacy_uid() {
        let (text, notes) = run("[Syllabus](resolveuid/ffffffffffffffffffffffffffffffff)");
        assert_eq!(
            text,
            format!(r#"{{{{% resource_link "{SYLLABUS}" "Syllabus" %}}}}"#)
        );
        assert_eq!(notes[0].id_outcome, Some(LookupOutcome::NotFound));
        assert_eq!(notes[0].strategy.as_deref(), Some("title"));

        let (text, notes) = run("[Dog](../resolveuid/0A1B2C3D4E5F60718293A4B5C6D7E8F9)");
        assert_eq!(
            text,
            format!(r#"{{{{% resource_link "{SYLLABUS}" "Dog" %}}}}"#)
        );
        assert_eq!(notes[0].title_outcome, Some(LookupOutcome::Ambiguous));
        assert_eq!(notes[0].strategy.as_deref(), Some("legacy_uid"));
    }

    #[test]
    fn test_image_becomes_embed() {
        let (text, _) = run(&format!("![c](./resolveuid/{CAT_IMG})"));
        assert_eq!(text, format!(r#"{{{{< resource uuid="{CAT_IMG}" >}}}}"#));
    }

    #[test]
    fn test_unresolved_left_alone() {
        let body = "[Nothing](./resolveuid/deadbeef)";
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert_eq!(notes[0].legacy_outcome, Some(LookupOutcome::NotFound));
        assert!(notes[0].strategy.is_none());
    }

    #[test]
    fn test_idempotent() {
        let (once, _) = run(&format!("x [a](./resolveuid/{CAT}) y"));
        let (twice, notes) = run(&once);
        assert_eq!(once, twice);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_nested_and_quoted_links_are_untouched() {
        let body = format!(
            r#"[see [a](./resolveuid/{CAT})](./resolveuid/{SYLLABUS}) {{{{< q "[b](resolveuid/{CAT})" >}}}}"#
        );
        let (text, notes) = run(&body);
        assert_eq!(text, body);
        assert!(notes.is_empty());

        let (once, _) = run(&format!("[a](resolveuid/{CAT}) [b](resolveuid/{SYLLABUS})"));
        let (twice, notes) = run(&once);
        assert_eq!(once, twice);
        assert!(notes.is_empty());
    }
}
