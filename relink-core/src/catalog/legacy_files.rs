use super::{default_fields, path_part, rule_fields};
use crate::lookup::{Indices, Lookup, LookupOutcome};
use crate::markup::{LinkMatch, ResourceEmbed};
use crate::models::{ContentRecord, Field};
use crate::rules::{Found, LinkMatcher, Replacement, RewriteScope, Rule, RuleError};
use serde::{Deserialize, Serialize};

pub const ALIAS: &str = "legacy-files";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyFileOptions {
    #[serde(default)]
    pub commit: bool,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
}

impl Default for LegacyFileOptions {
    fn default() -> Self {
        Self {
            commit: false,
            fields: default_fields(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyFileNotes {
    pub filename: String,
    pub outcome: Option<LookupOutcome>,
    pub candidates: Vec<String>,
    pub target_id: Option<String>,
}

/// Images whose file name matches an upload's pre-migration name → `resource` embeds
pub struct LegacyFileRule<'s> {
    indices: &'s Indices<'s>,
    fields: Vec<Field>,
    matcher: LinkMatcher,
}

impl<'s> LegacyFileRule<'s> {
    pub fn new(indices: &'s Indices<'s>, options: LegacyFileOptions) -> Result<Self, RuleError> {
        Ok(Self {
            indices,
            fields: rule_fields(ALIAS, &options.fields)?,
            matcher: LinkMatcher,
        })
    }
}

fn basename(destination: &str) -> &str {
    let path = path_part(destination).trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

impl Rule for LegacyFileRule<'_> {
    type Matcher = LinkMatcher;
    type Notes = LegacyFileNotes;

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
        text.contains("![")
    }

    fn accepts(&self, found: &Found<LinkMatch>) -> bool {
        let link = &found.value.link;
        link.is_image && !link.destination.contains("{{") && !basename(&link.destination).is_empty()
    }

    fn replace(
        &self,
        found: &Found<LinkMatch>,
        record: &ContentRecord,
        _scope: &mut RewriteScope<'_>,
    ) -> Result<Replacement<LegacyFileNotes>, RuleError> {
        let filename = basename(&found.value.link.destination);
        let lookup = self.indices.legacy.lookup(&record.website, filename);
        let mut notes = LegacyFileNotes {
            filename: filename.to_string(),
            outcome: Some(lookup.outcome()),
            candidates: lookup.candidate_ids(),
            target_id: None,
        };

        match lookup {
            Lookup::Found(target) => {
                notes.target_id = Some(target.text_id.to_string());
                let embed = ResourceEmbed::new(target.text_id.as_str())?;
                Ok(Replacement::new(embed.to_markup()).with_notes(notes))
            }
            Lookup::Ambiguous(_) => {
                tracing::warn!(
                    "Legacy file {} in record {} matches {} uploads",
                    filename,
                    record.text_id,
                    notes.candidates.len()
                );
                Ok(Replacement::unchanged(found).with_notes(notes))
            }
            Lookup::NotFound => Ok(Replacement::unchanged(found).with_notes(notes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::*;
    use crate::config::Limits;
    use crate::engine::RewriteEngine;

    fn run(body: &str) -> (String, Vec<LegacyFileNotes>) {
        let snapshot = corpus(body);
        let indices = Indices::build(&snapshot, Limits::default(), "content");
        let rule = LegacyFileRule::new(&indices, LegacyFileOptions::default()).unwrap();
        let outcome = RewriteEngine::new("").run(&rule, &snapshot).unwrap();
        let text = outcome
            .changed
            .first()
            .and_then(|c| c.record.markdown.clone())
            .unwrap_or_else(|| body.to_string());
        (text, outcome.audit.into_iter().filter_map(|r| r.notes).collect())
    }

    #[test]
    fn test_legacy_image_is_embedded() {
        let (text, notes) = run("Look: ![a cat](/images/old/cat.jpg?w=200)");
        assert_eq!(text, format!(r#"Look: {{{{< resource uuid="{CAT_IMG}" >}}}}"#));
        assert_eq!(notes[0].filename, "cat.jpg");
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let body = "![dog](dog.png)";
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert_eq!(notes[0].outcome, Some(LookupOutcome::Ambiguous));
        assert_eq!(notes[0].candidates, vec![DOG_A.to_string(), DOG_B.to_string()]);
    }

    #[test]
    fn test_links_are_not_attempts() {
        let body = "[cat.jpg](cat.jpg) [bad][not-a-link)";
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let (once, _) = run("![c](cat.jpg)");
        let (twice, notes) = run(&once);
        assert_eq!(once, twice);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_images_in_links_and_arguments_are_untouched() {
        let body = r#"[see ![c](cat.jpg)](x) {{< figure "![c](cat.jpg)" >}}"#;
        let (text, notes) = run(body);
        assert_eq!(text, body);
        assert!(notes.is_empty());
    }
}
