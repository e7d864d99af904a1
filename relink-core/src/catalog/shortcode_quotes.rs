use super::{default_fields, rule_fields};
use crate::markup::ShortcodeMatch;
use crate::models::{ContentRecord, Field};
use crate::rules::{Found, Replacement, RewriteScope, Rule, RuleError, ShortcodeMatcher};
use serde::{Deserialize, Serialize};

pub const ALIAS: &str = "shortcode-quotes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortcodeQuoteOptions {
    #[serde(default)]
    pub commit: bool,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
}

impl Default for ShortcodeQuoteOptions {
    fn default() -> Self {
        Self {
            commit: false,
            fields: default_fields(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShortcodeQuoteNotes {
    pub name: String,
    pub params: usize,
    pub changed: bool,
}

/// Re-serializes every shortcode with canonical argument quoting
pub struct ShortcodeQuoteRule {
    fields: Vec<Field>,
    matcher: ShortcodeMatcher,
}

impl ShortcodeQuoteRule {
    pub fn new(options: ShortcodeQuoteOptions) -> Result<Self, RuleError> {
        Ok(Self {
            fields: rule_fields(ALIAS, &options.fields)?,
            matcher: ShortcodeMatcher,
        })
    }
}

impl Rule for ShortcodeQuoteRule {
    type Matcher = ShortcodeMatcher;
    type Notes = ShortcodeQuoteNotes;

    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn matcher(&self) -> &ShortcodeMatcher {
        &self.matcher
    }

    fn prefilter(&self, text: &str) -> bool {
        text.contains("{{<") || text.contains("{{%")
    }

    fn replace(
        &self,
        found: &Found<ShortcodeMatch>,
        _record: &ContentRecord,
        _scope: &mut RewriteScope<'_>,
    ) -> Result<Replacement<ShortcodeQuoteNotes>, RuleError> {
        let shortcode = &found.value.shortcode;
        let text = shortcode.to_markup();
        let notes = ShortcodeQuoteNotes {
            name: shortcode.name.clone(),
            params: shortcode.params.len(),
            changed: text != found.original,
        };
        Ok(Replacement::new(text).with_notes(notes))
    }
}
