//! External links become links to external-resource records.
//!
//! An `http(s)` link is replaced by a `resource_link` to a record that holds
//! the URL. A record already holding the URL in the same site is reused;
//! otherwise one is derived with an id that depends only on the site and the
//! URL, so repeated runs derive the same record.

use super::{default_fields, rule_fields};
use crate::checksum::refresh_checksum;
use crate::lookup::{Indices, Lookup};
use crate::markup::{LinkMatch, ResourceLink};
use crate::models::{ContentRecord, Field};
use crate::rules::{Found, LinkMatcher, Replacement, RewriteScope, Rule, RuleError};
use crate::slug::derivative_filename;
use relink_types::SiteId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub const ALIAS: &str = "external-links";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalLinkOptions {
    #[serde(default)]
    pub commit: bool,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Set the license warning on every derived record instead of computing it
    #[serde(default)]
    pub force_license_warning: Option<bool>,

    /// Hosts (and their subdomains) whose content needs no license warning
    #[serde(default)]
    pub exempt_hosts: Vec<String>,

    /// Category of derived records
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    String::from("external-resource")
}

impl Default for ExternalLinkOptions {
    fn default() -> Self {
        Self {
            commit: false,
            fields: default_fields(),
            force_license_warning: None,
            exempt_hosts: Vec::new(),
            category: default_category(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalLinkAction {
    /// An existing record holds the URL
    Reused,
    /// A record was derived and will be written
    Created,
    /// A record would be derived; nothing is written without `commit`
    Previewed,
    Ambiguous,
    InvalidUrl,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExternalLinkNotes {
    pub url: String,
    pub action: Option<ExternalLinkAction>,
    pub target_id: Option<String>,
    pub title: Option<String>,
    pub license_warning: Option<bool>,
}

pub struct ExternalLinkRule<'s> {
    indices: &'s Indices<'s>,
    options: ExternalLinkOptions,
    fields: Vec<Field>,
    matcher: LinkMatcher,
}

/// Permanent id of the record derived for `url` in `site`
pub fn derived_id(site: &SiteId, url: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("{site}\n{url}").as_bytes())
}

fn is_external(destination: &str) -> bool {
    let lower = destination.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl<'s> ExternalLinkRule<'s> {
    pub fn new(indices: &'s Indices<'s>, options: ExternalLinkOptions) -> Result<Self, RuleError> {
        if options.category.trim().is_empty() {
            return Err(RuleError::options(ALIAS, "category must not be empty"));
        }
        Ok(Self {
            indices,
            fields: rule_fields(ALIAS, &options.fields)?,
            options,
            matcher: LinkMatcher,
        })
    }

    fn license_warning(&self, host: &str) -> bool {
        if let Some(forced) = self.options.force_license_warning {
            return forced;
        }
        let exempt = self.options.exempt_hosts.iter().any(|exempt| {
            let exempt = exempt.trim().trim_start_matches('.').to_ascii_lowercase();
            host == exempt || host.ends_with(&format!(".{exempt}"))
        });
        !exempt
    }

    fn derive(
        &self,
        site: &SiteId,
        url: &str,
        title: &str,
        license_warning: bool,
    ) -> ContentRecord {
        let category = &self.options.category;
        let folder = self
            .indices
            .categories
            .folder_for(site, category)
            .unwrap_or(category.as_str());
        let dirpath = format!("{}/{}", self.indices.paths.content_root(), folder);
        let filename = derivative_filename(title, url, self.indices.limits().filename_max_len);

        let id = derived_id(site, url).to_string();
        let mut record = ContentRecord::new(id, site.as_str(), category.as_str())
            .with_title(title)
            .with_metadata(json!({
                "external_url": url,
                "has_external_license_warning": license_warning,
            }))
            .at(dirpath, filename);
        refresh_checksum(&mut record);
        record
    }
}

impl Rule for ExternalLinkRule<'_> {
    type Matcher = LinkMatcher;
    type Notes = ExternalLinkNotes;

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
        text.contains("](http") || text.contains("](HTTP")
    }

    fn accepts(&self, found: &Found<LinkMatch>) -> bool {
        let link = &found.value.link;
        !link.is_image && is_external(&link.destination) && found.value.nested().next().is_none()
    }

    fn replace(
        &self,
        found: &Found<LinkMatch>,
        record: &ContentRecord,
        scope: &mut RewriteScope<'_>,
    ) -> Result<Replacement<ExternalLinkNotes>, RuleError> {
        let link = &found.value.link;
        let url = link.destination.trim();
        let site = &record.website;
        let mut notes = ExternalLinkNotes {
            url: url.to_string(),
            ..Default::default()
        };

        let host = match url::Url::parse(url) {
            Ok(parsed) => parsed.host_str().map(str::to_string),
            Err(_) => None,
        };
        let Some(host) = host else {
            tracing::warn!("Unparseable external URL {} in record {}", url, record.text_id);
            notes.action = Some(ExternalLinkAction::InvalidUrl);
            return Ok(Replacement::unchanged(found).with_notes(notes));
        };

        let (target_id, action) = match self.indices.identity.by_external_url(site, url) {
            Lookup::Found(existing) => (existing.text_id.to_string(), ExternalLinkAction::Reused),
            Lookup::Ambiguous(candidates) => {
                tracing::warn!("{} records in site {} hold {}", candidates.len(), site, url);
                notes.action = Some(ExternalLinkAction::Ambiguous);
                return Ok(Replacement::unchanged(found).with_notes(notes));
            }
            Lookup::NotFound => {
                let earlier = scope
                    .find_derived(|r| {
                        &r.website == site && r.metadata_str("external_url") == Some(url)
                    })
                    .map(|r| r.text_id.to_string());
                match earlier {
                    Some(id) => (id, ExternalLinkAction::Reused),
                    None => {
                        let title = match link.text.trim() {
                            "" => url,
                            text => text,
                        };
                        let warning = self.license_warning(&host);
                        let derived = self.derive(site, url, title, warning);
                        let id = derived.text_id.to_string();
                        notes.title = Some(title.to_string());
                        notes.license_warning = Some(warning);

                        if self.options.commit {
                            tracing::debug!("Deriving {} for {}", id, url);
                            scope.stage(derived);
                            (id, ExternalLinkAction::Created)
                        } else {
                            (id, ExternalLinkAction::Previewed)
                        }
                    }
                }
            }
        };

        notes.action = Some(action);
        notes.target_id = Some(target_id.clone());
        let markup = ResourceLink::new(&target_id, link.text.as_str())?.to_markup();
        Ok(Replacement::new(markup).with_notes(notes))
    }
}
