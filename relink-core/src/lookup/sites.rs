//! Map root-relative URLs to the site they point into.

use crate::models::Site;
use crate::snapshot::CorpusSnapshot;
use std::collections::HashMap;

#[derive(Debug)]
pub struct SiteResolver<'s> {
    by_name: HashMap<&'s str, &'s Site>,
}

impl<'s> SiteResolver<'s> {
    pub fn build(snapshot: &'s CorpusSnapshot) -> Self {
        let by_name = snapshot
            .sites()
            .iter()
            .map(|site| (site.name.as_str(), site))
            .collect();
        Self { by_name }
    }

    /// Split a URL into the site it addresses and the path within that site
    ///
    /// Scheme and host are dropped. The first path segment naming a known
    /// site selects it; the returned path starts with `/` and keeps the
    /// original query and fragment.
    pub fn relativize(&self, url: &str) -> Option<(&'s Site, String)> {
        let (path, suffix) = split_url(url);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        segments.iter().enumerate().find_map(|(idx, segment)| {
            let site = self.by_name.get(segment)?;
            let rest = segments[idx + 1..].join("/");
            Some((*site, format!("/{rest}{suffix}")))
        })
    }
}

/// (path, query-and-fragment suffix) of an absolute or root-relative URL
fn split_url(url: &str) -> (String, String) {
    if let Ok(parsed) = url::Url::parse(url) {
        if parsed.has_host() {
            let mut suffix = String::new();
            if let Some(query) = parsed.query() {
                suffix.push('?');
                suffix.push_str(query);
            }
            if let Some(fragment) = parsed.fragment() {
                suffix.push('#');
                suffix.push_str(fragment);
            }
            return (parsed.path().to_string(), suffix);
        }
    }

    // Protocol-relative `//host/path`
    let url = match url.strip_prefix("//") {
        Some(rest) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or(""),
        None => url,
    };
    match url.find(['?', '#']) {
        Some(idx) => (url[..idx].to_string(), url[idx..].to_string()),
        None => (url.to_string(), String::new()),
    }
}
