//! Exact path lookup: (site, dirpath, filename) → record.

use super::Lookup;
use crate::config::Limits;
use crate::models::ContentRecord;
use crate::snapshot::CorpusSnapshot;
use relink_types::SiteId;
use std::collections::HashMap;

/// Normalize a directory path the way the storage layer derives it
///
/// Doubled slashes collapse, surrounding slashes are trimmed and the result
/// is cut to `max_len` characters.
pub fn normalize_dirpath(path: &str, max_len: usize) -> String {
    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    joined.chars().take(max_len).collect()
}

/// Normalize a file name: periods become hyphens, cut to `max_len` characters
pub fn normalize_filename(name: &str, max_len: usize) -> String {
    name.trim()
        .replace('.', "-")
        .chars()
        .take(max_len)
        .collect()
}

type PathKey = (SiteId, String, String);

#[derive(Debug)]
pub struct PathIndex<'s> {
    records: &'s [ContentRecord],
    by_path: HashMap<PathKey, Vec<usize>>,
    by_filename: HashMap<(SiteId, String), Vec<usize>>,
    limits: Limits,
    content_root: String,
}

impl<'s> PathIndex<'s> {
    pub fn build(snapshot: &'s CorpusSnapshot, limits: Limits, content_root: &str) -> Self {
        let mut by_path: HashMap<PathKey, Vec<usize>> = HashMap::new();
        let mut by_filename: HashMap<(SiteId, String), Vec<usize>> = HashMap::new();

        for (idx, record) in snapshot.records().iter().enumerate() {
            let (Some(dirpath), Some(filename)) = (&record.dirpath, &record.filename) else {
                continue;
            };
            let dirpath = normalize_dirpath(dirpath, limits.dirpath_max_len);
            let filename = normalize_filename(filename, limits.filename_max_len);
            if filename.is_empty() {
                continue;
            }
            by_filename
                .entry((record.website.clone(), filename.clone()))
                .or_default()
                .push(idx);
            by_path
                .entry((record.website.clone(), dirpath, filename))
                .or_default()
                .push(idx);
        }

        Self {
            records: snapshot.records(),
            by_path,
            by_filename,
            limits,
            content_root: normalize_dirpath(content_root, limits.dirpath_max_len),
        }
    }

    pub fn content_root(&self) -> &str {
        &self.content_root
    }

    /// Record stored at exactly this location within `site`
    pub fn lookup(
        &self,
        site: &SiteId,
        dirpath: &str,
        filename: &str,
    ) -> Lookup<&'s ContentRecord> {
        let key = (
            site.clone(),
            normalize_dirpath(dirpath, self.limits.dirpath_max_len),
            normalize_filename(filename, self.limits.filename_max_len),
        );
        self.resolve(self.by_path.get(&key))
    }

    /// Record published at a site-relative URL path such as `/resources/cat`
    ///
    /// Query strings, fragments and trailing slashes are ignored.
    pub fn lookup_url(&self, site: &SiteId, url_path: &str) -> Lookup<&'s ContentRecord> {
        match self.url_to_location(url_path) {
            Some((dirpath, filename)) => self.lookup(site, &dirpath, &filename),
            None => Lookup::NotFound,
        }
    }

    /// (dirpath, filename) a site-relative URL path maps to
    pub fn url_to_location(&self, url_path: &str) -> Option<(String, String)> {
        let path = url_path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_matches('/');
        if path.is_empty() {
            return None;
        }

        Some(match path.rsplit_once('/') {
            Some((parent, name)) => (format!("{}/{}", self.content_root, parent), name.to_string()),
            None => (self.content_root.clone(), path.to_string()),
        })
    }

    /// Every record of `site` with this file name, in any folder
    pub fn by_filename(&self, site: &SiteId, filename: &str) -> Vec<&'s ContentRecord> {
        let key = (
            site.clone(),
            normalize_filename(filename, self.limits.filename_max_len),
        );
        self.by_filename
            .get(&key)
            .map(|ids| ids.iter().map(|idx| &self.records[*idx]).collect())
            .unwrap_or_default()
    }

    fn resolve(&self, ids: Option<&Vec<usize>>) -> Lookup<&'s ContentRecord> {
        let candidates = ids
            .map(|ids| ids.iter().map(|idx| &self.records[*idx]).collect())
            .unwrap_or_default();
        Lookup::from_candidates(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Site;

    fn snapshot() -> CorpusSnapshot {
        CorpusSnapshot::new(
            vec![Site::new("a", "site-a"), Site::new("b", "site-b")],
            vec![
                ContentRecord::new("ra", "a", "resource").at("content/resources", "cat"),
                ContentRecord::new("rb", "b", "resource").at("content/resources", "cat"),
                ContentRecord::new("pdf", "a", "resource").at("/content//resources/", "notes.pdf"),
                ContentRecord::new("page", "a", "page").at("content/pages", "cat"),
                ContentRecord::new("top", "a", "page").at("content", "syllabus"),
                ContentRecord::new("nowhere", "a", "page"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_site_isolation() {
        let snapshot = snapshot();
        let index = PathIndex::build(&snapshot, Limits::default(), "content");

        let a = index.lookup(&SiteId::new("a"), "content/resources", "cat");
        let b = index.lookup(&SiteId::new("b"), "content/resources", "cat");
        assert_eq!(a.found().unwrap().text_id.as_str(), "ra");
        assert_eq!(b.found().unwrap().text_id.as_str(), "rb");
    }

    #[test]
    fn test_normalization_matches_both_sides() {
        let snapshot = snapshot();
        let index = PathIndex::build(&snapshot, Limits::default(), "content");

        let found = index.lookup(&SiteId::new("a"), "content/resources", "notes-pdf");
        assert_eq!(found.found().unwrap().text_id.as_str(), "pdf");
        let found = index.lookup_url(&SiteId::new("a"), "/resources/notes.pdf/");
        assert_eq!(found.found().unwrap().text_id.as_str(), "pdf");
    }

    #[test]
    fn test_lookup_url() {
        let snapshot = snapshot();
        let index = PathIndex::build(&snapshot, Limits::default(), "content");
        let site = SiteId::new("a");

        let found = index.lookup_url(&site, "/resources/cat?x=1#top");
        assert_eq!(found.found().unwrap().text_id.as_str(), "ra");
        let top = index.lookup_url(&site, "/syllabus");
        assert_eq!(top.found().unwrap().text_id.as_str(), "top");
        assert_eq!(index.lookup_url(&site, "/"), Lookup::NotFound);
        assert_eq!(index.lookup_url(&site, "/resources/dog"), Lookup::NotFound);
    }

    #[test]
    fn test_by_filename_spans_folders() {
        let snapshot = snapshot();
        let index = PathIndex::build(&snapshot, Limits::default(), "content");
        let ids: Vec<_> = index
            .by_filename(&SiteId::new("a"), "cat")
            .iter()
            .map(|r| r.text_id.as_str())
            .collect();
        assert_eq!(ids, vec!["ra", "page"]);
    }

    #[test]
    fn test_truncation_limits() {
        assert_eq!(normalize_filename("abcdef", 3), "abc");
        assert_eq!(normalize_dirpath("//a//bc/", 3), "a/b");
        assert_eq!(normalize_filename("ü.ü", 2), "ü-");
    }
}
