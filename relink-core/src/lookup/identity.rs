//! Lookups by identity: permanent id, title, legacy uid and external URL.

use super::Lookup;
use crate::models::ContentRecord;
use crate::snapshot::CorpusSnapshot;
use relink_types::SiteId;
use std::collections::HashMap;

/// Canonical spelling of an identifier: hyphenated lowercase for UUIDs
pub fn normalize_id(id: &str) -> String {
    let id = id.trim();
    match uuid::Uuid::parse_str(id) {
        Ok(parsed) => parsed.hyphenated().to_string(),
        Err(_) => id.to_string(),
    }
}

type SiteKey = (SiteId, String);

#[derive(Debug)]
pub struct IdentityIndex<'s> {
    records: &'s [ContentRecord],
    by_id: HashMap<String, usize>,
    by_title: HashMap<SiteKey, Vec<usize>>,
    by_legacy_uid: HashMap<SiteKey, Vec<usize>>,
    by_external_url: HashMap<SiteKey, Vec<usize>>,
}

impl<'s> IdentityIndex<'s> {
    pub fn build(snapshot: &'s CorpusSnapshot) -> Self {
        let mut index = Self {
            records: snapshot.records(),
            by_id: HashMap::new(),
            by_title: HashMap::new(),
            by_legacy_uid: HashMap::new(),
            by_external_url: HashMap::new(),
        };

        for (idx, record) in snapshot.records().iter().enumerate() {
            index.by_id.insert(normalize_id(record.text_id.as_str()), idx);

            let site = &record.website;
            if let Some(title) = record.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                push(&mut index.by_title, site, title.to_string(), idx);
            }
            if let Some(uid) = record.metadata_str("legacy_uid") {
                push(&mut index.by_legacy_uid, site, uid.trim().to_lowercase(), idx);
            }
            if let Some(url) = record.metadata_str("external_url") {
                push(&mut index.by_external_url, site, url.trim().to_string(), idx);
            }
        }

        index
    }

    pub fn by_id(&self, id: &str) -> Lookup<&'s ContentRecord> {
        match self.by_id.get(&normalize_id(id)) {
            Some(idx) => Lookup::Found(&self.records[*idx]),
            None => Lookup::NotFound,
        }
    }

    pub fn by_title(&self, site: &SiteId, title: &str) -> Lookup<&'s ContentRecord> {
        self.get(&self.by_title, site, title.trim().to_string())
    }

    pub fn by_legacy_uid(&self, site: &SiteId, uid: &str) -> Lookup<&'s ContentRecord> {
        self.get(&self.by_legacy_uid, site, uid.trim().to_lowercase())
    }

    pub fn by_external_url(&self, site: &SiteId, url: &str) -> Lookup<&'s ContentRecord> {
        self.get(&self.by_external_url, site, url.trim().to_string())
    }

    fn get(
        &self,
        map: &HashMap<SiteKey, Vec<usize>>,
        site: &SiteId,
        key: String,
    ) -> Lookup<&'s ContentRecord> {
        let candidates = map
            .get(&(site.clone(), key))
            .map(|ids| ids.iter().map(|idx| &self.records[*idx]).collect())
            .unwrap_or_default();
        Lookup::from_candidates(candidates)
    }
}

fn push(map: &mut HashMap<SiteKey, Vec<usize>>, site: &SiteId, key: String, idx: usize) {
    map.entry((site.clone(), key)).or_default().push(idx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupOutcome;
    use crate::models::Site;
    use serde_json::json;

    const U1: &str = "5f1a3c9e-2b7d-4e8f-9a0b-1c2d3e4f5a6b";

    fn snapshot() -> CorpusSnapshot {
        CorpusSnapshot::new(
            vec![Site::new("s", "one"), Site::new("t", "two")],
            vec![
                ContentRecord::new(U1, "s", "page")
                    .with_title("Syllabus")
                    .with_metadata(json!({ "legacy_uid": "ABCDEF0123456789ABCDEF0123456789" })),
                ContentRecord::new("p2", "s", "page").with_title("Lecture 1"),
                ContentRecord::new("p3", "s", "page").with_title("Lecture 1"),
                ContentRecord::new("x1", "t", "external-resource")
                    .with_title("Syllabus")
                    .with_metadata(json!({ "external_url": "https://example.com/a" })),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_by_id_normalizes_uuid_spelling() {
        let snapshot = snapshot();
        let index = IdentityIndex::build(&snapshot);

        let undashed = U1.replace('-', "").to_uppercase();
        assert!(index.by_id(&undashed).is_found());
        assert!(index.by_id(U1).is_found());
        assert_eq!(index.by_id("nope").outcome(), LookupOutcome::NotFound);
    }

    #[test]
    fn test_title_lookup_is_site_scoped() {
        let snapshot = snapshot();
        let index = IdentityIndex::build(&snapshot);

        let found = index.by_title(&SiteId::new("s"), " Syllabus ");
        assert_eq!(found.found().unwrap().text_id.as_str(), U1);
        let found = index.by_title(&SiteId::new("t"), "Syllabus");
        assert_eq!(found.found().unwrap().text_id.as_str(), "x1");
        assert_eq!(
            index.by_title(&SiteId::new("s"), "Lecture 1").outcome(),
            LookupOutcome::Ambiguous
        );
    }

    #[test]
    fn test_legacy_uid_and_external_url() {
        let snapshot = snapshot();
        let index = IdentityIndex::build(&snapshot);

        assert!(index
            .by_legacy_uid(&SiteId::new("s"), "abcdef0123456789abcdef0123456789")
            .is_found());
        assert!(!index
            .by_legacy_uid(&SiteId::new("t"), "abcdef0123456789abcdef0123456789")
            .is_found());
        assert!(index
            .by_external_url(&SiteId::new("t"), "https://example.com/a")
            .is_found());
    }
}
