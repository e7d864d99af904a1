//! Lookup by the file name an upload had before migration.
//!
//! Uploads were stored as `<random prefix><original name>`; stripping the
//! fixed-length prefix from the stored basename recovers the name legacy
//! content still links to.

use super::Lookup;
use crate::models::ContentRecord;
use crate::snapshot::CorpusSnapshot;
use relink_types::SiteId;
use std::collections::HashMap;

/// Original file name of a stored asset path, if it is longer than the prefix
pub fn legacy_filename(file: &str, prefix_len: usize) -> Option<String> {
    let basename = file.rsplit('/').next().unwrap_or(file);
    let name: String = basename.chars().skip(prefix_len).collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[derive(Debug)]
pub struct LegacyFileIndex<'s> {
    records: &'s [ContentRecord],
    by_name: HashMap<(SiteId, String), Vec<usize>>,
}

impl<'s> LegacyFileIndex<'s> {
    pub fn build(snapshot: &'s CorpusSnapshot, prefix_len: usize) -> Self {
        let mut by_name: HashMap<(SiteId, String), Vec<usize>> = HashMap::new();
        for (idx, record) in snapshot.records().iter().enumerate() {
            let Some(name) = record
                .file
                .as_deref()
                .and_then(|file| legacy_filename(file, prefix_len))
            else {
                continue;
            };
            by_name
                .entry((record.website.clone(), name))
                .or_default()
                .push(idx);
        }

        Self {
            records: snapshot.records(),
            by_name,
        }
    }

    pub fn lookup(&self, site: &SiteId, filename: &str) -> Lookup<&'s ContentRecord> {
        let candidates = self
            .by_name
            .get(&(site.clone(), filename.to_string()))
            .map(|ids| ids.iter().map(|idx| &self.records[*idx]).collect())
            .unwrap_or_default();
        Lookup::from_candidates(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupOutcome;
    use crate::models::Site;

    const PREFIX: &str = "0123456789abcdef0123456789abcdef_";

    #[test]
    fn test_legacy_filename() {
        assert_eq!(
            legacy_filename(&format!("courses/x/{PREFIX}cat.jpg"), 33),
            Some("cat.jpg".to_string())
        );
        assert_eq!(legacy_filename("short.jpg", 33), None);
    }

    #[test]
    fn test_outcomes() {
        let snapshot = CorpusSnapshot::new(
            vec![Site::new("s", "site"), Site::new("t", "other")],
            vec![
                ContentRecord::new("one", "s", "resource").with_file(format!("s/{PREFIX}cat.jpg")),
                ContentRecord::new("dup1", "s", "resource")
                    .with_file(format!("s/{}dog.jpg", "f".repeat(32) + "_")),
                ContentRecord::new("dup2", "s", "resource")
                    .with_file(format!("s/{}dog.jpg", "e".repeat(32) + "_")),
                ContentRecord::new("elsewhere", "t", "resource")
                    .with_file(format!("t/{PREFIX}cat.jpg")),
            ],
        )
        .unwrap();
        let index = LegacyFileIndex::build(&snapshot, 33);
        let site = SiteId::new("s");

        assert_eq!(
            index.lookup(&site, "cat.jpg").found().unwrap().text_id.as_str(),
            "one"
        );
        assert_eq!(index.lookup(&site, "bird.jpg").outcome(), LookupOutcome::NotFound);
        let dog = index.lookup(&site, "dog.jpg");
        assert_eq!(dog.outcome(), LookupOutcome::Ambiguous);
        assert_eq!(dog.candidate_ids(), vec!["dup1", "dup2"]);
        assert_eq!(
            index
                .lookup(&SiteId::new("t"), "cat.jpg")
                .found()
                .unwrap()
                .text_id
                .as_str(),
            "elsewhere"
        );
    }
}
