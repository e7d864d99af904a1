//! Read-only indices over a corpus snapshot.
//!
//! Every index is built once from the snapshot and then only read. Lookups
//! answer with a three-way [`Lookup`] so rules can tell "nothing matched"
//! apart from "several things matched".

pub mod categories;
pub mod identity;
pub mod legacy;
pub mod paths;
pub mod sites;

use crate::config::Limits;
use crate::models::{ContentRecord, Site};
use crate::snapshot::CorpusSnapshot;
use relink_types::SiteId;
use serde::Serialize;

pub use categories::CategoryIndex;
pub use identity::IdentityIndex;
pub use legacy::LegacyFileIndex;
pub use paths::PathIndex;
pub use sites::SiteResolver;

/// Result of a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// More than one candidate; callers must not pick one
    Ambiguous(Vec<T>),
}

impl<T> Lookup<T> {
    pub fn from_candidates(mut candidates: Vec<T>) -> Self {
        match candidates.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(candidates.remove(0)),
            _ => Lookup::Ambiguous(candidates),
        }
    }

    pub fn outcome(&self) -> LookupOutcome {
        match self {
            Lookup::Found(_) => LookupOutcome::Found,
            Lookup::NotFound => LookupOutcome::NotFound,
            Lookup::Ambiguous(_) => LookupOutcome::Ambiguous,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Ambiguous(values) => Lookup::Ambiguous(values.into_iter().map(f).collect()),
        }
    }
}

impl<'s> Lookup<&'s ContentRecord> {
    /// Identifiers of every candidate, for audit notes
    pub fn candidate_ids(&self) -> Vec<String> {
        match self {
            Lookup::Found(record) => vec![record.text_id.to_string()],
            Lookup::NotFound => Vec::new(),
            Lookup::Ambiguous(records) => records.iter().map(|r| r.text_id.to_string()).collect(),
        }
    }
}

/// Serializable label of a lookup result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    Found,
    NotFound,
    Ambiguous,
}

/// All indices of one run
#[derive(Debug)]
pub struct Indices<'s> {
    snapshot: &'s CorpusSnapshot,
    limits: Limits,
    pub paths: PathIndex<'s>,
    pub legacy: LegacyFileIndex<'s>,
    pub sites: SiteResolver<'s>,
    pub categories: CategoryIndex,
    pub identity: IdentityIndex<'s>,
}

impl<'s> Indices<'s> {
    pub fn build(snapshot: &'s CorpusSnapshot, limits: Limits, content_root: &str) -> Self {
        let indices = Self {
            snapshot,
            limits,
            paths: PathIndex::build(snapshot, limits, content_root),
            legacy: LegacyFileIndex::build(snapshot, limits.legacy_prefix_len),
            sites: SiteResolver::build(snapshot),
            categories: CategoryIndex::build(snapshot, content_root),
            identity: IdentityIndex::build(snapshot),
        };
        tracing::debug!(
            "Built lookup indices over {} records",
            snapshot.records().len()
        );
        indices
    }

    pub fn snapshot(&self) -> &'s CorpusSnapshot {
        self.snapshot
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn site(&self, id: &SiteId) -> Option<&'s Site> {
        self.snapshot.site(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_candidates() {
        assert_eq!(Lookup::<u8>::from_candidates(vec![]), Lookup::NotFound);
        assert_eq!(Lookup::from_candidates(vec![1]), Lookup::Found(1));
        assert_eq!(
            Lookup::from_candidates(vec![1, 2]),
            Lookup::Ambiguous(vec![1, 2])
        );
    }

    #[test]
    fn test_outcome_labels() {
        let label = |l: Lookup<u8>| serde_json::to_value(l.outcome()).unwrap();
        assert_eq!(label(Lookup::Found(1)), "found");
        assert_eq!(label(Lookup::NotFound), "not_found");
        assert_eq!(label(Lookup::Ambiguous(vec![1, 2])), "ambiguous");
    }

    #[test]
    fn test_map_keeps_shape() {
        assert_eq!(Lookup::Found(2).map(|x| x * 2), Lookup::Found(4));
        assert_eq!(
            Lookup::Ambiguous(vec![1, 2]).map(|x| x + 1),
            Lookup::Ambiguous(vec![2, 3])
        );
        assert!(Lookup::<u8>::NotFound.map(|x| x).found().is_none());
    }
}
