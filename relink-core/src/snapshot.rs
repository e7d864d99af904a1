//! The immutable corpus snapshot a run works from.
//!
//! A snapshot directory holds `sites.yml` and a `content/` tree with one
//! record per `.yml`/`.yaml`/`.json` file. It is loaded once; rules and
//! indices only ever see it by shared reference.

use crate::models::{ContentRecord, Site};
use relink_types::{RecordId, SiteId};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const SITES_FILE: &str = "sites.yml";
pub const CONTENT_DIR: &str = "content";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize record {0}: {1}")]
    Serialize(RecordId, String),

    #[error("Duplicate site id: {0}")]
    DuplicateSite(SiteId),

    #[error("Duplicate record id: {0}")]
    DuplicateRecord(RecordId),

    #[error("Record {record} belongs to unknown site {site}")]
    UnknownSite { record: RecordId, site: SiteId },

    #[error("Snapshot was not loaded from disk; nowhere to write records")]
    NoRoot,
}

/// All sites and records of one run
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    sites: Vec<Site>,
    records: Vec<ContentRecord>,
    site_index: HashMap<SiteId, usize>,
    root: Option<PathBuf>,
}

impl CorpusSnapshot {
    /// Build a snapshot from values already in memory
    pub fn new(sites: Vec<Site>, records: Vec<ContentRecord>) -> Result<Self, SnapshotError> {
        let mut site_index = HashMap::new();
        for (idx, site) in sites.iter().enumerate() {
            if site_index.insert(site.id.clone(), idx).is_some() {
                return Err(SnapshotError::DuplicateSite(site.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(&record.text_id) {
                return Err(SnapshotError::DuplicateRecord(record.text_id.clone()));
            }
            if !site_index.contains_key(&record.website) {
                return Err(SnapshotError::UnknownSite {
                    record: record.text_id.clone(),
                    site: record.website.clone(),
                });
            }
        }

        Ok(Self {
            sites,
            records,
            site_index,
            root: None,
        })
    }

    /// Load a snapshot directory
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, SnapshotError> {
        let dir = dir.as_ref();
        let sites_path = dir.join(SITES_FILE);
        let sites: Vec<Site> = parse_file(&sites_path, &fs::read_to_string(&sites_path)?)?;

        let content_dir = dir.join(CONTENT_DIR);
        let mut records = Vec::new();
        if content_dir.is_dir() {
            for entry in WalkDir::new(&content_dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if !is_record_file(entry.path()) {
                    tracing::debug!("Skipping non-record file {:?}", entry.path());
                    continue;
                }
                let contents = fs::read_to_string(entry.path())?;
                let mut record: ContentRecord = parse_file(entry.path(), &contents)?;
                record.source_path = Some(entry.path().to_path_buf());
                records.push(record);
            }
        } else {
            tracing::warn!("Snapshot {:?} has no {} directory", dir, CONTENT_DIR);
        }

        tracing::info!(
            "Loaded snapshot with {} sites and {} records",
            sites.len(),
            records.len()
        );

        let mut snapshot = Self::new(sites, records)?;
        snapshot.root = Some(dir.to_path_buf());
        Ok(snapshot)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    pub fn site(&self, id: &SiteId) -> Option<&Site> {
        self.site_index.get(id).map(|idx| &self.sites[*idx])
    }

    pub fn site_by_name(&self, name: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.name == name)
    }

    /// Write records back to disk, each over the file it was loaded from
    ///
    /// Records that were never on disk are written to
    /// `content/<site name>/<text_id>.yml`. Returns the written paths.
    pub fn persist(&self, records: &[ContentRecord]) -> Result<Vec<PathBuf>, SnapshotError> {
        let root = self.root.as_ref().ok_or(SnapshotError::NoRoot)?;
        let mut written = Vec::with_capacity(records.len());

        for record in records {
            let path = match record.source_path() {
                Some(path) => path.to_path_buf(),
                None => {
                    let site = self.site(&record.website).ok_or_else(|| SnapshotError::UnknownSite {
                        record: record.text_id.clone(),
                        site: record.website.clone(),
                    })?;
                    root.join(CONTENT_DIR)
                        .join(&site.name)
                        .join(format!("{}.yml", record.text_id))
                }
            };

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, serialize_record(record, &path)?)?;
            tracing::debug!("Wrote record {} to {:?}", record.text_id, path);
            written.push(path);
        }

        Ok(written)
    }
}

fn is_record_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml" | "yaml" | "json")
    )
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn parse_file<T: serde::de::DeserializeOwned>(
    path: &Path,
    contents: &str,
) -> Result<T, SnapshotError> {
    let parsed = if is_json(path) {
        serde_json::from_str(contents).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(contents).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| SnapshotError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn serialize_record(record: &ContentRecord, path: &Path) -> Result<String, SnapshotError> {
    let serialized = if is_json(path) {
        serde_json::to_string_pretty(record)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| e.to_string())
    } else {
        serde_yaml::to_string(record).map_err(|e| e.to_string())
    };
    serialized.map_err(|message| SnapshotError::Serialize(record.text_id.clone(), message))
}
