//! Audit trail: one CSV row per match attempt.

use relink_types::RecordId;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Leading columns of every audit file
pub const BASE_COLUMNS: [&str; 4] = ["original_text", "replacement", "record_id", "record_url"];

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize notes: {0}")]
    Notes(#[from] serde_json::Error),

    #[error("Notes must serialize to a map of named fields")]
    NotesNotAnObject,
}

/// Editing URL of a record: `{studio}/sites/{site}/type/{category}/edit/{id}/`
pub fn record_url(studio_url: &str, site_name: &str, category: &str, id: &RecordId) -> String {
    format!(
        "{}/sites/{}/type/{}/edit/{}/",
        studio_url.trim_end_matches('/'),
        site_name,
        category,
        id
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow<N> {
    pub original_text: String,
    pub replacement: String,
    pub record_id: RecordId,
    pub record_url: String,
    pub notes: Option<N>,
}

/// Note column names of `N`, in field declaration order
pub fn note_columns<N: Serialize + Default>() -> Result<Vec<String>, AuditError> {
    match serde_json::to_value(N::default())? {
        Value::Object(map) => Ok(map.keys().cloned().collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(AuditError::NotesNotAnObject),
    }
}

/// Render a note value as a single CSV cell
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Writes audit rows for one rule
pub struct AuditWriter<W: Write> {
    writer: csv::Writer<W>,
    note_columns: Vec<String>,
    rows: usize,
}

impl AuditWriter<File> {
    /// Create (or truncate) an audit file, creating parent directories
    pub fn create<N: Serialize + Default>(path: &Path) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::from_writer::<N>(File::create(path)?)
    }
}

impl<W: Write> AuditWriter<W> {
    /// Wrap a writer and emit the header row
    pub fn from_writer<N: Serialize + Default>(inner: W) -> Result<Self, AuditError> {
        let note_columns = note_columns::<N>()?;
        let mut writer = csv::Writer::from_writer(inner);
        let header: Vec<&str> = BASE_COLUMNS
            .iter()
            .copied()
            .chain(note_columns.iter().map(String::as_str))
            .collect();
        writer.write_record(&header)?;

        Ok(Self {
            writer,
            note_columns,
            rows: 0,
        })
    }

    pub fn write_row<N: Serialize>(&mut self, row: &AuditRow<N>) -> Result<(), AuditError> {
        let notes = match &row.notes {
            Some(notes) => serde_json::to_value(notes)?,
            None => Value::Null,
        };

        let mut record = vec![
            row.original_text.clone(),
            row.replacement.clone(),
            row.record_id.to_string(),
            row.record_url.clone(),
        ];
        record.extend(self.note_columns.iter().map(|column| cell(notes.get(column))));
        self.writer.write_record(&record)?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_all<'r, N: Serialize + 'r>(
        &mut self,
        rows: impl IntoIterator<Item = &'r AuditRow<N>>,
    ) -> Result<(), AuditError> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Flush and return the number of data rows written
    pub fn finish(mut self) -> Result<usize, AuditError> {
        self.writer.flush()?;
        Ok(self.rows)
    }

    /// Flush and hand back the inner writer
    pub fn into_inner(self) -> Result<W, AuditError> {
        self.writer
            .into_inner()
            .map_err(|e| AuditError::Io(e.into_error()))
    }
}
