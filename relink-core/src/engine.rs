//! The rewrite engine: applies one rule across the records of a snapshot.
//!
//! Records are rewritten all-or-nothing. Every field of a record is
//! processed against the original value before anything is applied, so a
//! fatal error part way through leaves the record, its audit rows and any
//! records derived from it out of the result.

use crate::audit::{record_url, AuditRow};
use crate::checksum::refresh_checksum;
use crate::models::{ContentRecord, Field};
use crate::rules::{Matcher, RewriteScope, Rule, RuleError};
use crate::snapshot::CorpusSnapshot;
use chrono::{DateTime, Utc};
use relink_types::RecordId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Rule {alias} failed on record {record}: {source}")]
    Record {
        alias: String,
        record: RecordId,
        #[source]
        source: RuleError,
    },
}

/// A record whose fields were rewritten
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedRecord {
    pub record: ContentRecord,
    /// The recomputed checksum no longer equals the last synced one
    pub sync_divergence: bool,
    pub fields: Vec<Field>,
}

/// A record skipped because of a fatal error (only with `stop_on_error` off)
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub record_id: RecordId,
    pub error: RuleError,
}

#[derive(Debug, Clone)]
pub struct RunOutcome<N> {
    pub alias: &'static str,
    pub changed: Vec<ChangedRecord>,
    pub audit: Vec<AuditRow<N>>,
    /// New records created by the rule
    pub derived: Vec<ContentRecord>,
    pub failures: Vec<RecordFailure>,
    /// Records looked at, including failed ones
    pub scanned: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl<N> RunOutcome<N> {
    /// Changed and derived records, ready to be persisted
    pub fn records_to_write(&self) -> Vec<ContentRecord> {
        self.changed
            .iter()
            .map(|c| c.record.clone())
            .chain(self.derived.iter().cloned())
            .collect()
    }

    pub fn diverged(&self) -> usize {
        self.changed.iter().filter(|c| c.sync_divergence).count()
    }
}

struct RecordResult<N> {
    changed: Option<ChangedRecord>,
    rows: Vec<AuditRow<N>>,
    derived: Vec<ContentRecord>,
}

#[derive(Debug, Clone)]
pub struct RewriteEngine {
    stop_on_error: bool,
    studio_url: String,
    cancel: Arc<AtomicBool>,
}

impl RewriteEngine {
    pub fn new(studio_url: impl Into<String>) -> Self {
        Self {
            stop_on_error: true,
            studio_url: studio_url.into(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Handle to this engine's cancel flag; setting it stops a run at the next record boundary
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run `rule` over every record of the snapshot, in snapshot order
    pub fn run<R: Rule>(
        &self,
        rule: &R,
        snapshot: &CorpusSnapshot,
    ) -> Result<RunOutcome<R::Notes>, EngineError> {
        let started_at = Utc::now();
        tracing::info!(
            "Running rule {} over {} records",
            rule.alias(),
            snapshot.records().len()
        );

        let mut outcome = RunOutcome {
            alias: rule.alias(),
            changed: Vec::new(),
            audit: Vec::new(),
            derived: Vec::new(),
            failures: Vec::new(),
            scanned: 0,
            cancelled: false,
            started_at,
            finished_at: started_at,
        };

        for record in snapshot.records() {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!(
                    "Run of {} cancelled after {} records",
                    rule.alias(),
                    outcome.scanned
                );
                outcome.cancelled = true;
                break;
            }
            outcome.scanned += 1;

            match self.process_record(rule, snapshot, record, &outcome.derived) {
                Ok(result) => {
                    if let Some(changed) = result.changed {
                        outcome.changed.push(changed);
                    }
                    outcome.audit.extend(result.rows);
                    outcome.derived.extend(result.derived);
                }
                Err(error) => {
                    tracing::error!("Record {} failed: {}", record.text_id, error);
                    if self.stop_on_error {
                        return Err(EngineError::Record {
                            alias: rule.alias().to_string(),
                            record: record.text_id.clone(),
                            source: error,
                        });
                    }
                    outcome.failures.push(RecordFailure {
                        record_id: record.text_id.clone(),
                        error,
                    });
                }
            }
        }

        outcome.finished_at = Utc::now();
        tracing::info!(
            "Rule {}: {} records scanned, {} changed, {} derived, {} failed",
            rule.alias(),
            outcome.scanned,
            outcome.changed.len(),
            outcome.derived.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }

    fn process_record<R: Rule>(
        &self,
        rule: &R,
        snapshot: &CorpusSnapshot,
        record: &ContentRecord,
        earlier: &[ContentRecord],
    ) -> Result<RecordResult<R::Notes>, RuleError> {
        let url = match snapshot.site(&record.website) {
            Some(site) => {
                record_url(&self.studio_url, &site.name, &record.category, &record.text_id)
            }
            None => String::new(),
        };
        let mut scope = RewriteScope::new(earlier);
        let mut rows = Vec::new();
        let mut updates: Vec<(Field, String)> = Vec::new();

        for field in rule.fields() {
            let Some(text) = record.field_text(field) else {
                continue;
            };
            if text.is_empty() || !rule.prefilter(text) {
                continue;
            }

            let mut rewritten = String::with_capacity(text.len());
            let mut last = 0;
            for found in rule.matcher().find(text)? {
                if !rule.accepts(&found) {
                    continue;
                }
                let replacement = rule.replace(&found, record, &mut scope)?;
                rewritten.push_str(&text[last..found.span.start]);
                rewritten.push_str(&replacement.text);
                last = found.span.end;

                rows.push(AuditRow {
                    original_text: found.original,
                    replacement: replacement.text,
                    record_id: record.text_id.clone(),
                    record_url: url.clone(),
                    notes: replacement.notes,
                });
            }
            rewritten.push_str(&text[last..]);

            if rewritten != text {
                updates.push((field.clone(), rewritten));
            }
        }

        let changed = if updates.is_empty() {
            tracing::debug!("Record {} unchanged", record.text_id);
            None
        } else {
            let mut updated = record.clone();
            let mut fields = Vec::with_capacity(updates.len());
            for (field, text) in updates {
                updated.set_field_text(&field, text)?;
                fields.push(field);
            }
            let sync_divergence = refresh_checksum(&mut updated);
            Some(ChangedRecord {
                record: updated,
                sync_divergence,
                fields,
            })
        };

        Ok(RecordResult {
            changed,
            rows,
            derived: scope.into_staged(),
        })
    }
}
