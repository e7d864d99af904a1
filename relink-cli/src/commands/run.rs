//! Run one catalog rule over the configured snapshot.

use crate::output::print_json;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use relink_core::catalog::{
    BaseUrlRule, ExternalLinkRule, LegacyFileRule, ResolveUidRule, RootRelativeRule,
    ShortcodeQuoteRule, UnresolvedLinkRule,
};
use relink_core::{AuditWriter, Config, CorpusSnapshot, Indices, RewriteEngine, Rule, RuleKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub struct RunOptions {
    pub commit: bool,
    pub audit: Option<PathBuf>,
    pub keep_going: bool,
    pub json: bool,
}

#[derive(Serialize)]
struct FailureSummary {
    record_id: String,
    error: String,
}

#[derive(Serialize)]
struct RunSummary {
    rule: &'static str,
    scanned: usize,
    changed: usize,
    diverged: usize,
    derived: usize,
    failed: usize,
    audit_rows: usize,
    audit_path: PathBuf,
    committed: bool,
    written: usize,
    cancelled: bool,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    failures: Vec<FailureSummary>,
}

/// Run the rule named `alias`, write its audit file and, when committing, the records
pub fn run_rule(config_path: &Path, alias: &str, options: RunOptions) -> Result<()> {
    let kind: RuleKind = alias.parse().map_err(anyhow::Error::msg)?;
    let mut config = Config::from_file(config_path).context("Failed to load configuration")?;
    if options.commit {
        config.rules.set_commit(kind, true);
    }

    let snapshot_dir = config.snapshot_dir();
    let snapshot = CorpusSnapshot::load(&snapshot_dir)
        .with_context(|| format!("Failed to load snapshot from {:?}", snapshot_dir))?;
    let indices = Indices::build(&snapshot, config.limits, config.content_root());

    let engine = RewriteEngine::new(config.studio_url.clone())
        .stop_on_error(config.engine.stop_on_error && !options.keep_going);
    let audit_path = options
        .audit
        .clone()
        .unwrap_or_else(|| config.audit_dir().join(format!("{}.csv", kind.alias())));
    let commit = config.rules.commit(kind);
    let rules = &config.rules;

    let summary = match kind {
        RuleKind::BaseUrl => {
            let rule = BaseUrlRule::new(&indices, rules.baseurl.clone())?;
            execute(&engine, &rule, &snapshot, &audit_path, commit)?
        }
        RuleKind::ResolveUid => {
            let rule = ResolveUidRule::new(&indices, rules.resolveuid.clone())?;
            execute(&engine, &rule, &snapshot, &audit_path, commit)?
        }
        RuleKind::UnresolvedLinks => {
            let rule = UnresolvedLinkRule::new(&indices, rules.unresolved_links.clone())?;
            execute(&engine, &rule, &snapshot, &audit_path, commit)?
        }
        RuleKind::RootRelative => {
            let rule = RootRelativeRule::new(&indices, rules.root_relative.clone())?;
            execute(&engine, &rule, &snapshot, &audit_path, commit)?
        }
        RuleKind::LegacyFiles => {
            let rule = LegacyFileRule::new(&indices, rules.legacy_files.clone())?;
            execute(&engine, &rule, &snapshot, &audit_path, commit)?
        }
        RuleKind::ShortcodeQuotes => {
            let rule = ShortcodeQuoteRule::new(rules.shortcode_quotes.clone())?;
            execute(&engine, &rule, &snapshot, &audit_path, commit)?
        }
        RuleKind::ExternalLinks => {
            let rule = ExternalLinkRule::new(&indices, rules.external_links.clone())?;
            execute(&engine, &rule, &snapshot, &audit_path, commit)?
        }
    };

    if options.json {
        return print_json("run", &summary);
    }

    println!(
        "Rule {}: {} records scanned, {} changed ({} need re-sync), {} derived, {} failed",
        summary.rule,
        summary.scanned,
        summary.changed,
        summary.diverged,
        summary.derived,
        summary.failed
    );
    println!(
        "Audit: {} rows written to {}",
        summary.audit_rows,
        summary.audit_path.display()
    );
    if summary.committed {
        println!("Committed: {} records written", summary.written);
    } else if summary.changed + summary.derived > 0 {
        println!("Dry run: pass --commit to write records");
    }
    if summary.cancelled {
        println!("Run was cancelled before every record was scanned");
    }
    for failure in &summary.failures {
        println!("- {}: {}", failure.record_id, failure.error);
    }

    Ok(())
}

fn execute<R: Rule>(
    engine: &RewriteEngine,
    rule: &R,
    snapshot: &CorpusSnapshot,
    audit_path: &Path,
    commit: bool,
) -> Result<RunSummary> {
    let outcome = engine
        .run(rule, snapshot)
        .with_context(|| format!("Rule {} aborted; nothing was written", rule.alias()))?;

    let mut audit = AuditWriter::create::<R::Notes>(audit_path)
        .with_context(|| format!("Failed to create audit file {:?}", audit_path))?;
    audit.write_all(&outcome.audit)?;
    let audit_rows = audit.finish()?;

    let written = if commit {
        let written = snapshot
            .persist(&outcome.records_to_write())
            .context("Failed to write records")?;
        tracing::info!("Wrote {} records", written.len());
        written.len()
    } else {
        0
    };

    Ok(RunSummary {
        rule: outcome.alias,
        scanned: outcome.scanned,
        changed: outcome.changed.len(),
        diverged: outcome.diverged(),
        derived: outcome.derived.len(),
        failed: outcome.failures.len(),
        audit_rows,
        audit_path: audit_path.to_path_buf(),
        committed: commit,
        written,
        cancelled: outcome.cancelled,
        started_at: outcome.started_at,
        finished_at: outcome.finished_at,
        failures: outcome
            .failures
            .iter()
            .map(|f| FailureSummary {
                record_id: f.record_id.to_string(),
                error: f.error.to_string(),
            })
            .collect(),
    })
}
