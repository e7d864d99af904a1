//! # relink-core
//!
//! Core library for relink, a batch engine that resolves content references
//! across a corpus snapshot and rewrites them into permanent-id tags.
//!
//! Data flows one way: a [`CorpusSnapshot`] is loaded, [`Indices`] are built
//! over it, a [`Rule`] from the [`catalog`] is run by the [`RewriteEngine`],
//! and the outcome is persisted and written to an audit file.

pub mod audit;
pub mod catalog;
pub mod checksum;
pub mod config;
pub mod engine;
pub mod lookup;
pub mod markup;
pub mod models;
pub mod rules;
pub mod slug;
pub mod snapshot;

pub use audit::{AuditRow, AuditWriter};
pub use catalog::RuleKind;
pub use config::Config;
pub use engine::{RewriteEngine, RunOutcome};
pub use lookup::{Indices, Lookup, LookupOutcome};
pub use models::{ContentRecord, Field, Site};
pub use rules::{Rule, RuleError};
pub use slug::slugify;
pub use snapshot::CorpusSnapshot;
