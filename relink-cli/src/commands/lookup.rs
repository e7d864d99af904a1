use crate::output::print_json;
use anyhow::{Context, Result};
use relink_core::{Config, CorpusSnapshot, Indices, Lookup, LookupOutcome};
use relink_types::SiteId;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Candidate {
    id: String,
    title: Option<String>,
    category: String,
    dirpath: Option<String>,
    filename: Option<String>,
}

#[derive(Serialize)]
struct LookupReport {
    site: String,
    url: String,
    dirpath: Option<String>,
    filename: Option<String>,
    /// Category whose folder holds `dirpath` in this site
    folder_category: Option<String>,
    outcome: LookupOutcome,
    candidates: Vec<Candidate>,
}

/// Exact-path lookup of `url` within one site
pub fn lookup_url(config_path: &Path, site: &str, url: &str, json: bool) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let snapshot = CorpusSnapshot::load(config.snapshot_dir()).context("Failed to load snapshot")?;
    let site = snapshot
        .site(&SiteId::new(site))
        .or_else(|| snapshot.site_by_name(site))
        .with_context(|| format!("No site with id or name '{}'", site))?;
    let indices = Indices::build(&snapshot, config.limits, config.content_root());

    let location = indices.paths.url_to_location(url);
    let folder_category = location
        .as_ref()
        .and_then(|(dirpath, _)| indices.categories.category_for(&site.id, dirpath))
        .map(str::to_string);
    let lookup = indices.paths.lookup_url(&site.id, url);
    let outcome = lookup.outcome();
    let records = match lookup {
        Lookup::Found(record) => vec![record],
        Lookup::NotFound => Vec::new(),
        Lookup::Ambiguous(records) => records,
    };

    let report = LookupReport {
        site: site.name.clone(),
        url: url.to_string(),
        dirpath: location.as_ref().map(|(dirpath, _)| dirpath.clone()),
        filename: location.map(|(_, filename)| filename),
        folder_category,
        outcome,
        candidates: records
            .into_iter()
            .map(|r| Candidate {
                id: r.text_id.to_string(),
                title: r.title.clone(),
                category: r.category.clone(),
                dirpath: r.dirpath.clone(),
                filename: r.filename.clone(),
            })
            .collect(),
    };

    if json {
        return print_json("lookup", &report);
    }

    match (&report.dirpath, &report.filename) {
        (Some(dirpath), Some(filename)) => {
            println!("{} {} -> {}/{}: {:?}", report.site, report.url, dirpath, filename, outcome);
            if let Some(category) = &report.folder_category {
                println!("  folder of category {}", category);
            }
        }
        _ => println!("{} {}: not a record path", report.site, report.url),
    }
    for candidate in &report.candidates {
        println!(
            "- {} [{}] {}",
            candidate.id,
            candidate.category,
            candidate.title.as_deref().unwrap_or("(untitled)")
        );
    }
    Ok(())
}
