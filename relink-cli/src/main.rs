//! # relink CLI
//!
//! Command-line interface for the relink content-reference rewriting engine.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "relink.yml", env = "RELINK_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one rule over the snapshot and write its audit file
    Run {
        /// Rule alias (see `relink rules`)
        rule: String,

        /// Write changed and derived records back to the snapshot
        #[arg(long)]
        commit: bool,

        /// Audit file path (defaults to <audit dir>/<rule>.csv)
        #[arg(long)]
        audit: Option<PathBuf>,

        /// Record fatal errors and continue with the next record
        #[arg(long)]
        keep_going: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the available rules
    Rules {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the links (or shortcodes) parsed from a file
    Parse {
        /// Markdown file to parse
        file: PathBuf,

        /// Parse shortcodes instead of links
        #[arg(long)]
        shortcodes: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Resolve a site-relative URL path to a record
    Lookup {
        /// Site id or name
        site: String,

        /// URL path within the site, e.g. /resources/cat
        url: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays machine readable
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            rule,
            commit,
            audit,
            keep_going,
            json,
        } => commands::run_rule(
            &cli.config,
            &rule,
            commands::RunOptions {
                commit,
                audit,
                keep_going,
                json,
            },
        ),
        Commands::Rules { json } => commands::list_rules(json),
        Commands::Parse {
            file,
            shortcodes,
            json,
        } => commands::parse_file(&file, shortcodes, json),
        Commands::Lookup { site, url, json } => {
            commands::lookup_url(&cli.config, &site, &url, json)
        }
    }
}
