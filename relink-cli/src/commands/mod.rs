//! CLI command implementations.

pub mod lookup;
pub mod parse;
pub mod rules;
pub mod run;

pub use lookup::lookup_url;
pub use parse::parse_file;
pub use rules::list_rules;
pub use run::{run_rule, RunOptions};
