use crate::output::print_json;
use anyhow::Result;
use relink_core::RuleKind;
use serde::Serialize;

#[derive(Serialize)]
struct RuleInfo {
    alias: &'static str,
    description: &'static str,
}

pub fn list_rules(json: bool) -> Result<()> {
    let rules: Vec<RuleInfo> = RuleKind::ALL
        .iter()
        .map(|kind| RuleInfo {
            alias: kind.alias(),
            description: kind.description(),
        })
        .collect();

    if json {
        return print_json("rules", &rules);
    }

    let width = rules.iter().map(|r| r.alias.len()).max().unwrap_or(0);
    for rule in &rules {
        println!("{:width$}  {}", rule.alias, rule.description, width = width);
    }
    Ok(())
}
