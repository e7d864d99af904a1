//! Show what the link and shortcode grammars see in a file.

use crate::output::print_json;
use anyhow::{Context, Result};
use relink_core::markup::{find_links, find_shortcodes, ShortcodeMatch};
use std::fs;
use std::path::Path;

pub fn parse_file(path: &Path, shortcodes: bool, json: bool) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

    if shortcodes {
        let found: Vec<ShortcodeMatch> = find_shortcodes(&text)
            .collect::<Result<_, _>>()
            .with_context(|| format!("Failed to parse shortcodes in {:?}", path))?;
        if json {
            return print_json("shortcodes", &found);
        }
        for m in &found {
            let kind = if m.shortcode.closer { "close" } else { "open" };
            println!("{}..{} {} {}", m.span.start, m.span.end, kind, m.shortcode.name);
            for param in &m.shortcode.params {
                match &param.name {
                    Some(name) => println!("    {} = {:?}", name, param.value),
                    None => println!("    {:?}", param.value),
                }
            }
        }
        return Ok(());
    }

    let links: Vec<_> = find_links(&text).collect();
    if json {
        return print_json("links", &links);
    }
    for m in &links {
        let kind = if m.link.is_image { "image" } else { "link" };
        println!(
            "{}..{} {} [{}] -> {}",
            m.span.start, m.span.end, kind, m.link.text, m.link.destination
        );
        for nested in m.nested() {
            println!("    nested: {}", nested.original);
        }
    }
    Ok(())
}
