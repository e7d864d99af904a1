//! Slug generation for the file names of derived records.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));

/// Convert a string to a URL-safe slug
///
/// Rules:
/// - Lowercase
/// - Replace whitespace, underscores and periods with hyphens
/// - Remove special characters (except hyphens)
/// - Collapse multiple hyphens
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use relink_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Lecture 3: Waves & Optics"), "lecture-3-waves-optics");
/// assert_eq!(slugify("notes.pdf"), "notes-pdf");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.to_lowercase();

    let cleaned = lowercased
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if matches!(g, " " | "_" | "." | "\t" | "\n" | "/") {
                Some("-")
            } else if c.is_ascii_alphanumeric() || c == '-' || c.is_alphabetic() {
                Some(g)
            } else {
                None
            }
        })
        .collect::<String>();

    let collapsed = HYPHENS.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

/// File name for a record derived from a link
///
/// Slugifies the title, falling back to the URL when the title has no
/// usable characters, and cuts the result to `max_len` graphemes without
/// leaving a trailing hyphen.
pub fn derivative_filename(title: &str, url: &str, max_len: usize) -> String {
    let mut slug = slugify(title);
    if slug.is_empty() {
        let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
        slug = slugify(without_scheme);
    }

    let truncated: String = slug.graphemes(true).take(max_len).collect();
    truncated.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust & Safety"), "rust-safety");
        assert_eq!(slugify("What's new?"), "whats-new");
    }

    #[test]
    fn test_unicode() {
        assert_eq!(slugify("Café"), "café");
        assert_eq!(slugify("naïve"), "naïve");
    }

    #[test]
    fn test_separators_collapse() {
        assert_eq!(slugify("  Hello   World  "), "hello-world");
        assert_eq!(slugify("hello_world.txt"), "hello-world-txt");
        assert_eq!(slugify("-Leading Hyphen-"), "leading-hyphen");
    }

    #[test]
    fn test_empty_and_special_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_derivative_filename() {
        assert_eq!(
            derivative_filename("MIT OpenCourseWare", "https://ocw.mit.edu", 125),
            "mit-opencourseware"
        );
        assert_eq!(
            derivative_filename("???", "https://example.com/a/b", 125),
            "example-com-a-b"
        );
        assert_eq!(derivative_filename("abc def", "", 4), "abc");
    }
}
