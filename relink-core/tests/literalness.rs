//! Property tests: every match reports exactly the source it was parsed from.

use proptest::prelude::*;
use relink_core::markup::{find_links, find_shortcodes};

/// Markdown-ish text dense in the characters both grammars care about
fn markup_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("["),
            Just("]"),
            Just("("),
            Just(")"),
            Just("!"),
            Just("{{<"),
            Just(">}}"),
            Just("{{%"),
            Just("%}}"),
            Just("\""),
            Just("\\"),
            Just(" "),
            Just("\n"),
            Just("a"),
            Just("é"),
            Just("/x"),
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn link_spans_are_literal(text in markup_text()) {
        let mut last_end = 0;
        for found in find_links(&text) {
            prop_assert!(found.span.start >= last_end);
            prop_assert_eq!(&text[found.span.range()], found.original.as_str());
            prop_assert_eq!(&text[found.text_span.range()], found.link.text.as_str());
            last_end = found.span.end;
        }
    }

    #[test]
    fn shortcode_spans_are_literal(text in markup_text()) {
        let mut last_end = 0;
        for found in find_shortcodes(&text) {
            let Ok(found) = found else { break };
            prop_assert!(found.span.start >= last_end);
            prop_assert_eq!(&text[found.span.range()], found.original.as_str());
            last_end = found.span.end;
        }
    }

    #[test]
    fn text_without_brackets_has_no_links(text in "[a-z0-9 .,:/()\n]{0,60}") {
        prop_assert_eq!(find_links(&text).count(), 0);
    }
}
