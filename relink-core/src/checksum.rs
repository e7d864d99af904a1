//! Content checksums used to detect records that need re-syncing downstream.

use crate::models::ContentRecord;
use serde_json::{json, Map, Value};

/// BLAKE3 digest over the synced fields of a record
///
/// Object keys are sorted first so the digest does not depend on the key
/// order the metadata was loaded with.
pub fn content_checksum(record: &ContentRecord) -> String {
    let payload = json!({
        "title": record.title,
        "type": record.category,
        "markdown": record.markdown,
        "metadata": record.metadata,
    });
    let canonical = canonicalize(&payload).to_string();
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// Recompute `checksums.current`; returns true when it no longer matches `last_synced`
pub fn refresh_checksum(record: &mut ContentRecord) -> bool {
    record.checksums.current = Some(content_checksum(record));
    record.checksums.current != record.checksums.last_synced
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&object[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_ignores_key_order() {
        let a = ContentRecord::new("1", "s", "page")
            .with_metadata(serde_json::from_str(r#"{"a": 1, "b": {"x": 1, "y": 2}}"#).unwrap());
        let b = ContentRecord::new("1", "s", "page")
            .with_metadata(serde_json::from_str(r#"{"b": {"y": 2, "x": 1}, "a": 1}"#).unwrap());
        assert_eq!(content_checksum(&a), content_checksum(&b));
    }

    #[test]
    fn test_checksum_tracks_body() {
        let a = ContentRecord::new("1", "s", "page").with_markdown("one");
        let b = ContentRecord::new("1", "s", "page").with_markdown("two");
        assert_ne!(content_checksum(&a), content_checksum(&b));
        assert_eq!(content_checksum(&a).len(), 64);
    }

    #[test]
    fn test_refresh_flags_divergence() {
        let mut record = ContentRecord::new("1", "s", "page").with_markdown("body");
        let synced = content_checksum(&record);
        record.checksums.last_synced = Some(synced);
        assert!(!refresh_checksum(&mut record));
        assert!(record.checksums.is_in_sync());

        record.markdown = Some("edited".to_string());
        assert!(refresh_checksum(&mut record));
        assert!(!record.checksums.is_in_sync());
    }
}
