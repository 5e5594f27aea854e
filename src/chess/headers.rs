use std::sync::LazyLock;

use regex::Regex;

use super::log;
use super::types::GameMetadata;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"(.*?)"\]"#).expect("valid header regex"));

/// Collect every `[Tag "Value"]` pair found anywhere in the text.
pub fn extract_metadata(pgn: &str) -> GameMetadata {
    let mut metadata = GameMetadata::new();
    for caps in HEADER_RE.captures_iter(pgn) {
        let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        metadata.insert(name.as_str().to_string(), value.as_str().to_string());
    }
    metadata
}

pub fn metadata_to_json(metadata: &GameMetadata) -> String {
    serde_json::to_string(metadata).unwrap_or_else(|e| {
        log::error(format!("Failed to serialize headers: {}", e));
        "{}".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_metadata_basic() {
        let pgn = "[White \"A\"]\n[Black \"B\"]\n1. e4 {[%clk 0:15:00]}";
        let metadata = extract_metadata(pgn);
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("White").map(String::as_str), Some("A"));
        assert_eq!(metadata.get("Black").map(String::as_str), Some("B"));
    }

    #[test]
    fn test_extract_metadata_last_occurrence_wins() {
        let pgn = r#"[Event "First"] [Site "x"] [Event "Second"]"#;
        let metadata = extract_metadata(pgn);
        assert_eq!(metadata.get("Event").map(String::as_str), Some("Second"));
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn test_extract_metadata_not_line_anchored() {
        let pgn = r#"1. e4 e5 [Annotator "someone"] 2. Nf3"#;
        let metadata = extract_metadata(pgn);
        assert_eq!(
            metadata.get("Annotator").map(String::as_str),
            Some("someone")
        );
    }

    #[test]
    fn test_extract_metadata_ignores_clock_tags() {
        let pgn = "1. e4 {[%clk 0:15:00]} e5 {[%eval 0.3]}";
        assert!(extract_metadata(pgn).is_empty());
    }

    #[test]
    fn test_extract_metadata_empty_value() {
        let metadata = extract_metadata(r#"[Black ""]"#);
        assert_eq!(metadata.get("Black").map(String::as_str), Some(""));
    }

    #[test]
    fn test_extract_metadata_empty_value_does_not_swallow_next_tag() {
        let metadata = extract_metadata(r#"[Black ""] [White "A"]"#);
        assert_eq!(metadata.get("Black").map(String::as_str), Some(""));
        assert_eq!(metadata.get("White").map(String::as_str), Some("A"));
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn test_metadata_to_json_is_sorted() {
        let metadata = extract_metadata(r#"[White "A"] [Black "B"]"#);
        assert_eq!(metadata_to_json(&metadata), r#"{"Black":"B","White":"A"}"#);
        assert_eq!(metadata_to_json(&GameMetadata::new()), "{}");
    }
}
