//! Mapping of answers onto purchase request fields.

use serde_json::Value;

use crate::config::PlacementItems;
use crate::template::stringify_value;

/// Reads an answer that may be a raw value or a `{value}` wrapper.
#[must_use]
pub fn unwrap_answer(answer: Option<&Value>) -> Option<String> {
    let value = match answer? {
        Value::Object(map) => map.get("value")?,
        other => other,
    };
    Some(stringify_value(value)).filter(|s| !s.is_empty())
}

/// Maps a placement choice to the backend item id.
///
/// Known substrings are checked longest first so that `10` is not taken for
/// `1`. Anything else is passed through unchanged.
#[must_use]
pub fn resolve_item_id(placement: &str, items: &PlacementItems) -> String {
    if placement.contains("10") {
        items.ten.clone()
    } else if placement.contains('5') {
        items.five.clone()
    } else if placement.contains("story") || placement.contains('1') {
        items.story.clone()
    } else {
        placement.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placement_mapping() {
        let items = PlacementItems::default();
        assert_eq!(resolve_item_id("10_days", &items), "sticky_10_days");
        assert_eq!(resolve_item_id("5", &items), "sticky_5_days");
        assert_eq!(resolve_item_id("story", &items), "sticky_story");
        assert_eq!(resolve_item_id("1", &items), "sticky_story");
        assert_eq!(resolve_item_id("premium_banner", &items), "premium_banner");
    }

    #[test]
    fn test_unwrap_answer() {
        assert_eq!(unwrap_answer(Some(&json!("123"))).as_deref(), Some("123"));
        assert_eq!(unwrap_answer(Some(&json!(123))).as_deref(), Some("123"));
        assert_eq!(unwrap_answer(Some(&json!({"value": "5"}))).as_deref(), Some("5"));
        assert_eq!(unwrap_answer(Some(&json!({"label": "x"}))), None);
        assert_eq!(unwrap_answer(Some(&json!(""))), None);
        assert_eq!(unwrap_answer(None), None);
    }
}
