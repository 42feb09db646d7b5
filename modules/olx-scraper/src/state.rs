//! Extraction of the `__PRERENDERED_STATE__` payload the marketplace
//! serializes into its pages. The payload is a JSON document encoded
//! as a JSON string literal, so it is decoded twice. Absence or
//! malformation is a normal fallback condition: nothing here errors.

use serde_json::Value;

const STATE_MARKER: &str = "window.__PRERENDERED_STATE__= \"";

/// Locate and decode the embedded state tree, or `None` if the marker
/// is missing or anything along the decode chain fails.
pub fn extract_state(html: &str) -> Option<Value> {
    let idx = html.find(STATE_MARKER)?;
    // Back up one byte to keep the opening quote of the string literal.
    let rest = &html[idx + STATE_MARKER.len() - 1..];
    let end = find_terminator(rest)?;
    let literal = &rest[..end + 1];

    let outer: Value = serde_json::from_str(literal).ok()?;
    match outer {
        Value::String(inner) => serde_json::from_str(&inner).ok(),
        other => Some(other),
    }
}

/// Find the closing quote of the state literal. The newline-adjacent
/// terminator is tried first; pages minified differently drop the
/// newline.
fn find_terminator(s: &str) -> Option<usize> {
    s.find("\";\n").or_else(|| s.find("\";"))
}

// The tree's shape has drifted over time, so each accessor tries the
// known path shapes in fixed precedence order.

/// Ad entries of a search-results page.
pub fn listing_ads(state: &Value) -> Option<&[Value]> {
    ["/listing/listing/ads", "/listing/ads"]
        .iter()
        .find_map(|p| state.pointer(p).and_then(Value::as_array))
        .map(Vec::as_slice)
}

/// Total result count of a search-results page, 0 when absent.
pub fn listing_total_count(state: &Value) -> u64 {
    ["/listing/listing/totalCount", "/listing/totalCount"]
        .iter()
        .find_map(|p| state.pointer(p).and_then(Value::as_u64))
        .unwrap_or(0)
}

/// The ad node of a product page.
pub fn ad_node(state: &Value) -> Option<&Value> {
    ["/ad/ad", "/ad"]
        .iter()
        .find_map(|p| state.pointer(p).filter(|v| !v.is_null()))
}
