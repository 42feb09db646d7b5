//! Small conveniences for navigating the loosely-typed JSON payloads
//! the marketplace serves. Field fallback chains live at the call
//! sites; these helpers only normalize access.

use serde_json::Value;

/// String form of an id that arrives as a number or a string.
pub(crate) fn id_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Non-empty string directly under `key`.
pub(crate) fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Non-empty string at a JSON pointer path.
pub(crate) fn str_at<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub(crate) fn bool_at(v: &Value, pointer: &str) -> bool {
    v.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}

/// "City" / "City, Region" / "Region" / "" depending on what is present.
pub(crate) fn join_location(city: Option<&str>, region: Option<&str>) -> String {
    city.into_iter().chain(region).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_string_handles_numbers_and_strings() {
        assert_eq!(id_string(&json!(1052407977u64)), "1052407977");
        assert_eq!(id_string(&json!("abc123")), "abc123");
        assert_eq!(id_string(&json!(null)), "");
    }

    #[test]
    fn join_location_omits_absent_parts() {
        assert_eq!(join_location(Some("Kraków"), Some("Małopolskie")), "Kraków, Małopolskie");
        assert_eq!(join_location(Some("Kraków"), None), "Kraków");
        assert_eq!(join_location(None, Some("Małopolskie")), "Małopolskie");
        assert_eq!(join_location(None, None), "");
    }
}
