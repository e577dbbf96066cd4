//! Per-field coercion of loosely-typed JSON values.

use serde_json::{Map, Value};

/// Missing, null and non-string values become the empty string.
pub fn string_or_empty(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Strings only; anything else is absent.
pub fn opt_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Scalars rendered as text (numbers and booleans included); objects and
/// arrays as compact JSON. Used for `expected` / `actual` diagnostics.
pub fn opt_display(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A finite number, given either as a JSON number or a numeric string.
pub fn finite_number(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Non-negative integral counter; anything else is absent.
pub fn opt_count(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    let n = finite_number(obj.get(key))?;
    (n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64).then_some(n as u64)
}

/// Duration in milliseconds; non-finite or missing falls back to 0.
pub fn duration_or_zero(obj: &Map<String, Value>, key: &str) -> u64 {
    finite_number(obj.get(key))
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
        .unwrap_or(0)
}

pub fn opt_duration(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    finite_number(obj.get(key)).filter(|n| *n >= 0.0)
}

/// Exit code; non-integral, non-finite or out-of-range values become null.
pub fn opt_exit_code(obj: &Map<String, Value>, key: &str) -> Option<i32> {
    let n = finite_number(obj.get(key))?;
    (n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64).then_some(n as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn numeric_string_zero_is_zero_not_absent() {
        let o = obj(json!({"failures": "0", "passes": 0}));
        assert_eq!(opt_count(&o, "failures"), Some(0));
        assert_eq!(opt_count(&o, "passes"), Some(0));
        assert_eq!(opt_count(&o, "pending"), None);
    }

    #[test]
    fn non_finite_strings_fall_back() {
        let o = obj(json!({"d": "Infinity", "e": "NaN", "x": "oops", "blank": " "}));
        assert_eq!(duration_or_zero(&o, "d"), 0);
        assert_eq!(opt_exit_code(&o, "e"), None);
        assert_eq!(opt_count(&o, "x"), None);
        assert_eq!(opt_count(&o, "blank"), None);
    }

    #[test]
    fn strings_default_to_empty() {
        let o = obj(json!({"a": null, "b": 3, "c": "ok"}));
        assert_eq!(string_or_empty(&o, "a"), "");
        assert_eq!(string_or_empty(&o, "b"), "");
        assert_eq!(string_or_empty(&o, "c"), "ok");
        assert_eq!(string_or_empty(&o, "missing"), "");
    }

    #[test]
    fn exit_code_accepts_numeric_strings() {
        let o = obj(json!({"a": "1", "b": -2, "c": 1.5, "d": null}));
        assert_eq!(opt_exit_code(&o, "a"), Some(1));
        assert_eq!(opt_exit_code(&o, "b"), Some(-2));
        assert_eq!(opt_exit_code(&o, "c"), None);
        assert_eq!(opt_exit_code(&o, "d"), None);
    }

    #[test]
    fn display_renders_non_strings() {
        let o = obj(json!({"n": 4, "s": "x", "o": {"k": 1}, "z": null}));
        assert_eq!(opt_display(&o, "n").as_deref(), Some("4"));
        assert_eq!(opt_display(&o, "s").as_deref(), Some("x"));
        assert_eq!(opt_display(&o, "o").as_deref(), Some("{\"k\":1}"));
        assert_eq!(opt_display(&o, "z"), None);
    }
}
