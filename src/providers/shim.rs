use serde_json::{Map, Value};

use crate::lang::is_unknown;

/// Configuration in the shape older providers expect: a raw map where values
/// not yet known hold the unknown sentinel, plus the flattened keys of those
/// values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyResourceConfig {
    pub raw: Map<String, Value>,
    pub computed_keys: Vec<String>,
}

impl LegacyResourceConfig {
    /// Null attributes are dropped. Non-object values yield an empty config.
    pub fn from_value(value: &Value) -> Self {
        let mut config = Self::default();
        if let Value::Object(obj) = value {
            config.raw = shim_object(obj, "", &mut config.computed_keys);
        }
        config
    }

    /// Looks up a dotted key such as `assume_role.0.role_arn`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.raw.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(obj) => obj.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn is_computed(&self, key: &str) -> bool {
        self.computed_keys.iter().any(|k| k == key)
    }
}

fn shim_object(obj: &Map<String, Value>, prefix: &str, computed: &mut Vec<String>) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, value) in obj {
        if value.is_null() {
            continue;
        }
        let key = format!("{prefix}{name}");
        out.insert(name.clone(), shim_value(value, &key, computed));
    }
    out
}

fn shim_value(value: &Value, key: &str, computed: &mut Vec<String>) -> Value {
    match value {
        v if is_unknown(v) => {
            computed.push(key.to_string());
            v.clone()
        }
        Value::Object(obj) => Value::Object(shim_object(obj, &format!("{key}."), computed)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| shim_value(item, &format!("{key}.{i}"), computed))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::UNKNOWN_VALUE;
    use serde_json::json;

    #[test]
    fn test_known_values_pass_through() {
        let config = LegacyResourceConfig::from_value(&json!({
            "region": "us-east-1",
            "profile": null,
            "max_retries": 3
        }));
        assert_eq!(config.get("region"), Some(&json!("us-east-1")));
        assert!(config.get("profile").is_none());
        assert_eq!(config.get("max_retries"), Some(&json!(3)));
        assert!(config.computed_keys.is_empty());
    }

    #[test]
    fn test_unknown_values_become_computed_keys() {
        let config = LegacyResourceConfig::from_value(&json!({
            "region": UNKNOWN_VALUE,
            "assume_role": [{"role_arn": UNKNOWN_VALUE, "session_name": "ci"}]
        }));
        assert_eq!(config.computed_keys, vec!["assume_role.0.role_arn", "region"]);
        assert!(config.is_computed("region"));
        assert_eq!(config.get("region"), Some(&json!(UNKNOWN_VALUE)));
        assert_eq!(config.get("assume_role.0.session_name"), Some(&json!("ci")));
    }

    #[test]
    fn test_non_object_is_empty() {
        let config = LegacyResourceConfig::from_value(&json!("nope"));
        assert!(config.raw.is_empty());
    }
}
