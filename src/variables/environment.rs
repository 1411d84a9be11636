//! Environment selection and lenient parsing of stored variables

use serde_json::Value;

use crate::constants::NO_ENVIRONMENT;
use crate::models::Variables;

/// Which environment feeds substitution for a request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EnvironmentSelection {
    #[default]
    None,
    Named(String),
}

impl EnvironmentSelection {
    /// Parses a picker label; the empty string and `"(no env)"` mean none
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label == NO_ENVIRONMENT {
            EnvironmentSelection::None
        } else {
            EnvironmentSelection::Named(label.to_string())
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            EnvironmentSelection::None => None,
            EnvironmentSelection::Named(name) => Some(name),
        }
    }
}

impl From<&str> for EnvironmentSelection {
    fn from(label: &str) -> Self {
        EnvironmentSelection::parse(label)
    }
}

impl From<Option<&str>> for EnvironmentSelection {
    fn from(label: Option<&str>) -> Self {
        label.map(EnvironmentSelection::parse).unwrap_or_default()
    }
}

/// Parses stored variables JSON into a flat mapping.
///
/// Never fails: malformed JSON or a non-object top level gives an empty
/// mapping. Scalars are stringified, `null` becomes an empty string and
/// nested values are kept as compact JSON text.
pub fn parse_variables(json: &str) -> Variables {
    if json.trim().is_empty() {
        return Variables::new();
    }

    let object = match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "Environment variables are not an object");
            return Variables::new();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed environment variables, using none");
            return Variables::new();
        }
    };

    object
        .into_iter()
        .map(|(key, value)| (key, value_to_string(value)))
        .collect()
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_sentinel() {
        assert_eq!(EnvironmentSelection::parse("(no env)"), EnvironmentSelection::None);
        assert_eq!(EnvironmentSelection::parse("  "), EnvironmentSelection::None);
        assert_eq!(
            EnvironmentSelection::from(Some("dev")),
            EnvironmentSelection::Named("dev".into())
        );
        assert_eq!(EnvironmentSelection::from(None), EnvironmentSelection::None);
    }

    #[test]
    fn test_parse_flat_object() {
        let vars = parse_variables(r#"{"API_URL": "https://a", "PORT": 8080, "DEBUG": true, "X": null}"#);
        assert_eq!(vars["API_URL"], "https://a");
        assert_eq!(vars["PORT"], "8080");
        assert_eq!(vars["DEBUG"], "true");
        assert_eq!(vars["X"], "");
    }

    #[test]
    fn test_parse_degrades_to_empty() {
        assert!(parse_variables("{not json").is_empty());
        assert!(parse_variables("[1, 2]").is_empty());
        assert!(parse_variables("\"str\"").is_empty());
        assert!(parse_variables("").is_empty());
    }

    #[test]
    fn test_nested_values_stay_json() {
        let vars = parse_variables(r#"{"ids": [1, 2]}"#);
        assert_eq!(vars["ids"], "[1,2]");
    }
}
