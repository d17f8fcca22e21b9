//! Property/input schema definitions.

use serde_yaml::{Mapping, Value};

use super::constraints::Constraint;
use crate::error::Issue;
use crate::parse::str_field;

pub const SCHEMA_KEYS: [&str; 7] = [
    "type",
    "required",
    "description",
    "default",
    "constraints",
    "entry_schema",
    "status",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub constraints: Vec<Value>,
    pub status: Option<String>,
    pub entry_schema: Option<Box<Schema>>,
    raw: Mapping,
}

impl Schema {
    /// Build a schema from its definition. Only a non-mapping definition is an
    /// error; a missing `type` is left for the caller to report.
    pub fn from_value(name: &str, value: &Value) -> Result<Schema, Issue> {
        let raw = match value {
            Value::Mapping(raw) => raw.clone(),
            // `entry_schema: string` shorthand
            Value::String(type_name) => {
                let mut raw = Mapping::new();
                raw.insert(Value::from("type"), Value::from(type_name.as_str()));
                raw
            }
            _ => {
                return Err(Issue::invalid_schema(format!(
                    "Schema definition of \"{}\" must be a map.",
                    name
                )));
            }
        };

        let entry_schema = match raw.get("entry_schema") {
            Some(entry) => Some(Box::new(Schema::from_value(name, entry)?)),
            None => None,
        };
        let constraints = match raw.get("constraints") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items.clone(),
            Some(_) => {
                return Err(Issue::invalid_schema(format!(
                    "The constraints of \"{}\" must be a list.",
                    name
                )));
            }
        };

        Ok(Schema {
            name: name.to_string(),
            type_name: str_field(&raw, "type").map(str::to_string),
            description: str_field(&raw, "description").map(str::to_string),
            required: raw.get("required").and_then(Value::as_bool).unwrap_or(true),
            default: raw.get("default").filter(|v| !v.is_null()).cloned(),
            constraints,
            status: str_field(&raw, "status").map(str::to_string),
            entry_schema,
            raw,
        })
    }

    /// Placeholder for a definition that could not be read; validates nothing.
    pub fn untyped(name: &str) -> Schema {
        Schema {
            name: name.to_string(),
            type_name: None,
            description: None,
            required: true,
            default: None,
            constraints: Vec::new(),
            status: None,
            entry_schema: None,
            raw: Mapping::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or_default()
    }

    pub fn parsed_constraints(&self) -> Result<Vec<Constraint>, Issue> {
        self.constraints
            .iter()
            .map(|c| Constraint::parse(&self.name, c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(yaml: &str) -> Result<Schema, Issue> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        Schema::from_value("port", &value)
    }

    #[test]
    fn required_defaults_to_true() {
        let schema = schema("{type: integer, default: 80}").unwrap();
        assert!(schema.required);
        assert_eq!(schema.type_name(), "integer");
        assert_eq!(schema.default.as_ref().and_then(Value::as_i64), Some(80));
    }

    #[test]
    fn entry_schema_accepts_shorthand() {
        let schema = schema("{type: list, entry_schema: string}").unwrap();
        assert_eq!(schema.entry_schema.unwrap().type_name(), "string");
    }

    #[test]
    fn non_mapping_definition_is_invalid() {
        assert!(schema("[1, 2]").is_err());
        assert!(schema("{type: string, constraints: {min_length: 1}}").is_err());
    }
}
