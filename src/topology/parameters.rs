//! Topology inputs and outputs.

use serde_yaml::Value;
use tracing::{debug, error};

use crate::diagnostics::{Collector, Scope};
use crate::error::Issue;
use crate::parse::{display_value, str_field};
use crate::types::datatype::{is_known_type, validate_schema_value};
use crate::types::{Schema, TypeRegistry};

pub const INPUT_KEYS: [&str; 7] = [
    "type",
    "description",
    "default",
    "constraints",
    "required",
    "status",
    "entry_schema",
];

pub const OUTPUT_KEYS: [&str; 2] = ["description", "value"];

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub name: String,
    pub schema: Schema,
}

impl Input {
    /// Build an input and check its declared keys and type.
    pub fn new(name: &str, definition: &Value, registry: &TypeRegistry, collector: &mut Collector) -> Input {
        let mut collector = collector.scoped(Scope::Input, name);
        let schema = match Schema::from_value(name, definition) {
            Ok(schema) => schema,
            Err(issue) => {
                collector.push(issue);
                Schema::untyped(name)
            }
        };
        let input = Input {
            name: name.to_string(),
            schema,
        };

        // checked against the definition itself; the schema may be a fallback
        let body = definition.as_mapping();
        for key in body.into_iter().flat_map(|body| body.keys()).map(display_value) {
            if !INPUT_KEYS.contains(&key.as_str()) {
                error!(input = %input.name, field = %key, "unknown input field");
                collector.push(Issue::unknown_field(format!("Input \"{}\"", input.name), key));
            }
        }
        let declared_type = match definition {
            Value::Mapping(body) => str_field(body, "type"),
            Value::String(type_name) => Some(type_name.as_str()),
            _ => None,
        };
        match declared_type {
            Some(type_name) if !is_known_type(type_name, registry) => {
                error!(input = %input.name, type_name, "invalid input type");
                collector.push(Issue::InvalidType {
                    what: type_name.to_string(),
                });
            }
            Some(_) => {}
            None if body.is_some() => {
                collector.push(Issue::invalid_schema(format!(
                    "Schema definition of \"{}\" must have a \"type\" attribute.",
                    input.name
                )));
            }
            None => {}
        }
        input
    }

    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    pub fn required(&self) -> bool {
        self.schema.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.schema.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.schema.description.as_deref()
    }

    pub fn constraints(&self) -> &[Value] {
        &self.schema.constraints
    }

    pub fn status(&self) -> Option<&str> {
        self.schema.status.as_deref()
    }

    /// Check a supplied value; an absent value is not checked.
    pub fn validate(&self, value: Option<&Value>, registry: &TypeRegistry, collector: &mut Collector) {
        let Some(value) = value else {
            return;
        };
        let mut collector = collector.scoped(Scope::Input, &self.name);
        debug!(input = %self.name, value = %display_value(value), "validating input value");
        if let Err(issue) = validate_schema_value(&self.schema, value, registry) {
            collector.push(issue);
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub attrs: Value,
}

impl Output {
    pub fn new(name: &str, attrs: Value) -> Output {
        Output {
            name: name.to_string(),
            attrs,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.attrs.get("description").and_then(Value::as_str)
    }

    pub fn value(&self) -> Option<&Value> {
        self.attrs.get("value").filter(|v| !v.is_null())
    }

    /// A non-mapping definition and a missing `value` are reported separately.
    pub fn validate(&self, collector: &mut Collector) {
        let mut collector = collector.scoped(Scope::Output, &self.name);
        let what = format!("Output \"{}\"", self.name);
        if !self.attrs.is_mapping() {
            debug!(output = %self.name, "output definition is not a map");
            collector.push(Issue::missing_field(what.clone(), "value"));
        }
        if self.value().is_none() {
            debug!(output = %self.name, "output has no value");
            collector.push(Issue::missing_field(what.clone(), "value"));
        }
        if let Some(attrs) = self.attrs.as_mapping() {
            for key in attrs.keys() {
                let key = display_value(key);
                if !OUTPUT_KEYS.contains(&key.as_str()) {
                    collector.push(Issue::unknown_field(what.clone(), key));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    fn collector() -> Collector {
        let mut collector = Collector::new();
        collector.start();
        collector
    }

    fn input(yaml: &str, collector: &mut Collector) -> Input {
        let definition: Value = serde_yaml::from_str(yaml).unwrap();
        Input::new("cpus", &definition, &TypeRegistry::default(), collector)
    }

    #[test]
    fn builtin_types_are_accepted() {
        let mut collector = collector();
        let input = input("{type: integer, default: 2, description: CPU count}", &mut collector);
        assert!(!collector.has_errors());
        assert_eq!(input.default().and_then(Value::as_i64), Some(2));
        assert_eq!(input.description(), Some("CPU count"));
    }

    #[test]
    fn unknown_type_yields_one_invalid_type() {
        let mut collector = collector();
        input("{type: example.Missing}", &mut collector);
        assert_eq!(collector.count_kind(DiagnosticKind::InvalidType), 1);
        assert_eq!(collector.diagnostics().len(), 1);
        assert_eq!(collector.report()[0], "[input: cpus] InvalidTypeError: Type \"example.Missing\" is not a valid type.");
    }

    #[test]
    fn unknown_keys_are_reported_and_context_popped() {
        let mut collector = collector();
        input("{type: string, colour: red}", &mut collector);
        assert_eq!(collector.count_kind(DiagnosticKind::UnknownField), 1);
        assert!(collector.context().is_empty());
    }

    #[test]
    fn malformed_schema_still_checks_keys_and_type() {
        let mut collector = collector();
        input("{type: integer, constraints: 5, colour: red}", &mut collector);
        assert_eq!(
            collector.report(),
            vec![
                "[input: cpus] InvalidSchemaError: The constraints of \"cpus\" must be a list.",
                "[input: cpus] UnknownFieldError: Input \"cpus\" contains unknown field \"colour\". Refer to the definition to verify valid values.",
            ]
        );
    }

    #[test]
    fn validate_checks_type_and_constraints() {
        let mut collector = collector();
        let registry = TypeRegistry::default();
        let input = input("{type: integer, constraints: [{in_range: [1, 4]}]}", &mut collector);

        input.validate(None, &registry, &mut collector);
        input.validate(Some(&Value::from(2)), &registry, &mut collector);
        assert!(!collector.has_errors());

        input.validate(Some(&Value::from(8)), &registry, &mut collector);
        input.validate(Some(&Value::from("two")), &registry, &mut collector);
        assert_eq!(collector.count_kind(DiagnosticKind::InvalidValue), 2);
        assert!(collector.context().is_empty());
    }

    #[test]
    fn output_without_value_is_missing_field() {
        let mut collector = collector();
        Output::new("ip", serde_yaml::from_str("{description: address}").unwrap()).validate(&mut collector);
        assert_eq!(collector.count_kind(DiagnosticKind::MissingRequiredField), 1);

        let mut collector = self::collector();
        Output::new("ip", serde_yaml::from_str("{value: 1}").unwrap()).validate(&mut collector);
        assert!(!collector.has_errors());
    }

    #[test]
    fn non_mapping_output_reports_both_rules() {
        let mut collector = collector();
        Output::new("ip", Value::from("10.0.0.1")).validate(&mut collector);
        assert_eq!(collector.count_kind(DiagnosticKind::MissingRequiredField), 2);
    }
}
