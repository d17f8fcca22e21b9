//! Value validation against builtin and data types.
//!
//! Returns the first defect found for a single value; callers push it into the
//! collector. Data types that cannot be resolved are accepted as-is.

use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::Value;

use super::entity::EntityType;
use super::schema::Schema;
use super::{TypeRegistry, is_property_type};
use crate::error::Issue;
use crate::parse::display_value;
use crate::topology::functions::is_function;

// ============================================================================
// Scalar units
// ============================================================================

const SIZE_UNITS: [(&str, f64); 9] = [
    ("B", 1.0),
    ("kB", 1e3),
    ("KiB", 1024.0),
    ("MB", 1e6),
    ("MiB", 1_048_576.0),
    ("GB", 1e9),
    ("GiB", 1_073_741_824.0),
    ("TB", 1e12),
    ("TiB", 1_099_511_627_776.0),
];

const TIME_UNITS: [(&str, f64); 7] = [
    ("d", 86_400.0),
    ("h", 3_600.0),
    ("m", 60.0),
    ("s", 1.0),
    ("ms", 1e-3),
    ("us", 1e-6),
    ("ns", 1e-9),
];

const FREQUENCY_UNITS: [(&str, f64); 4] = [("Hz", 1.0), ("kHz", 1e3), ("MHz", 1e6), ("GHz", 1e9)];

const BITRATE_UNITS: [(&str, f64); 9] = [
    ("bps", 1.0),
    ("Kbps", 1e3),
    ("Kibps", 1024.0),
    ("Mbps", 1e6),
    ("Mibps", 1_048_576.0),
    ("Gbps", 1e9),
    ("Gibps", 1_073_741_824.0),
    ("Tbps", 1e12),
    ("Tibps", 1_099_511_627_776.0),
];

fn unit_table(type_name: &str) -> Option<&'static [(&'static str, f64)]> {
    match type_name {
        "scalar-unit.size" => Some(&SIZE_UNITS),
        "scalar-unit.time" => Some(&TIME_UNITS),
        "scalar-unit.frequency" => Some(&FREQUENCY_UNITS),
        "scalar-unit.bitrate" => Some(&BITRATE_UNITS),
        _ => None,
    }
}

/// Convert `"<number> <unit>"` into the base unit of `type_name`. Units match
/// exactly first, then case-insensitively.
pub fn scalar_to_base(type_name: &str, text: &str) -> Option<f64> {
    let table = unit_table(type_name)?;
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.trim().parse().ok()?;
    let unit = unit.trim();
    if unit.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|(name, _)| *name == unit)
        .or_else(|| table.iter().find(|(name, _)| name.eq_ignore_ascii_case(unit)))
        .map(|(_, factor)| number * factor)
}

// ============================================================================
// Formats
// ============================================================================

fn timestamp_format() -> Option<&'static Regex> {
    static FORMAT: OnceLock<Option<Regex>> = OnceLock::new();
    FORMAT
        .get_or_init(|| {
            Regex::new(
                r"^\d{4}-\d{1,2}-\d{1,2}([Tt ]\d{1,2}:\d{2}:\d{2}(\.\d+)?(\s*([Zz]|[+-]\d{1,2}(:\d{2})?))?)?$",
            )
            .ok()
        })
        .as_ref()
}

fn version_format() -> Option<&'static Regex> {
    static FORMAT: OnceLock<Option<Regex>> = OnceLock::new();
    FORMAT
        .get_or_init(|| Regex::new(r"^\d+\.\d+(\.\d+(\.\w+(-\d+)?)?)?$").ok())
        .as_ref()
}

fn matches_format(format: Option<&Regex>, text: &str) -> bool {
    format.is_some_and(|re| re.is_match(text))
}

// ============================================================================
// Validation
// ============================================================================

/// Validate a value against a schema: its type first, then its constraints.
/// Intrinsic function calls are not evaluated and always pass.
pub fn validate_schema_value(schema: &Schema, value: &Value, registry: &TypeRegistry) -> Result<(), Issue> {
    if is_function(value) {
        return Ok(());
    }
    let type_name = schema.type_name();
    let datatype = registry.datatype_for(type_name);
    validate_value(
        type_name,
        value,
        schema.entry_schema.as_deref(),
        datatype.as_ref(),
        registry,
    )?;
    let base = datatype
        .as_ref()
        .and_then(EntityType::scalar_base)
        .unwrap_or(type_name);
    for constraint in schema.parsed_constraints()? {
        constraint.validate(&schema.name, base, value)?;
    }
    Ok(())
}

/// Validate `value` as an instance of `type_name`.
pub fn validate_value(
    type_name: &str,
    value: &Value,
    entry_schema: Option<&Schema>,
    datatype: Option<&EntityType<'_>>,
    registry: &TypeRegistry,
) -> Result<(), Issue> {
    let shown = || display_value(value);
    let invalid = |message: String| Err(Issue::invalid_value(message));

    match type_name {
        "integer" => {
            if !(value.is_i64() || value.is_u64()) {
                return invalid(format!("\"{}\" is not an integer.", shown()));
            }
        }
        "float" => {
            if !value.is_number() {
                return invalid(format!("\"{}\" is not a float.", shown()));
            }
        }
        "number" => {
            if !value.is_number() {
                return invalid(format!("\"{}\" is not a numeric.", shown()));
            }
        }
        "string" => {
            if !value.is_string() {
                return invalid(format!("\"{}\" is not a string.", shown()));
            }
        }
        "boolean" => {
            let text_bool = value
                .as_str()
                .is_some_and(|s| s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false"));
            if !(value.is_bool() || text_bool) {
                return invalid(format!("\"{}\" is not a boolean.", shown()));
            }
        }
        "timestamp" => {
            if !value.as_str().is_some_and(|s| matches_format(timestamp_format(), s.trim())) {
                return invalid(format!("\"{}\" is not a valid timestamp.", shown()));
            }
        }
        "version" => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => String::new(),
            };
            if !matches_format(version_format(), &text) {
                return invalid(format!(
                    "Value of TOSCA version property \"{}\" is invalid.",
                    shown()
                ));
            }
        }
        "range" => validate_range(value)?,
        "list" => {
            let Some(items) = value.as_sequence() else {
                return invalid(format!("\"{}\" is not a list.", shown()));
            };
            if let Some(entry) = entry_schema {
                for item in items {
                    validate_schema_value(entry, item, registry)?;
                }
            }
        }
        "map" => {
            let Some(map) = value.as_mapping() else {
                return invalid(format!("\"{}\" is not a map.", shown()));
            };
            if let Some(entry) = entry_schema {
                for item in map.values() {
                    validate_schema_value(entry, item, registry)?;
                }
            }
        }
        "json" => {
            let parses = match value {
                Value::String(s) => serde_json::from_str::<serde_json::Value>(s).is_ok(),
                Value::Mapping(_) | Value::Sequence(_) => true,
                _ => false,
            };
            if !parses {
                return invalid(format!("\"{}\" is not a valid JSON.", shown()));
            }
        }
        scalar if unit_table(scalar).is_some() => {
            if value.as_str().and_then(|s| scalar_to_base(scalar, s)).is_none() {
                return invalid(format!(
                    "\"{}\" is not a valid scalar-unit value of type \"{}\".",
                    shown(),
                    scalar
                ));
            }
        }
        _ => {
            if let Some(datatype) = datatype {
                validate_datatype(datatype, value, registry)?;
            }
        }
    }
    Ok(())
}

fn validate_range(value: &Value) -> Result<(), Issue> {
    let bad = || Issue::invalid_value(format!("\"{}\" is not a valid range.", display_value(value)));
    let Some([lower, upper]) = value.as_sequence().map(Vec::as_slice) else {
        return Err(bad());
    };
    let lower = lower.as_i64().ok_or_else(bad)?;
    if upper.as_str() == Some(super::constraints::UNBOUNDED) {
        return Ok(());
    }
    let upper = upper.as_i64().ok_or_else(bad)?;
    if lower > upper {
        return Err(bad());
    }
    Ok(())
}

/// A data type is either a constrained scalar (`derived_from: integer`) or a
/// map of declared properties.
fn validate_datatype(datatype: &EntityType<'_>, value: &Value, registry: &TypeRegistry) -> Result<(), Issue> {
    if let Some(base) = datatype.scalar_base() {
        validate_value(base, value, None, None, registry)?;
        for clause in datatype.constraints() {
            super::Constraint::parse(datatype.name(), &clause)?.validate(datatype.name(), base, value)?;
        }
        return Ok(());
    }

    let what = format!("Data value of type \"{}\"", datatype.name());
    let Some(map) = value.as_mapping() else {
        return Err(Issue::invalid_value(format!(
            "{} must be a map, found \"{}\".",
            what,
            display_value(value)
        )));
    };
    let properties = datatype.properties_def();
    for key in map.keys() {
        let key = display_value(key);
        if !properties.iter().any(|p| p.name == key) {
            return Err(Issue::unknown_field(what, key));
        }
    }
    for property in &properties {
        match map.get(property.name.as_str()) {
            Some(item) => validate_schema_value(&property.schema, item, registry)?,
            None if property.required() && property.default().is_none() => {
                return Err(Issue::missing_field(what, property.name.clone()));
            }
            None => {}
        }
    }
    Ok(())
}

/// Whether `type_name` names something an input or property may declare.
pub fn is_known_type(type_name: &str, registry: &TypeRegistry) -> bool {
    is_property_type(type_name) || registry.contains(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    fn check(type_name: &str, yaml: &str) -> Result<(), Issue> {
        let registry = TypeRegistry::default();
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        let datatype = registry.datatype_for(type_name);
        validate_value(type_name, &value, None, datatype.as_ref(), &registry)
    }

    #[test]
    fn scalar_units_convert_case_insensitively() {
        assert_eq!(scalar_to_base("scalar-unit.size", "2 GiB"), Some(2_147_483_648.0));
        assert_eq!(scalar_to_base("scalar-unit.size", "1 gb"), Some(1e9));
        assert_eq!(scalar_to_base("scalar-unit.time", "90s"), Some(90.0));
        assert_eq!(scalar_to_base("scalar-unit.frequency", "fast"), None);
        assert_eq!(scalar_to_base("scalar-unit.size", "12"), None);
    }

    #[test]
    fn primitive_types() {
        assert!(check("integer", "3").is_ok());
        assert_eq!(
            check("integer", "'3'").unwrap_err().to_string(),
            "\"3\" is not an integer."
        );
        assert!(check("boolean", "'True'").is_ok());
        assert!(check("version", "1.2.0").is_ok());
        assert!(check("version", "one").is_err());
        assert!(check("timestamp", "2024-01-15T10:00:00Z").is_ok());
        assert!(check("range", "[1, UNBOUNDED]").is_ok());
        assert!(check("range", "[5, 1]").is_err());
        assert!(check("json", "'{\"a\": 1}'").is_ok());
    }

    #[test]
    fn port_def_applies_its_range() {
        assert!(check("PortDef", "8080").is_ok());
        assert!(check("PortDef", "70000").is_err());
    }

    #[test]
    fn complex_types_check_their_properties() {
        assert!(check("PortSpec", "{protocol: tcp, source: 80}").is_ok());
        let err = check("PortSpec", "{protocol: tcp, colour: red}").unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::UnknownField);
        let err = check("Credential", "{user: admin}").unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::MissingRequiredField);
    }

    #[test]
    fn unresolved_datatypes_are_tolerated() {
        assert!(check("example.Unknown", "{anything: 1}").is_ok());
    }

    #[test]
    fn list_entries_follow_entry_schema() {
        let registry = TypeRegistry::default();
        let schema = Schema::from_value(
            "ports",
            &serde_yaml::from_str("{type: list, entry_schema: {type: integer}}").unwrap(),
        )
        .unwrap();
        assert!(validate_schema_value(&schema, &serde_yaml::from_str("[1, 2]").unwrap(), &registry).is_ok());
        assert!(validate_schema_value(&schema, &serde_yaml::from_str("[1, x]").unwrap(), &registry).is_err());
    }
}
