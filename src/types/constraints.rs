//! Property constraint clauses (`greater_than`, `in_range`, `pattern`, ...).

use std::cmp::Ordering;

use regex::Regex;
use serde_yaml::Value;

use super::datatype::scalar_to_base;
use crate::error::Issue;
use crate::parse::display_value;

/// Upper bound keyword accepted by `in_range`.
pub const UNBOUNDED: &str = "UNBOUNDED";

#[derive(Debug, Clone)]
pub enum Constraint {
    Equal(Value),
    GreaterThan(Value),
    GreaterOrEqual(Value),
    LessThan(Value),
    LessOrEqual(Value),
    InRange(Value, Value),
    ValidValues(Vec<Value>),
    Length(usize),
    MinLength(usize),
    MaxLength(usize),
    Pattern { source: String, regex: Regex },
}

impl Constraint {
    /// Parse one `{operator: argument}` clause.
    pub fn parse(prop_name: &str, clause: &Value) -> Result<Constraint, Issue> {
        let invalid = |detail: &str| {
            Issue::invalid_schema(format!(
                "Invalid constraint schema \"{}\" of property \"{}\": {}",
                display_value(clause),
                prop_name,
                detail
            ))
        };

        let Some(map) = clause.as_mapping().filter(|m| m.len() == 1) else {
            return Err(invalid("a constraint must be a single-key map"));
        };
        let Some((operator, argument)) = map.iter().next() else {
            return Err(invalid("a constraint must be a single-key map"));
        };
        let length = |argument: &Value| {
            argument
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| invalid("expected a non-negative integer"))
        };

        match operator.as_str().unwrap_or_default() {
            "equal" => Ok(Constraint::Equal(argument.clone())),
            "greater_than" => Ok(Constraint::GreaterThan(argument.clone())),
            "greater_or_equal" => Ok(Constraint::GreaterOrEqual(argument.clone())),
            "less_than" => Ok(Constraint::LessThan(argument.clone())),
            "less_or_equal" => Ok(Constraint::LessOrEqual(argument.clone())),
            "in_range" => match argument.as_sequence().map(Vec::as_slice) {
                Some([lower, upper]) => Ok(Constraint::InRange(lower.clone(), upper.clone())),
                _ => Err(invalid("in_range expects a list of two values")),
            },
            "valid_values" => match argument.as_sequence() {
                Some(values) => Ok(Constraint::ValidValues(values.clone())),
                None => Err(invalid("valid_values expects a list")),
            },
            "length" => Ok(Constraint::Length(length(argument)?)),
            "min_length" => Ok(Constraint::MinLength(length(argument)?)),
            "max_length" => Ok(Constraint::MaxLength(length(argument)?)),
            "pattern" => {
                let Some(source) = argument.as_str() else {
                    return Err(invalid("pattern expects a string"));
                };
                // patterns must match the whole value
                let regex = Regex::new(&format!("^(?:{})$", source))
                    .map_err(|e| invalid(&e.to_string()))?;
                Ok(Constraint::Pattern {
                    source: source.to_string(),
                    regex,
                })
            }
            other => Err(invalid(&format!("unknown operator \"{}\"", other))),
        }
    }

    pub fn validate(&self, prop_name: &str, type_name: &str, value: &Value) -> Result<(), Issue> {
        let shown = display_value(value);
        let fail = |message: String| Err(Issue::invalid_value(message));
        let cmp = |bound: &Value| compare(type_name, value, bound);

        match self {
            Constraint::Equal(expected) => {
                if cmp(expected) != Some(Ordering::Equal) {
                    return fail(format!(
                        "The value \"{}\" of property \"{}\" is not equal to \"{}\".",
                        shown,
                        prop_name,
                        display_value(expected)
                    ));
                }
            }
            Constraint::GreaterThan(bound) => {
                if cmp(bound) != Some(Ordering::Greater) {
                    return fail(format!(
                        "The value \"{}\" of property \"{}\" must be greater than \"{}\".",
                        shown,
                        prop_name,
                        display_value(bound)
                    ));
                }
            }
            Constraint::GreaterOrEqual(bound) => {
                if !matches!(cmp(bound), Some(Ordering::Greater | Ordering::Equal)) {
                    return fail(format!(
                        "The value \"{}\" of property \"{}\" must be greater than or equal to \"{}\".",
                        shown,
                        prop_name,
                        display_value(bound)
                    ));
                }
            }
            Constraint::LessThan(bound) => {
                if cmp(bound) != Some(Ordering::Less) {
                    return fail(format!(
                        "The value \"{}\" of property \"{}\" must be less than \"{}\".",
                        shown,
                        prop_name,
                        display_value(bound)
                    ));
                }
            }
            Constraint::LessOrEqual(bound) => {
                if !matches!(cmp(bound), Some(Ordering::Less | Ordering::Equal)) {
                    return fail(format!(
                        "The value \"{}\" of property \"{}\" must be less than or equal to \"{}\".",
                        shown,
                        prop_name,
                        display_value(bound)
                    ));
                }
            }
            Constraint::InRange(lower, upper) => {
                let within = |v: &Value| {
                    let above = matches!(
                        compare(type_name, v, lower),
                        Some(Ordering::Greater | Ordering::Equal)
                    );
                    let below = upper.as_str() == Some(UNBOUNDED)
                        || matches!(
                            compare(type_name, v, upper),
                            Some(Ordering::Less | Ordering::Equal)
                        );
                    above && below
                };
                // a range value must lie entirely inside the bounds
                let ok = match value {
                    Value::Sequence(ends) => ends
                        .iter()
                        .filter(|end| end.as_str() != Some(UNBOUNDED))
                        .all(within),
                    other => within(other),
                };
                if !ok {
                    return fail(format!(
                        "The value \"{}\" of property \"{}\" is out of range \"(min:{}, max:{})\".",
                        shown,
                        prop_name,
                        display_value(lower),
                        display_value(upper)
                    ));
                }
            }
            Constraint::ValidValues(values) => {
                if !values.iter().any(|v| cmp(v) == Some(Ordering::Equal)) {
                    let expected: Vec<String> = values.iter().map(display_value).collect();
                    return fail(format!(
                        "The value \"{}\" of property \"{}\" is not valid. Expected a value from \"[{}]\".",
                        shown,
                        prop_name,
                        expected.join(", ")
                    ));
                }
            }
            Constraint::Length(expected) => {
                if length_of(value) != Some(*expected) {
                    return fail(format!(
                        "Length of value \"{}\" of property \"{}\" must be equal to \"{}\".",
                        shown, prop_name, expected
                    ));
                }
            }
            Constraint::MinLength(min) => {
                if !length_of(value).is_some_and(|len| len >= *min) {
                    return fail(format!(
                        "Length of value \"{}\" of property \"{}\" must be at least \"{}\".",
                        shown, prop_name, min
                    ));
                }
            }
            Constraint::MaxLength(max) => {
                if !length_of(value).is_some_and(|len| len <= *max) {
                    return fail(format!(
                        "Length of value \"{}\" of property \"{}\" must be no greater than \"{}\".",
                        shown, prop_name, max
                    ));
                }
            }
            Constraint::Pattern { source, regex } => {
                if !value.as_str().is_some_and(|s| regex.is_match(s)) {
                    return fail(format!(
                        "The value \"{}\" of property \"{}\" does not match pattern \"{}\".",
                        shown, prop_name, source
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// Order `value` against `bound`. Scalar units compare in their base unit,
/// numbers numerically, everything else by its rendered form.
fn compare(type_name: &str, value: &Value, bound: &Value) -> Option<Ordering> {
    if type_name.starts_with("scalar-unit.") {
        let value = scalar_to_base(type_name, value.as_str()?)?;
        let bound = scalar_to_base(type_name, bound.as_str()?)?;
        return value.partial_cmp(&bound);
    }
    match (value.as_f64(), bound.as_f64()) {
        (Some(value), Some(bound)) => value.partial_cmp(&bound),
        (None, None) => Some(display_value(value).cmp(&display_value(bound))),
        _ => None,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Sequence(items) => Some(items.len()),
        Value::Mapping(map) => Some(map.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(yaml: &str) -> Constraint {
        Constraint::parse("prop", &serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    fn check(c: &Constraint, type_name: &str, yaml: &str) -> Result<(), Issue> {
        c.validate("prop", type_name, &serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn numeric_bounds() {
        let c = constraint("{greater_or_equal: 2}");
        assert!(check(&c, "integer", "2").is_ok());
        let err = check(&c, "integer", "1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The value \"1\" of property \"prop\" must be greater than or equal to \"2\"."
        );
    }

    #[test]
    fn in_range_accepts_unbounded_upper() {
        let c = constraint("{in_range: [1, UNBOUNDED]}");
        assert!(check(&c, "integer", "100000").is_ok());
        assert!(check(&c, "integer", "0").is_err());
    }

    #[test]
    fn scalar_units_compare_in_base_units() {
        let c = constraint("{greater_than: 512 MB}");
        assert!(check(&c, "scalar-unit.size", "1 GB").is_ok());
        assert!(check(&c, "scalar-unit.size", "100 kB").is_err());
    }

    #[test]
    fn lengths_and_patterns() {
        assert!(check(&constraint("{min_length: 2}"), "string", "ab").is_ok());
        assert!(check(&constraint("{max_length: 1}"), "list", "[1, 2]").is_err());
        let pattern = constraint("{pattern: '[a-z]+'}");
        assert!(check(&pattern, "string", "abc").is_ok());
        assert!(check(&pattern, "string", "abc1").is_err());
    }

    #[test]
    fn valid_values_lists_choices() {
        let err = check(&constraint("{valid_values: [a, b]}"), "string", "c").unwrap_err();
        assert!(err.to_string().ends_with("Expected a value from \"[a, b]\"."));
    }

    #[test]
    fn malformed_clauses_are_schema_errors() {
        for yaml in ["{between: [1, 2]}", "{in_range: 3}", "[1]", "{min_length: -1}"] {
            let err = Constraint::parse("prop", &serde_yaml::from_str(yaml).unwrap()).unwrap_err();
            assert_eq!(err.kind(), crate::error::DiagnosticKind::InvalidSchema, "{yaml}");
        }
    }
}
