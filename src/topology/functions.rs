//! Intrinsic function detection and `get_input` resolution.

use std::collections::BTreeMap;

use serde_yaml::Value;

use super::parameters::Input;

pub const GET_INPUT: &str = "get_input";

pub const FUNCTION_NAMES: [&str; 7] = [
    GET_INPUT,
    "get_property",
    "get_attribute",
    "get_operation_output",
    "get_artifact",
    "concat",
    "token",
];

/// A single-key mapping whose key names an intrinsic function.
pub fn is_function(value: &Value) -> bool {
    function_name(value).is_some()
}

pub fn function_name(value: &Value) -> Option<&str> {
    let map = value.as_mapping().filter(|m| m.len() == 1)?;
    let (key, _) = map.iter().next()?;
    key.as_str().filter(|name| FUNCTION_NAMES.contains(name))
}

/// The input referenced by `{get_input: name}` or `{get_input: [name, ...]}`.
pub fn get_input_target(value: &Value) -> Option<&str> {
    if function_name(value) != Some(GET_INPUT) {
        return None;
    }
    match value.get(GET_INPUT)? {
        Value::String(name) => Some(name),
        Value::Sequence(args) => args.first().and_then(Value::as_str),
        _ => None,
    }
}

/// Resolve a `get_input` call against the supplied parameters, then the
/// input's default. `None` for other functions and unresolvable inputs.
pub fn resolve_get_input(
    value: &Value,
    params: &BTreeMap<String, Value>,
    inputs: &[Input],
) -> Option<Value> {
    let name = get_input_target(value)?;
    params.get(name).cloned().or_else(|| {
        inputs
            .iter()
            .find(|input| input.name == name)
            .and_then(|input| input.default().cloned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    #[test]
    fn detects_single_key_function_calls() {
        assert!(is_function(&yaml("{get_attribute: [SELF, ip]}")));
        assert!(!is_function(&yaml("{get_input: a, extra: b}")));
        assert!(!is_function(&yaml("{size: 10}")));
    }

    #[test]
    fn get_input_prefers_params_over_defaults() {
        let value = yaml("{get_input: port}");
        let mut params = BTreeMap::new();
        assert_eq!(resolve_get_input(&value, &params, &[]), None);

        params.insert("port".to_string(), Value::from(8080));
        assert_eq!(resolve_get_input(&value, &params, &[]), Some(Value::from(8080)));
        assert_eq!(get_input_target(&yaml("{get_input: [port, 0]}")), Some("port"));
    }
}
