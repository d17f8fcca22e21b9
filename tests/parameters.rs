//! Integration tests for topology inputs and outputs.

mod helpers;

use serde_yaml::Value;
use tosca_parser::DiagnosticKind;

const SIZED: &str = r#"
topology_template:
  inputs:
    storage_size:
      type: scalar-unit.size
      default: 2 GB
      constraints:
        - greater_or_equal: 1 GB
    replicas:
      type: integer
      constraints:
        - in_range: [1, 5]
    mode:
      type: string
      required: false
      constraints:
        - valid_values: [active, standby]
  node_templates:
    volume:
      type: tosca.nodes.BlockStorage
      properties:
        size: { get_input: storage_size }
  outputs:
    volume_id:
      description: Identifier of the created volume.
      value: { get_attribute: [volume, volume_id] }
"#;

#[test]
fn params_satisfy_required_inputs() {
    let template = helpers::template(SIZED)
        .param("replicas", 3)
        .param("mode", "standby")
        .build()
        .expect("template should validate");
    let inputs = template.inputs();
    assert_eq!(inputs.len(), 3);
    assert_eq!(inputs[0].type_name(), "scalar-unit.size");
    assert_eq!(inputs[0].default().and_then(Value::as_str), Some("2 GB"));
    assert!(!inputs[2].required());
    assert_eq!(template.topology().params().len(), 2);

    let output = &template.outputs()[0];
    assert_eq!(output.description(), Some("Identifier of the created volume."));
    assert!(output.value().is_some());
}

#[test]
fn missing_required_param_is_reported() {
    let error = helpers::template(SIZED).build().unwrap_err();
    assert_eq!(helpers::kinds(&error), vec!["MissingRequiredParameterError"]);
}

#[test]
fn param_values_are_checked_against_constraints() {
    let error = helpers::template(SIZED)
        .param("replicas", 9)
        .param("mode", "paused")
        .build()
        .unwrap_err();
    insta::assert_snapshot!(helpers::rendered(&error), @r#"
    [input: replicas] InvalidValueError: The value "9" of property "replicas" is out of range "(min:1, max:5)".
    [input: mode] InvalidValueError: The value "paused" of property "mode" is not valid. Expected a value from "[active, standby]".
    "#);
}

#[test]
fn param_type_mismatch() {
    let error = helpers::template(SIZED).param("replicas", "three").build().unwrap_err();
    assert_eq!(error.count_kind(DiagnosticKind::InvalidValue), 1);
    assert!(error.diagnostics[0].to_string().starts_with("[input: replicas] "));
}

#[test]
fn defaults_are_validated_too() {
    let error = helpers::build_err(
        r#"
topology_template:
  inputs:
    storage_size:
      type: scalar-unit.size
      default: 512 MB
      constraints:
        - greater_or_equal: 1 GB
"#,
    );
    assert_eq!(error.count_kind(DiagnosticKind::InvalidValue), 1);
}

#[test]
fn input_definition_problems() {
    let error = helpers::build_err(
        r#"
topology_template:
  inputs:
    untyped:
      default: 1
    odd:
      type: colour
      default: red
    chatty:
      type: string
      default: hi
      colour: blue
"#,
    );
    insta::assert_json_snapshot!(helpers::kinds(&error), @r#"
    [
      "InvalidSchemaError",
      "InvalidTypeError",
      "UnknownFieldError"
    ]
    "#);
    assert!(helpers::rendered(&error).contains("[input: chatty] UnknownFieldError: Input \"chatty\" contains unknown field \"colour\"."));
}

#[test]
fn output_without_value() {
    let error = helpers::build_err(
        r#"
topology_template:
  outputs:
    address:
      description: nothing here
      colour: red
"#,
    );
    insta::assert_snapshot!(helpers::rendered(&error), @r#"
    [output: address] MissingRequiredFieldError: Output "address" is missing required field "value".
    [output: address] UnknownFieldError: Output "address" contains unknown field "colour". Refer to the definition to verify valid values.
    "#);
}
