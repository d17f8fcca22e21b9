//! Lenient mode: fragments that expect their values from elsewhere.

mod helpers;

use tosca_parser::{DiagnosticKind, ParserSettings, ToscaTemplate};

fn fragment() -> tosca_parser::TemplateBuilder {
    ToscaTemplate::builder()
        .path("fragment.yaml")
        .loader(helpers::fragment_loader())
}

#[test]
fn strict_mode_rejects_missing_parameter() {
    let error = fragment().build().unwrap_err();
    assert_eq!(error.input.as_deref(), Some("fragment.yaml"));
    assert_eq!(helpers::kinds(&error), vec!["MissingRequiredParameterError"]);
}

#[test]
fn lenient_mode_accepts_the_fragment() {
    let template = fragment().lenient(true).build().expect("lenient validation");
    assert_eq!(template.inputs().len(), 2);
    assert_eq!(template.node_templates().len(), 2);
}

#[test]
fn supplied_parameter_satisfies_strict_mode() {
    fragment().param("db_name", "orders").build().expect("strict validation");
}

#[test]
fn lenient_mode_keeps_other_errors() {
    let error = fragment()
        .lenient(true)
        .param("db_port", 1234)
        .build()
        .unwrap_err();
    assert_eq!(error.diagnostics.len(), 1);
    assert!(error.has_kind(DiagnosticKind::InvalidValue));
    assert!(!error.has_kind(DiagnosticKind::MissingRequiredParameter));
}

const QUEUE_MAPPING: &str = r#"
node_types:
  example.nodes.Queue:
    derived_from: tosca.nodes.Root
    properties:
      depth: {type: integer}
    attributes:
      address: {type: string}
topology_template:
  inputs:
    region: {type: string}
  substitution_mappings:
    node_type: example.nodes.Queue
"#;

#[test]
fn strict_mode_reports_missing_mapping_values() {
    let error = helpers::template(QUEUE_MAPPING).build().unwrap_err();
    assert!(error.has_kind(DiagnosticKind::MissingRequiredInput));
    assert!(error.has_kind(DiagnosticKind::MissingRequiredParameter));
}

#[test]
fn lenient_mode_drops_missing_mapping_values() {
    let template = helpers::template(QUEUE_MAPPING).lenient(true).build();
    assert!(template.is_ok(), "{:?}", template.err().map(|e| e.message));
}

#[test]
fn settings_json_drive_leniency() {
    let options = ParserSettings::from_json(r#"{"lenient": true, "params": {"db_port": 3306}}"#)
        .expect("settings")
        .into_options();
    let template = ToscaTemplate::builder()
        .path("fragment.yaml")
        .options(options)
        .loader(helpers::fragment_loader())
        .build()
        .expect("lenient validation");
    assert_eq!(template.topology().params().len(), 1);
}
