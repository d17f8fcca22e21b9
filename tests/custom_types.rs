//! Integration tests for custom type resolution across imports.

mod helpers;

use tosca_parser::{DiagnosticKind, MemoryLoader, ToscaTemplate};

#[test]
fn imported_types_are_visible_to_the_importer() {
    let template = ToscaTemplate::builder()
        .path("types/a.yaml")
        .loader(helpers::types_loader())
        .build()
        .expect("template should validate");

    let registry = template.registry();
    assert!(registry.contains("example.nodes.Service"));
    assert!(registry.contains("example.nodes.Base"));
    assert!(registry.contains("example.datatypes.Endpoint"));
    assert_eq!(registry.custom_types().len(), 3);

    let api = template.node_template("api").expect("api node template");
    let entity = api.entity_type(registry).expect("resolved type");
    let names: Vec<String> = entity.properties_def().into_iter().map(|p| p.name).collect();
    assert!(names.contains(&"label".to_string()));
    assert!(names.contains(&"endpoint".to_string()));
}

#[test]
fn imported_data_types_validate_property_values() {
    let loader = helpers::types_loader().with(
        "bad.yaml",
        r#"
tosca_definitions_version: tosca_simple_yaml_1_0
imports:
  - types/b.yaml
topology_template:
  node_templates:
    api:
      type: example.nodes.Base
      properties:
        label: 7
"#,
    );
    let error = ToscaTemplate::builder().path("bad.yaml").loader(loader).build().unwrap_err();
    insta::assert_snapshot!(helpers::rendered(&error), @r#"[node_template: api] InvalidValueError: "7" is not a string."#);
}

#[test]
fn local_definition_overrides_imported_one() {
    let loader = MemoryLoader::new().with(
        "base.yaml",
        "node_types:\n  example.nodes.Base:\n    derived_from: tosca.nodes.Root\n    properties:\n      label: {type: string}\n",
    );
    let template = helpers::template(
        r#"
imports:
  - base.yaml
node_types:
  example.nodes.Base:
    derived_from: tosca.nodes.Root
topology_template:
  node_templates:
    thing:
      type: example.nodes.Base
"#,
    )
    .loader(loader)
    .build()
    .expect("local definition has no required label");
    assert!(template.registry().custom("example.nodes.Base").is_some());
}

#[test]
fn namespace_prefix_applies_to_imported_names() {
    let template = helpers::template(
        r#"
imports:
  - shared:
      file: types/b.yaml
      namespace_prefix: shared
topology_template:
  node_templates:
    thing:
      type: shared.example.nodes.Base
"#,
    )
    .loader(helpers::types_loader())
    .build()
    .expect("prefixed type should resolve");
    assert!(template.registry().contains("shared.example.nodes.Base"));
    assert!(!template.registry().contains("example.nodes.Base"));
}

#[test]
fn missing_import_is_reported_in_context() {
    let error = helpers::build_err("imports:\n  - nowhere.yaml\n");
    assert!(error.has_kind(DiagnosticKind::IoFailure));
    assert!(helpers::rendered(&error).starts_with("[import: nowhere.yaml] IOError: "));
}

#[test]
fn unknown_node_type_is_invalid() {
    let error = helpers::build_err(
        r#"
topology_template:
  node_templates:
    thing:
      type: example.nodes.Missing
"#,
    );
    insta::assert_snapshot!(helpers::rendered(&error), @r#"[node_template: thing] InvalidTypeError: Type "example.nodes.Missing" is not a valid type."#);
}
