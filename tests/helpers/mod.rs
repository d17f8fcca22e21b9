#![allow(dead_code)]

use tosca_parser::{MemoryLoader, TemplateBuilder, ToscaTemplate, ValidationError};

pub const VERSION: &str = "tosca_definitions_version: tosca_simple_yaml_1_0\n";

// =============================================================================
// Loaders over the fixture documents
// =============================================================================

pub fn nested_loader() -> MemoryLoader {
    MemoryLoader::new()
        .with("nested/main.yaml", include_str!("../fixtures/nested/main.yaml"))
        .with("nested/app.yaml", include_str!("../fixtures/nested/app.yaml"))
}

pub fn types_loader() -> MemoryLoader {
    MemoryLoader::new()
        .with("types/a.yaml", include_str!("../fixtures/types/a.yaml"))
        .with("types/b.yaml", include_str!("../fixtures/types/b.yaml"))
}

pub fn fragment_loader() -> MemoryLoader {
    MemoryLoader::new().with("fragment.yaml", include_str!("../fixtures/fragment.yaml"))
}

// =============================================================================
// Template builders
// =============================================================================

/// A builder over `body` prefixed with the 1.0 version line. The document sits
/// at `main.yaml` and imports resolve against an empty in-memory loader.
pub fn template(body: &str) -> TemplateBuilder {
    ToscaTemplate::builder()
        .yaml(&format!("{}{}", VERSION, body))
        .document_location("main.yaml")
        .loader(MemoryLoader::new())
}

pub fn build(body: &str) -> Result<ToscaTemplate, ValidationError> {
    template(body).build()
}

pub fn build_err(body: &str) -> ValidationError {
    match build(body) {
        Ok(_) => panic!("template should fail validation"),
        Err(e) => e,
    }
}

// =============================================================================
// Report rendering
// =============================================================================

/// One diagnostic per line, context tags included.
pub fn rendered(error: &ValidationError) -> String {
    error
        .diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn kinds(error: &ValidationError) -> Vec<&'static str> {
    error.diagnostics.iter().map(|d| d.kind().name()).collect()
}
