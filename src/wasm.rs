//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::diagnostics::Diagnostic;
use crate::template::{ParserSettings, ToscaTemplate};

/// Validate a YAML template. `settings_json` carries [`ParserSettings`]; an
/// empty string means defaults. Imports are resolved from the filesystem
/// loader, so browser callers should inline their types.
/// Returns a JSON object tagged with `status`.
#[wasm_bindgen]
pub fn validate_template(yaml: &str, settings_json: &str) -> JsValue {
    let result = validate_template_inner(yaml, settings_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_template_inner(yaml: &str, settings_json: &str) -> ValidationResult {
    let settings = match ParserSettings::from_json(settings_json) {
        Ok(settings) => settings,
        Err(e) => {
            return ValidationResult::Invalid {
                message: format!("Failed to parse settings JSON: {}", e),
                diagnostics: Vec::new(),
            };
        }
    };

    match ToscaTemplate::builder().yaml(yaml).options(settings.into_options()).build() {
        Ok(template) => ValidationResult::Valid {
            version: template.version().map(str::to_string),
            node_templates: template
                .node_templates()
                .iter()
                .map(|node| NodeDto {
                    name: node.name.clone(),
                    type_name: node.type_name.clone(),
                })
                .collect(),
            has_substitution_mappings: template.has_substitution_mappings(),
        },
        Err(failure) => ValidationResult::Invalid {
            message: failure.message,
            diagnostics: failure.diagnostics.iter().map(DiagnosticDto::from).collect(),
        },
    }
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(serde::Serialize)]
struct DiagnosticDto {
    kind: String,
    message: String,
    context: Vec<String>,
}

impl From<&Diagnostic> for DiagnosticDto {
    fn from(diagnostic: &Diagnostic) -> Self {
        DiagnosticDto {
            kind: diagnostic.kind().name().to_string(),
            message: diagnostic.issue.to_string(),
            context: diagnostic.context.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

#[derive(serde::Serialize)]
struct NodeDto {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

#[derive(serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ValidationResult {
    Valid {
        version: Option<String>,
        node_templates: Vec<NodeDto>,
        has_substitution_mappings: bool,
    },
    Invalid {
        message: String,
        diagnostics: Vec<DiagnosticDto>,
    },
}
