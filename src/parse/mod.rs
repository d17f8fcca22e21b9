//! Parse phase: document locations, loading, and import declarations.
//!
//! Documents stay `serde_yaml::Value` trees only at this boundary; the rest of
//! the crate converts them into typed entities as soon as it reads them.

pub mod imports;
pub mod loader;
pub mod location;

pub use imports::ImportDefinition;
pub use loader::{ArchiveHandler, DocumentLoader, FsLoader, MemoryLoader};
pub use location::DocumentLocation;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::diagnostics::Collector;
use crate::error::Issue;

/// Parse an in-memory YAML document.
pub fn parse_str(source: &str) -> Result<Value, Issue> {
    match serde_yaml::from_str::<Value>(source) {
        Ok(Value::Null) => Ok(Value::Mapping(Mapping::new())),
        Ok(value) => Ok(value),
        Err(e) => Err(Issue::ParseFailure {
            path: "pre-parsed input".into(),
            reason: e.to_string(),
        }),
    }
}

/// Classify a template path: YAML documents load directly, archives go through
/// the archive handler, anything else is rejected.
pub fn resolve_template_path(
    path: &str,
    archive: Option<&dyn ArchiveHandler>,
    collector: &mut Collector,
) -> Option<DocumentLocation> {
    let lower = path.to_lowercase();
    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        return Some(DocumentLocation::parse(path));
    }
    if lower.ends_with(".zip") || lower.ends_with(".csar") {
        debug!(path, "template path names an archive");
        return match archive {
            Some(handler) => handler.main_template(path, collector),
            None => {
                collector.push(Issue::InvalidPath { path: path.into() });
                None
            }
        };
    }
    collector.push(Issue::InvalidPath { path: path.into() });
    None
}

/// Read a string field out of a mapping, ignoring non-string values.
pub(crate) fn str_field<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// Render a value for messages; non-strings fall back to their YAML form.
pub(crate) fn display_value(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
