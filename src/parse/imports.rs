//! Import declarations.
//!
//! Accepted forms, per entry of the `imports` sequence:
//! - `"path/to/file.yaml"`
//! - `{name: "path/to/file.yaml"}`
//! - `{name: {file: ..., repository: ..., namespace_uri: ..., namespace_prefix: ...}}`
//! - `{file: ..., repository: ..., namespace_prefix: ...}`

use std::collections::HashSet;

use serde_yaml::{Mapping, Value};

use super::location::DocumentLocation;
use super::{display_value, str_field};
use crate::diagnostics::Collector;
use crate::error::Issue;

const IMPORT_KEYS: [&str; 4] = ["file", "repository", "namespace_uri", "namespace_prefix"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDefinition {
    pub name: Option<String>,
    pub file: String,
    pub repository: Option<String>,
    pub namespace_uri: Option<String>,
    pub namespace_prefix: Option<String>,
}

impl ImportDefinition {
    fn simple(name: Option<String>, file: &str) -> Self {
        ImportDefinition {
            name,
            file: file.to_string(),
            repository: None,
            namespace_uri: None,
            namespace_prefix: None,
        }
    }

    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.file.clone())
    }

    /// Where the imported document lives, relative to the importing document.
    pub fn location(
        &self,
        base: Option<&DocumentLocation>,
        repositories: Option<&Mapping>,
        collector: &mut Collector,
    ) -> Option<DocumentLocation> {
        if let Some(repository) = &self.repository {
            let url = repositories
                .and_then(|repos| repos.get(repository.as_str()))
                .and_then(|repo| match repo {
                    Value::String(url) => Some(url.as_str()),
                    Value::Mapping(def) => str_field(def, "url"),
                    _ => None,
                });
            let Some(url) = url else {
                collector.push(Issue::ImportFailure {
                    message: format!(
                        "Repository \"{}\" of import \"{}\" is not found in \"repositories\".",
                        repository,
                        self.label()
                    ),
                });
                return None;
            };
            let full = format!(
                "{}/{}",
                url.trim_end_matches('/'),
                self.file.trim_start_matches('/')
            );
            return Some(DocumentLocation::parse(&full));
        }

        match base {
            Some(base) => Some(base.join(&self.file)),
            None => {
                let location = DocumentLocation::parse(&self.file);
                if location.is_local() && !std::path::Path::new(&self.file).is_absolute() {
                    collector.push(Issue::ImportFailure {
                        message: format!(
                            "Relative import \"{}\" cannot be resolved from a pre-parsed document.",
                            self.file
                        ),
                    });
                    return None;
                }
                Some(location)
            }
        }
    }
}

/// Read the `imports` section. Malformed entries are reported and skipped.
pub fn parse_imports(imports: &Value, collector: &mut Collector) -> Vec<ImportDefinition> {
    let entries = match imports {
        Value::Sequence(entries) => entries,
        _ => {
            collector.push(Issue::ImportFailure {
                message: "\"imports\" keyname is defined without including templates.".into(),
            });
            return Vec::new();
        }
    };

    let mut names = HashSet::new();
    let mut definitions = Vec::new();
    for entry in entries {
        match entry {
            Value::String(file) => definitions.push(ImportDefinition::simple(None, file)),
            Value::Mapping(map) if map.contains_key("file") => {
                if let Some(def) = parse_import_body(None, map, collector) {
                    definitions.push(def);
                }
            }
            Value::Mapping(map) => {
                for (key, body) in map {
                    let name = display_value(key);
                    if !names.insert(name.clone()) {
                        collector.push(Issue::ImportFailure {
                            message: format!("Duplicate import name \"{}\" was found.", name),
                        });
                        continue;
                    }
                    match body {
                        Value::String(file) => {
                            definitions.push(ImportDefinition::simple(Some(name), file))
                        }
                        Value::Mapping(body) => {
                            if let Some(def) = parse_import_body(Some(name), body, collector) {
                                definitions.push(def);
                            }
                        }
                        _ => collector.push(Issue::missing_field(
                            format!("Import of template \"{}\"", name),
                            "file",
                        )),
                    }
                }
            }
            other => collector.push(Issue::ImportFailure {
                message: format!("Import definition \"{}\" is not valid.", display_value(other)),
            }),
        }
    }
    definitions
}

fn parse_import_body(
    name: Option<String>,
    body: &Mapping,
    collector: &mut Collector,
) -> Option<ImportDefinition> {
    let what = format!(
        "Import of template \"{}\"",
        name.as_deref().or_else(|| str_field(body, "file")).unwrap_or("")
    );
    for key in body.keys() {
        let key = display_value(key);
        if !IMPORT_KEYS.contains(&key.as_str()) {
            collector.push(Issue::unknown_field(what.clone(), key));
        }
    }
    let Some(file) = str_field(body, "file") else {
        collector.push(Issue::missing_field(what, "file"));
        return None;
    };
    Some(ImportDefinition {
        name,
        file: file.to_string(),
        repository: str_field(body, "repository").map(str::to_string),
        namespace_uri: str_field(body, "namespace_uri").map(str::to_string),
        namespace_prefix: str_field(body, "namespace_prefix").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    fn imports(src: &str) -> (Vec<ImportDefinition>, Collector) {
        let value: Value = serde_yaml::from_str(src).unwrap();
        let mut collector = Collector::new();
        collector.start();
        let defs = parse_imports(&value, &mut collector);
        (defs, collector)
    }

    #[test]
    fn accepts_every_declaration_form() {
        let (defs, collector) = imports(
            r#"
- plain.yaml
- named: named.yaml
- detailed:
    file: detailed.yaml
    namespace_prefix: ext
- file: flat.yaml
  repository: community
"#,
        );
        assert!(!collector.has_errors(), "{:?}", collector.report());
        let files: Vec<&str> = defs.iter().map(|d| d.file.as_str()).collect();
        assert_eq!(files, ["plain.yaml", "named.yaml", "detailed.yaml", "flat.yaml"]);
        assert_eq!(defs[2].namespace_prefix.as_deref(), Some("ext"));
        assert_eq!(defs[3].repository.as_deref(), Some("community"));
    }

    #[test]
    fn reports_missing_file_and_unknown_keys() {
        let (defs, collector) = imports(
            r#"
- broken:
    repository: community
    colour: blue
"#,
        );
        assert!(defs.is_empty());
        assert_eq!(collector.count_kind(DiagnosticKind::UnknownField), 1);
        assert_eq!(collector.count_kind(DiagnosticKind::MissingRequiredField), 1);
    }

    #[test]
    fn non_sequence_imports_are_rejected() {
        let (defs, collector) = imports("just-a-file.yaml");
        assert!(defs.is_empty());
        assert_eq!(collector.count_kind(DiagnosticKind::ImportFailure), 1);
    }

    #[test]
    fn empty_import_list_declares_nothing() {
        let (defs, collector) = imports("[]");
        assert!(defs.is_empty());
        assert!(!collector.has_errors(), "{:?}", collector.report());
    }

    #[test]
    fn repository_imports_join_the_repository_url() {
        let repos: Mapping = serde_yaml::from_str("community: {url: 'https://example.com/tosca/'}").unwrap();
        let def = ImportDefinition {
            repository: Some("community".into()),
            ..ImportDefinition::simple(None, "types.yaml")
        };
        let mut collector = Collector::new();
        let location = def.location(None, Some(&repos), &mut collector).unwrap();
        assert_eq!(location.to_string(), "https://example.com/tosca/types.yaml");
    }
}
