//! Custom type resolution across a document and its imports.
//!
//! Imported definitions are merged first-seen-wins among sibling imports, then
//! the importing document's own definitions are laid over them. Imported
//! documents that carry a topology are remembered for nested resolution.

use std::collections::HashMap;

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::diagnostics::{Collector, Scope};
use crate::error::Issue;
use crate::parse::{DocumentLoader, DocumentLocation, display_value, imports::parse_imports};
use crate::types::{TypeDefinition, TypeSection};

/// An imported document that declares a `topology_template`.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedDocument {
    pub location: DocumentLocation,
    pub document: Value,
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub types: HashMap<String, TypeDefinition>,
    /// In discovery order, one entry per location.
    pub nested: Vec<NestedDocument>,
}

pub struct TypeResolver<'a> {
    loader: &'a dyn DocumentLoader,
    sections: Vec<TypeSection>,
    nested: Vec<NestedDocument>,
    visiting: Vec<DocumentLocation>,
}

impl<'a> TypeResolver<'a> {
    /// `sections` lists the categories to collect; [`TypeSection::Imports`]
    /// in the list means imports are followed.
    pub fn new(loader: &'a dyn DocumentLoader, sections: &[TypeSection]) -> Self {
        TypeResolver {
            loader,
            sections: sections.to_vec(),
            nested: Vec::new(),
            visiting: Vec::new(),
        }
    }

    pub fn resolve(
        mut self,
        document: &Mapping,
        location: Option<&DocumentLocation>,
        collector: &mut Collector,
    ) -> Resolution {
        if let Some(location) = location {
            self.visiting.push(location.clone());
        }
        let types = self.resolve_document(document, location, collector);
        debug!(types = types.len(), nested = self.nested.len(), "resolved custom types");
        Resolution {
            types,
            nested: self.nested,
        }
    }

    fn resolve_document(
        &mut self,
        document: &Mapping,
        location: Option<&DocumentLocation>,
        collector: &mut Collector,
    ) -> HashMap<String, TypeDefinition> {
        let mut types = HashMap::new();
        if self.sections.contains(&TypeSection::Imports) {
            match document.get("imports") {
                None | Some(Value::Null) => {}
                Some(imports) => types = self.resolve_imports(imports, document, location, collector),
            }
        }

        // local definitions win over imported ones
        for section in &self.sections {
            if *section == TypeSection::Imports {
                continue;
            }
            let Some(entries) = document.get(section.key()).and_then(Value::as_mapping) else {
                continue;
            };
            for (name, body) in entries {
                let name = display_value(name);
                let body = match body {
                    Value::Mapping(body) => body.clone(),
                    Value::Null => Mapping::new(),
                    _ => {
                        collector.push(Issue::invalid_schema(format!(
                            "Type definition of \"{}\" must be a map.",
                            name
                        )));
                        continue;
                    }
                };
                types.insert(
                    name,
                    TypeDefinition {
                        section: *section,
                        body,
                    },
                );
            }
        }
        types
    }

    fn resolve_imports(
        &mut self,
        imports: &Value,
        document: &Mapping,
        base: Option<&DocumentLocation>,
        collector: &mut Collector,
    ) -> HashMap<String, TypeDefinition> {
        let repositories = document.get("repositories").and_then(Value::as_mapping);
        let mut merged: HashMap<String, TypeDefinition> = HashMap::new();

        for import in parse_imports(imports, collector) {
            let mut collector = collector.scoped(Scope::Import, import.label());
            let Some(location) = import.location(base, repositories, &mut collector) else {
                continue;
            };
            if self.visiting.contains(&location) {
                warn!(location = %location, "import cycle skipped");
                continue;
            }
            let Some(loaded) = self.loader.load(&location, &mut collector) else {
                continue;
            };
            let Some(sub_document) = loaded.as_mapping() else {
                collector.push(Issue::ImportFailure {
                    message: format!("Imported document \"{}\" is not a map.", location),
                });
                continue;
            };
            debug!(location = %location, "resolving imported document");

            if sub_document.contains_key("topology_template")
                && !self.nested.iter().any(|n| n.location == location)
            {
                self.nested.push(NestedDocument {
                    location: location.clone(),
                    document: loaded.clone(),
                });
            }

            self.visiting.push(location.clone());
            let imported = self.resolve_document(sub_document, Some(&location), &mut collector);
            self.visiting.pop();

            for (name, definition) in imported {
                let name = match &import.namespace_prefix {
                    Some(prefix) => format!("{}.{}", prefix, name),
                    None => name,
                };
                merged.entry(name).or_insert(definition);
            }
        }
        merged
    }
}
