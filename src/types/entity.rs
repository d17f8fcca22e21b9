//! Read-only view over one type definition and its `derived_from` chain.

use std::collections::HashSet;

use serde_yaml::{Mapping, Value};
use tracing::warn;

use super::schema::Schema;
use super::{TypeRegistry, is_property_type};
use crate::parse::{display_value, str_field};

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub schema: Schema,
}

impl PropertyDef {
    pub fn required(&self) -> bool {
        self.schema.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.schema.default.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct EntityType<'r> {
    name: String,
    definition: &'r Mapping,
    registry: &'r TypeRegistry,
}

impl<'r> EntityType<'r> {
    pub fn new(name: &str, registry: &'r TypeRegistry) -> Option<Self> {
        registry.definition(name).map(|definition| EntityType {
            name: name.to_string(),
            definition,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &'r Mapping {
        self.definition
    }

    pub fn derived_from(&self) -> Option<&'r str> {
        str_field(self.definition, "derived_from")
    }

    pub fn parent(&self) -> Option<EntityType<'r>> {
        self.derived_from()
            .and_then(|parent| EntityType::new(parent, self.registry))
    }

    /// This type followed by its ancestors. Stops at a repeated name.
    pub fn chain(&self) -> Vec<EntityType<'r>> {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(entity) = current {
            if !seen.insert(entity.name.clone()) {
                warn!(type_name = %entity.name, "derived_from cycle");
                break;
            }
            current = entity.parent();
            chain.push(entity);
        }
        chain
    }

    pub fn is_derived_from(&self, name: &str) -> bool {
        self.chain().iter().any(|entity| entity.name == name)
    }

    /// The scalar type this data type ultimately derives from, if any
    /// (`derived_from: integer` and the like).
    pub fn scalar_base(&self) -> Option<&'r str> {
        self.chain()
            .last()
            .and_then(|root| root.derived_from())
            .filter(|base| is_property_type(base))
    }

    /// Property definitions merged along the chain; a child's definition
    /// replaces its ancestor's in place.
    pub fn properties_def(&self) -> Vec<PropertyDef> {
        let mut merged: Vec<PropertyDef> = Vec::new();
        for entity in self.chain().iter().rev() {
            let Some(properties) = entity.section("properties") else {
                continue;
            };
            for (name, body) in properties {
                let name = display_value(name);
                let schema = match Schema::from_value(&name, body) {
                    Ok(schema) => schema,
                    Err(issue) => {
                        warn!(type_name = %entity.name, property = %name, %issue, "skipping malformed property definition");
                        continue;
                    }
                };
                match merged.iter_mut().find(|p| p.name == name) {
                    Some(existing) => existing.schema = schema,
                    None => merged.push(PropertyDef { name, schema }),
                }
            }
        }
        merged
    }

    pub fn property_def(&self, name: &str) -> Option<PropertyDef> {
        self.properties_def().into_iter().find(|p| p.name == name)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.merged_keys("attributes")
    }

    pub fn capability_names(&self) -> Vec<String> {
        self.merged_keys("capabilities")
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.merged_keys("interfaces")
    }

    /// Requirement names; requirement definitions are a sequence of single-key maps.
    pub fn requirement_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entity in self.chain().iter().rev() {
            let Some(Value::Sequence(requirements)) = entity.definition.get("requirements") else {
                continue;
            };
            for requirement in requirements {
                let Some(map) = requirement.as_mapping() else {
                    continue;
                };
                for key in map.keys() {
                    let name = display_value(key);
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    /// Constraints declared directly on data types along the chain, root first.
    pub fn constraints(&self) -> Vec<Value> {
        self.chain()
            .iter()
            .rev()
            .filter_map(|entity| entity.definition.get("constraints"))
            .filter_map(Value::as_sequence)
            .flatten()
            .cloned()
            .collect()
    }

    fn section(&self, key: &str) -> Option<&'r Mapping> {
        self.definition.get(key).and_then(Value::as_mapping)
    }

    fn merged_keys(&self, key: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entity in self.chain().iter().rev() {
            let Some(section) = entity.section(key) else {
                continue;
            };
            for name in section.keys() {
                let name = display_value(name);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::{Profile, TypeDefinition, TypeSection};

    fn registry() -> TypeRegistry {
        let defs: Mapping = serde_yaml::from_str(
            r#"
example.Server:
  derived_from: tosca.nodes.Compute
  properties:
    flavor: {type: string}
    replicas: {type: integer, default: 1}
  attributes:
    ip_address: {type: string}
example.Loop:
  derived_from: example.Loop
"#,
        )
        .unwrap();
        let custom: HashMap<String, TypeDefinition> = defs
            .into_iter()
            .map(|(k, v)| {
                (
                    display_value(&k),
                    TypeDefinition {
                        section: TypeSection::NodeTypes,
                        body: v.as_mapping().cloned().unwrap_or_default(),
                    },
                )
            })
            .collect();
        TypeRegistry::new(Profile::Simple, custom)
    }

    #[test]
    fn inherits_attributes_and_capabilities() {
        let registry = registry();
        let server = registry.node_type("example.Server").unwrap();
        let attributes = server.attribute_names();
        for expected in ["tosca_id", "tosca_name", "state", "private_address", "ip_address"] {
            assert!(attributes.contains(&expected.to_string()), "missing {expected}");
        }
        assert!(server.capability_names().contains(&"host".to_string()));
        assert!(server.requirement_names().contains(&"local_storage".to_string()));
        assert!(server.is_derived_from("tosca.nodes.Root"));
    }

    #[test]
    fn properties_carry_defaults_and_required_flags() {
        let registry = registry();
        let server = registry.node_type("example.Server").unwrap();
        let replicas = server.property_def("replicas").unwrap();
        assert!(replicas.required());
        assert_eq!(replicas.default().and_then(Value::as_i64), Some(1));
    }

    #[test]
    fn derived_from_cycles_terminate() {
        let registry = registry();
        let looped = registry.node_type("example.Loop").unwrap();
        assert_eq!(looped.chain().len(), 1);
    }

    #[test]
    fn port_def_has_integer_base() {
        let registry = registry();
        let port = registry.datatype_for("PortDef").unwrap();
        assert_eq!(port.scalar_base(), Some("integer"));
        assert_eq!(port.constraints().len(), 1);
    }
}
