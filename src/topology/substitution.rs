//! Substitution mappings: a topology template exported as the implementation
//! of a node type.
//!
//! Construction runs every check and reports through the collector; the
//! mapping's effective property set is built on first access and cached.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use super::node_template::NodeTemplate;
use super::parameters::{Input, Output};
use super::requirements::Requirements;
use crate::diagnostics::{Collector, Scope};
use crate::error::Issue;
use crate::parse::{display_value, str_field};
use crate::types::{EntityType, Schema, TypeRegistry};

pub const SECTIONS: [&str; 5] = ["node_type", "requirements", "capabilities", "properties", "interfaces"];

/// Node type attributes that never need a matching output.
pub const OPTIONAL_OUTPUTS: [&str; 3] = ["tosca_id", "tosca_name", "state"];

/// How capabilities assigned on the substituted node template are checked
/// against the mapping's declared capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCheck {
    /// Mismatches are logged, not reported.
    #[default]
    Lenient,
    /// Mismatches are reported as unknown fields.
    Strict,
}

/// A materialized property of the mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Value,
    pub schema: Schema,
}

#[derive(Debug)]
pub struct SubstitutionMapping {
    definition: Mapping,
    registry: Rc<TypeRegistry>,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    substituted: Option<NodeTemplate>,
    properties: OnceCell<Vec<Property>>,
}

impl SubstitutionMapping {
    pub fn new(
        definition: &Mapping,
        inputs: &[Input],
        outputs: &[Output],
        substituted: Option<&NodeTemplate>,
        registry: Rc<TypeRegistry>,
        capability_check: CapabilityCheck,
        collector: &mut Collector,
    ) -> SubstitutionMapping {
        let mapping = SubstitutionMapping {
            definition: definition.clone(),
            registry,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            substituted: substituted.cloned(),
            properties: OnceCell::new(),
        };
        let scope_name = mapping.node_type().unwrap_or("None").to_string();
        let mut collector = collector.scoped(Scope::SubstitutionMapping, scope_name);
        mapping.validate_keys(&mut collector);
        mapping.validate_type(&mut collector);
        mapping.validate_inputs(&mut collector);
        mapping.validate_capabilities(capability_check, &mut collector);
        mapping.validate_requirements(&mut collector);
        mapping.validate_outputs(&mut collector);
        mapping
    }

    /// The `node_type` of a `substitution_mappings` section, if it has one.
    pub fn node_type_of(definition: &Value) -> Option<&str> {
        definition.as_mapping().and_then(|m| str_field(m, "node_type"))
    }

    pub fn node_type(&self) -> Option<&str> {
        str_field(&self.definition, "node_type")
    }

    pub fn definition(&self) -> &Mapping {
        &self.definition
    }

    pub fn capabilities(&self) -> Option<&Value> {
        self.definition.get("capabilities")
    }

    pub fn requirements(&self) -> Option<&Value> {
        self.definition.get("requirements")
    }

    pub fn interfaces(&self) -> Option<&Value> {
        self.definition.get("interfaces")
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// The parent node template this mapping substitutes for.
    pub fn substituted_node(&self) -> Option<&NodeTemplate> {
        self.substituted.as_ref()
    }

    pub fn node_definition(&self) -> Option<EntityType<'_>> {
        self.node_type().and_then(|name| self.registry.node_type(name))
    }

    // ========================================================================
    // Materialized properties
    // ========================================================================

    pub fn get_properties_objects(&self) -> &[Property] {
        self.properties.get_or_init(|| self.create_properties())
    }

    pub fn get_properties(&self) -> BTreeMap<&str, &Property> {
        self.get_properties_objects()
            .iter()
            .map(|p| (p.name.as_str(), p))
            .collect()
    }

    pub fn get_property_value(&self, name: &str) -> Option<&Value> {
        self.get_properties_objects()
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Assigned properties the node type declares, then defaults for the
    /// declared ones left unassigned.
    fn create_properties(&self) -> Vec<Property> {
        let Some(node_definition) = self.node_definition() else {
            return Vec::new();
        };
        let declared = node_definition.properties_def();
        let assigned = self
            .definition
            .get("properties")
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default();

        let mut properties = Vec::new();
        for (name, value) in &assigned {
            let name = display_value(name);
            if let Some(definition) = declared.iter().find(|p| p.name == name) {
                properties.push(Property {
                    name,
                    value: value.clone(),
                    schema: definition.schema.clone(),
                });
            }
        }
        for definition in &declared {
            if assigned.contains_key(definition.name.as_str()) {
                continue;
            }
            if let Some(default) = definition.default() {
                properties.push(Property {
                    name: definition.name.clone(),
                    value: default.clone(),
                    schema: definition.schema.clone(),
                });
            }
        }
        debug!(node_type = ?self.node_type(), count = properties.len(), "materialized substitution properties");
        properties
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn what(&self) -> String {
        format!(
            "SubstitutionMappings with node_type {}",
            self.node_type().unwrap_or("None")
        )
    }

    fn validate_keys(&self, collector: &mut Collector) {
        for key in self.definition.keys() {
            let key = display_value(key);
            if !SECTIONS.contains(&key.as_str()) {
                collector.push(Issue::unknown_field("SubstitutionMappings", key));
            }
        }
    }

    /// The node type must be a custom type; builtin types cannot be substituted.
    fn validate_type(&self, collector: &mut Collector) {
        let node_type = self.node_type();
        if node_type.is_none() {
            collector.push(Issue::missing_field(
                "SubstitutionMappings used in topology_template",
                "node_type",
            ));
        }
        if !node_type.is_some_and(|name| self.registry.contains(name)) {
            collector.push(Issue::InvalidNodeType {
                what: node_type.unwrap_or("None").to_string(),
            });
        }
    }

    fn validate_inputs(&self, collector: &mut Collector) {
        let declared = self
            .node_definition()
            .map(|entity| entity.properties_def())
            .unwrap_or_default();
        let has_input = |name: &str| self.inputs.iter().any(|input| input.name == name);

        // required properties without a default need an input
        for property in &declared {
            if property.required() && property.default().is_none() && !has_input(&property.name) {
                collector.push(Issue::MissingRequiredInput {
                    what: self.what(),
                    input_name: property.name.clone(),
                });
            }
        }

        // optional properties customized on the substituted node need an input too
        if let Some(node) = &self.substituted {
            for name in node.properties().keys().map(display_value) {
                let optional = declared.iter().any(|p| p.name == name && !p.required());
                if optional && !has_input(&name) {
                    collector.push(Issue::MissingRequiredInput {
                        what: self.what(),
                        input_name: name,
                    });
                }
            }
        }

        // inputs that feed no property must carry a default
        for input in &self.inputs {
            let feeds_property = declared.iter().any(|p| p.name == input.name);
            if !feeds_property && input.default().is_none() {
                collector.push(Issue::MissingDefaultValue {
                    what: self.what(),
                    input_name: input.name.clone(),
                });
            }
        }
    }

    fn validate_capabilities(&self, check: CapabilityCheck, collector: &mut Collector) {
        let Some(node) = &self.substituted else {
            return;
        };
        let mapped: Vec<String> = self
            .capabilities()
            .and_then(Value::as_mapping)
            .map(|caps| caps.keys().map(display_value).collect())
            .unwrap_or_default();
        if mapped.is_empty() {
            return;
        }
        for capability in node.capabilities(&self.registry) {
            if mapped.contains(&capability) {
                continue;
            }
            match check {
                CapabilityCheck::Lenient => {
                    info!(capability = %capability, node_template = %node.name, "capability is not mapped; not reported in lenient mode");
                }
                CapabilityCheck::Strict => {
                    collector.push(Issue::unknown_field("SubstitutionMappings", capability));
                }
            }
        }
    }

    fn validate_requirements(&self, collector: &mut Collector) {
        let Some(node) = &self.substituted else {
            return;
        };
        let Some(requirements) = node.requirements() else {
            collector.push(Issue::unknown_field(
                "SubstitutionMappings",
                "Requirements is not list or dict",
            ));
            return;
        };
        let mapped = Requirements::parse(self.requirements())
            .map(|r| r.names())
            .unwrap_or_default();
        debug!(mapped = ?mapped, node_requirements = ?requirements.names(), "checking substituted requirements");
        if mapped.is_empty() {
            return;
        }
        for assignment in requirements.normalize() {
            if !mapped.contains(&assignment.name) {
                collector.push(Issue::unknown_field("SubstitutionMappings", assignment.name));
            }
        }
    }

    fn validate_outputs(&self, collector: &mut Collector) {
        let attributes = self
            .node_definition()
            .map(|entity| entity.attribute_names())
            .unwrap_or_default();

        for output in &self.outputs {
            if !attributes.contains(&output.name) {
                collector.push(Issue::UnknownOutput {
                    location: self.what(),
                    output_name: output.name.clone(),
                });
            }
        }
        for attribute in attributes {
            let covered = self.outputs.iter().any(|output| output.name == attribute);
            if !covered && !OPTIONAL_OUTPUTS.contains(&attribute.as_str()) {
                collector.push(Issue::MissingRequiredOutput {
                    what: self.what(),
                    output_name: attribute,
                });
            }
        }
    }
}
