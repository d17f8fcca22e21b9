//! Node templates.

use std::rc::Rc;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::entities::{check_properties, template_header};
use super::requirements::Requirements;
use crate::diagnostics::{Collector, Scope};
use crate::error::Issue;
use crate::parse::{display_value, str_field};
use crate::template::ToscaTemplate;
use crate::types::{EntityType, TypeRegistry, TypeSection};

pub const NODE_TEMPLATE_KEYS: [&str; 12] = [
    "type",
    "metadata",
    "description",
    "directives",
    "properties",
    "attributes",
    "requirements",
    "capabilities",
    "interfaces",
    "artifacts",
    "node_filter",
    "copy",
];

/// Interface names every node template may assign without declaring them.
const LIFECYCLE_INTERFACES: [&str; 2] = ["Standard", "Configure"];

#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub name: String,
    /// The type as written in the template.
    pub type_name: String,
    resolved_type: Option<String>,
    body: Mapping,
    properties: Mapping,
    /// Set once a nested template has been resolved for this node.
    pub substitution_mapped: Option<Rc<ToscaTemplate>>,
}

impl NodeTemplate {
    /// Read a node template. Key and type problems are reported; `None` only
    /// when the definition is not a map at all.
    pub fn new(
        name: &str,
        definition: &Value,
        registry: &TypeRegistry,
        collector: &mut Collector,
    ) -> Option<NodeTemplate> {
        let mut collector = collector.scoped(Scope::NodeTemplate, name);
        let what = format!("Node template \"{}\"", name);
        let (body, resolved_type) = template_header(
            &what,
            definition,
            &NODE_TEMPLATE_KEYS,
            TypeSection::NodeTypes,
            registry,
            &mut collector,
        )?;
        Some(NodeTemplate {
            name: name.to_string(),
            type_name: str_field(body, "type").unwrap_or_default().to_string(),
            resolved_type,
            body: body.clone(),
            properties: body
                .get("properties")
                .and_then(Value::as_mapping)
                .cloned()
                .unwrap_or_default(),
            substitution_mapped: None,
        })
    }

    /// Check properties, requirements, capabilities and interfaces against the
    /// node type. Templates whose type did not resolve are skipped.
    pub fn validate(&self, node_names: &[&str], registry: &TypeRegistry, collector: &mut Collector) {
        let Some(entity) = self.entity_type(registry) else {
            return;
        };
        let mut collector = collector.scoped(Scope::NodeTemplate, &self.name);
        debug!(node_template = %self.name, type_name = %entity.name(), "validating node template");

        check_properties(&self.name, &entity, &self.properties, registry, &mut collector);

        match self.requirements() {
            None => collector.push(Issue::invalid_value(format!(
                "The requirements of template \"{}\" must be a list or a map.",
                self.name
            ))),
            Some(requirements) => {
                let declared = entity.requirement_names();
                let what = format!("\"requirements\" of template \"{}\"", self.name);
                for assignment in requirements.normalize() {
                    if !declared.contains(&assignment.name) {
                        collector.push(Issue::unknown_field(what.clone(), assignment.name.clone()));
                    }
                    if let Some(node) = assignment.node() {
                        let known = node_names.contains(&node)
                            || registry.resolve(node, TypeSection::NodeTypes).is_some();
                        if !known {
                            collector.push(Issue::invalid_value(format!(
                                "Requirement \"{}\" of template \"{}\" targets unknown node \"{}\".",
                                assignment.name, self.name, node
                            )));
                        }
                    }
                }
            }
        }

        let capabilities = entity.capability_names();
        let what = format!("\"capabilities\" of template \"{}\"", self.name);
        for name in self.section_keys("capabilities") {
            if !capabilities.contains(&name) {
                collector.push(Issue::unknown_field(what.clone(), name));
            }
        }

        let interfaces = entity.interface_names();
        let what = format!("\"interfaces\" of template \"{}\"", self.name);
        for name in self.interfaces() {
            if !interfaces.contains(&name) && !LIFECYCLE_INTERFACES.contains(&name.as_str()) {
                collector.push(Issue::unknown_field(what.clone(), name));
            }
        }
    }

    pub fn resolved_type(&self) -> Option<&str> {
        self.resolved_type.as_deref()
    }

    pub fn entity_type<'r>(&self, registry: &'r TypeRegistry) -> Option<EntityType<'r>> {
        self.resolved_type
            .as_deref()
            .and_then(|name| registry.entity(name))
    }

    pub fn description(&self) -> Option<&str> {
        str_field(&self.body, "description")
    }

    pub fn directives(&self) -> Vec<String> {
        self.body
            .get("directives")
            .and_then(Value::as_sequence)
            .map(|items| items.iter().map(display_value).collect())
            .unwrap_or_default()
    }

    /// Explicitly assigned properties, in document order.
    pub fn properties(&self) -> &Mapping {
        &self.properties
    }

    pub fn property_value(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn raw_requirements(&self) -> Option<&Value> {
        self.body.get("requirements")
    }

    /// `None` when the requirements section is neither a list nor a map.
    pub fn requirements(&self) -> Option<Requirements> {
        Requirements::parse(self.raw_requirements())
    }

    /// Capabilities defined by the node type plus those assigned on the template.
    pub fn capabilities(&self, registry: &TypeRegistry) -> Vec<String> {
        let mut names = self
            .entity_type(registry)
            .map(|entity| entity.capability_names())
            .unwrap_or_default();
        for name in self.section_keys("capabilities") {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Interfaces assigned on the template itself.
    pub fn interfaces(&self) -> Vec<String> {
        self.section_keys("interfaces")
    }

    fn section_keys(&self, key: &str) -> Vec<String> {
        self.body
            .get(key)
            .and_then(Value::as_mapping)
            .map(|section| section.keys().map(display_value).collect())
            .unwrap_or_default()
    }
}
