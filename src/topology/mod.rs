//! Topology templates: inputs, node templates, relationship templates,
//! outputs, groups, policies and the substitution mapping.

pub mod entities;
pub mod functions;
pub mod graph;
pub mod node_template;
pub mod parameters;
pub mod requirements;
pub mod substitution;

pub use entities::{Group, Policy, RelationshipTemplate};
pub use graph::TopologyGraph;
pub use node_template::NodeTemplate;
pub use parameters::{Input, Output};
pub use requirements::{RequirementAssignment, Requirements};
pub use substitution::{CapabilityCheck, Property, SubstitutionMapping};

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::diagnostics::Collector;
use crate::error::Issue;
use crate::parse::{display_value, str_field};
use crate::types::TypeRegistry;

pub const TOPOLOGY_KEYS: [&str; 9] = [
    "description",
    "inputs",
    "node_templates",
    "relationship_templates",
    "outputs",
    "groups",
    "substitution_mappings",
    "policies",
    "workflows",
];

#[derive(Debug, Default)]
pub struct TopologyTemplate {
    body: Option<Mapping>,
    pub description: Option<String>,
    pub inputs: Vec<Input>,
    pub node_templates: Vec<NodeTemplate>,
    pub relationship_templates: Vec<RelationshipTemplate>,
    pub outputs: Vec<Output>,
    pub groups: Vec<Group>,
    pub policies: Vec<Policy>,
    pub substitution_mappings: Option<SubstitutionMapping>,
    params: BTreeMap<String, Value>,
}

impl TopologyTemplate {
    /// Build and validate a topology. `body` is `None` for documents that only
    /// declare types.
    pub fn new(
        body: Option<&Value>,
        registry: &Rc<TypeRegistry>,
        params: &BTreeMap<String, Value>,
        substituted: Option<&NodeTemplate>,
        capability_check: CapabilityCheck,
        collector: &mut Collector,
    ) -> TopologyTemplate {
        let mut topology = TopologyTemplate {
            params: params.clone(),
            ..TopologyTemplate::default()
        };
        let Some(body) = body.filter(|b| !b.is_null()) else {
            return topology;
        };
        let Some(body) = body.as_mapping() else {
            collector.push(Issue::invalid_value("The topology_template section must be a map."));
            return topology;
        };

        for key in body.keys() {
            let key = display_value(key);
            if !TOPOLOGY_KEYS.contains(&key.as_str()) {
                collector.push(Issue::unknown_field("Template", key));
            }
        }
        topology.description = str_field(body, "description").map(|d| d.trim_end().to_string());
        topology.inputs = Self::build_inputs(body, registry, params, collector);

        for (name, definition) in section(body, "relationship_templates") {
            topology.relationship_templates.extend(RelationshipTemplate::new(
                &display_value(name),
                definition,
                registry,
                collector,
            ));
        }

        for (name, definition) in section(body, "node_templates") {
            topology
                .node_templates
                .extend(NodeTemplate::new(&display_value(name), definition, registry, collector));
        }
        let node_names: Vec<&str> = topology.node_templates.iter().map(|n| n.name.as_str()).collect();
        for node in &topology.node_templates {
            node.validate(&node_names, registry, collector);
        }

        for (name, attrs) in section(body, "outputs") {
            let output = Output::new(&display_value(name), attrs.clone());
            output.validate(collector);
            topology.outputs.push(output);
        }

        for (name, definition) in section(body, "groups") {
            topology
                .groups
                .extend(Group::new(&display_value(name), definition, &node_names, registry, collector));
        }

        let mut targets = node_names.clone();
        targets.extend(topology.groups.iter().map(|g| g.name.as_str()));
        for (name, definition) in policy_entries(body.get("policies")) {
            topology
                .policies
                .extend(Policy::new(&name, definition, &targets, registry, collector));
        }

        match body.get("substitution_mappings") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(definition)) => {
                topology.substitution_mappings = Some(SubstitutionMapping::new(
                    definition,
                    &topology.inputs,
                    &topology.outputs,
                    substituted,
                    Rc::clone(registry),
                    capability_check,
                    collector,
                ));
            }
            Some(_) => collector.push(Issue::invalid_value(
                "The substitution_mappings section must be a map.",
            )),
        }

        debug!(
            inputs = topology.inputs.len(),
            node_templates = topology.node_templates.len(),
            outputs = topology.outputs.len(),
            substituted = topology.substitution_mappings.is_some(),
            "built topology template"
        );
        topology.body = Some(body.clone());
        topology
    }

    /// Inputs take the supplied parameter, else their default. A required
    /// input with neither is a missing parameter.
    fn build_inputs(
        body: &Mapping,
        registry: &TypeRegistry,
        params: &BTreeMap<String, Value>,
        collector: &mut Collector,
    ) -> Vec<Input> {
        let mut inputs = Vec::new();
        for (name, definition) in section(body, "inputs") {
            let input = Input::new(&display_value(name), definition, registry, collector);
            match params.get(&input.name) {
                Some(value) => input.validate(Some(value), registry, collector),
                None => {
                    input.validate(input.default(), registry, collector);
                    if input.required() && input.default().is_none() {
                        warn!(input = %input.name, "required input has no parameter and no default");
                        collector.push(Issue::MissingRequiredParameter {
                            what: "Template".to_string(),
                            input_name: input.name.clone(),
                        });
                    }
                }
            }
            inputs.push(input);
        }
        inputs
    }

    /// The topology body, `None` when the document declares no topology.
    pub fn body(&self) -> Option<&Mapping> {
        self.body.as_ref()
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn node_template(&self, name: &str) -> Option<&NodeTemplate> {
        self.node_templates.iter().find(|n| n.name == name)
    }

    /// The node type a topology section declares itself a substitute for.
    pub fn sub_mapping_node_type(topology: Option<&Value>) -> Option<&str> {
        topology?
            .get("substitution_mappings")
            .and_then(SubstitutionMapping::node_type_of)
    }
}

fn section<'a>(body: &'a Mapping, key: &str) -> impl Iterator<Item = (&'a Value, &'a Value)> {
    body.get(key).and_then(Value::as_mapping).into_iter().flatten()
}

/// Policies are a list of single-key maps; a plain map is accepted too.
fn policy_entries(policies: Option<&Value>) -> Vec<(String, &Value)> {
    match policies {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(Value::as_mapping)
            .flatten()
            .map(|(name, definition)| (display_value(name), definition))
            .collect(),
        Some(Value::Mapping(map)) => map
            .iter()
            .map(|(name, definition)| (display_value(name), definition))
            .collect(),
        _ => Vec::new(),
    }
}
