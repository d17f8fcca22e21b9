//! Relationship templates, groups and policies, plus the property checks
//! shared with node templates.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::diagnostics::Collector;
use crate::error::Issue;
use crate::parse::{display_value, str_field};
use crate::types::datatype::validate_schema_value;
use crate::types::{EntityType, TypeRegistry, TypeSection};

pub const RELATIONSHIP_TEMPLATE_KEYS: [&str; 7] = [
    "type",
    "description",
    "metadata",
    "properties",
    "attributes",
    "interfaces",
    "copy",
];

pub const GROUP_KEYS: [&str; 6] = ["type", "description", "metadata", "properties", "members", "interfaces"];

pub const POLICY_KEYS: [&str; 6] = ["type", "description", "metadata", "properties", "targets", "triggers"];

// ============================================================================
// Shared checks
// ============================================================================

/// Check a template body's keys and resolve its `type` within `section`.
/// Returns the body and the resolved type name when both are usable.
pub(crate) fn template_header<'a>(
    what: &str,
    definition: &'a Value,
    keys: &[&str],
    section: TypeSection,
    registry: &TypeRegistry,
    collector: &mut Collector,
) -> Option<(&'a Mapping, Option<String>)> {
    let Some(body) = definition.as_mapping() else {
        collector.push(Issue::missing_field(what, "type"));
        return None;
    };
    for key in body.keys() {
        let key = display_value(key);
        if !keys.contains(&key.as_str()) {
            collector.push(Issue::unknown_field(what, key));
        }
    }
    let resolved = match str_field(body, "type") {
        None => {
            collector.push(Issue::missing_field(what, "type"));
            None
        }
        Some(type_name) => {
            let resolved = registry.resolve(type_name, section);
            if resolved.is_none() {
                collector.push(Issue::InvalidType {
                    what: type_name.to_string(),
                });
            }
            resolved
        }
    };
    Some((body, resolved))
}

/// Check assigned property values against the type's property definitions.
pub(crate) fn check_properties(
    template: &str,
    entity: &EntityType<'_>,
    assigned: &Mapping,
    registry: &TypeRegistry,
    collector: &mut Collector,
) {
    let what = format!("Properties of template \"{}\"", template);
    let definitions = entity.properties_def();

    for (name, value) in assigned {
        let name = display_value(name);
        match definitions.iter().find(|p| p.name == name) {
            None => collector.push(Issue::unknown_field(what.clone(), name)),
            Some(definition) => {
                if let Err(issue) = validate_schema_value(&definition.schema, value, registry) {
                    collector.push(issue);
                }
            }
        }
    }
    for definition in &definitions {
        if definition.required()
            && definition.default().is_none()
            && !assigned.contains_key(definition.name.as_str())
        {
            collector.push(Issue::missing_field(what.clone(), definition.name.clone()));
        }
    }
}

fn mapping_field(body: &Mapping, key: &str) -> Mapping {
    body.get(key).and_then(Value::as_mapping).cloned().unwrap_or_default()
}

fn string_list(body: &Mapping, key: &str) -> Vec<String> {
    body.get(key)
        .and_then(Value::as_sequence)
        .map(|items| items.iter().map(display_value).collect())
        .unwrap_or_default()
}

// ============================================================================
// Relationship templates
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipTemplate {
    pub name: String,
    pub type_name: String,
    pub description: Option<String>,
    pub properties: Mapping,
}

impl RelationshipTemplate {
    pub fn new(
        name: &str,
        definition: &Value,
        registry: &TypeRegistry,
        collector: &mut Collector,
    ) -> Option<RelationshipTemplate> {
        let what = format!("Relationship template \"{}\"", name);
        let (body, resolved) = template_header(
            &what,
            definition,
            &RELATIONSHIP_TEMPLATE_KEYS,
            TypeSection::RelationshipTypes,
            registry,
            collector,
        )?;
        let properties = mapping_field(body, "properties");
        if let Some(entity) = resolved.as_deref().and_then(|t| registry.entity(t)) {
            check_properties(name, &entity, &properties, registry, collector);
        }
        debug!(relationship_template = name, "built relationship template");
        Some(RelationshipTemplate {
            name: name.to_string(),
            type_name: str_field(body, "type").unwrap_or_default().to_string(),
            description: str_field(body, "description").map(str::to_string),
            properties,
        })
    }
}

// ============================================================================
// Groups
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub type_name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
    pub properties: Mapping,
}

impl Group {
    /// Members must name node templates of the same topology.
    pub fn new(
        name: &str,
        definition: &Value,
        node_names: &[&str],
        registry: &TypeRegistry,
        collector: &mut Collector,
    ) -> Option<Group> {
        let what = format!("Group \"{}\"", name);
        let (body, resolved) = template_header(
            &what,
            definition,
            &GROUP_KEYS,
            TypeSection::GroupTypes,
            registry,
            collector,
        )?;
        let members = string_list(body, "members");
        for member in &members {
            if !node_names.contains(&member.as_str()) {
                collector.push(Issue::invalid_value(format!(
                    "Member \"{}\" of group \"{}\" is not a node template.",
                    member, name
                )));
            }
        }
        let properties = mapping_field(body, "properties");
        if let Some(entity) = resolved.as_deref().and_then(|t| registry.entity(t)) {
            check_properties(name, &entity, &properties, registry, collector);
        }
        Some(Group {
            name: name.to_string(),
            type_name: str_field(body, "type").unwrap_or_default().to_string(),
            description: str_field(body, "description").map(str::to_string),
            members,
            properties,
        })
    }
}

// ============================================================================
// Policies
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub name: String,
    pub type_name: String,
    pub description: Option<String>,
    pub targets: Vec<String>,
    pub properties: Mapping,
}

impl Policy {
    /// Targets must name node templates or groups.
    pub fn new(
        name: &str,
        definition: &Value,
        target_names: &[&str],
        registry: &TypeRegistry,
        collector: &mut Collector,
    ) -> Option<Policy> {
        let what = format!("Policy \"{}\"", name);
        let (body, resolved) = template_header(
            &what,
            definition,
            &POLICY_KEYS,
            TypeSection::PolicyTypes,
            registry,
            collector,
        )?;
        let targets = string_list(body, "targets");
        for target in &targets {
            if !target_names.contains(&target.as_str()) {
                collector.push(Issue::invalid_value(format!(
                    "Target \"{}\" of policy \"{}\" is neither a node template nor a group.",
                    target, name
                )));
            }
        }
        let properties = mapping_field(body, "properties");
        if let Some(entity) = resolved.as_deref().and_then(|t| registry.entity(t)) {
            check_properties(name, &entity, &properties, registry, collector);
        }
        Some(Policy {
            name: name.to_string(),
            type_name: str_field(body, "type").unwrap_or_default().to_string(),
            description: str_field(body, "description").map(str::to_string),
            targets,
            properties,
        })
    }
}
