//! Type system: builtin definitions, the merged type registry, and the
//! schema/constraint/value validation shared by inputs and properties.

pub mod builtin;
pub mod constraints;
pub mod datatype;
pub mod entity;
pub mod schema;

pub use builtin::Profile;
pub use constraints::Constraint;
pub use entity::{EntityType, PropertyDef};
pub use schema::Schema;

use std::collections::HashMap;

use serde_yaml::Mapping;

/// Scalar and collection type names usable directly as property/input types.
pub const PROPERTY_TYPES: [&str; 17] = [
    "integer",
    "string",
    "boolean",
    "float",
    "range",
    "number",
    "timestamp",
    "list",
    "map",
    "scalar-unit.size",
    "scalar-unit.frequency",
    "scalar-unit.time",
    "scalar-unit.bitrate",
    "version",
    "PortDef",
    "PortSpec",
    "json",
];

pub const DATATYPE_PREFIX: &str = "tosca.datatypes.";
pub const DATATYPE_NETWORK_PREFIX: &str = "tosca.datatypes.network.";

pub fn is_property_type(name: &str) -> bool {
    PROPERTY_TYPES.contains(&name)
}

/// Top-level document sections that may declare custom types, plus the
/// `imports` pseudo-section that says "follow imports".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeSection {
    Imports,
    NodeTypes,
    CapabilityTypes,
    RelationshipTypes,
    DataTypes,
    InterfaceTypes,
    PolicyTypes,
    GroupTypes,
}

impl TypeSection {
    /// Every section a template resolves, in resolution order.
    pub const ALL: [TypeSection; 8] = [
        TypeSection::Imports,
        TypeSection::NodeTypes,
        TypeSection::CapabilityTypes,
        TypeSection::RelationshipTypes,
        TypeSection::DataTypes,
        TypeSection::InterfaceTypes,
        TypeSection::PolicyTypes,
        TypeSection::GroupTypes,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TypeSection::Imports => "imports",
            TypeSection::NodeTypes => "node_types",
            TypeSection::CapabilityTypes => "capability_types",
            TypeSection::RelationshipTypes => "relationship_types",
            TypeSection::DataTypes => "data_types",
            TypeSection::InterfaceTypes => "interface_types",
            TypeSection::PolicyTypes => "policy_types",
            TypeSection::GroupTypes => "group_types",
        }
    }

    /// Normative name prefix of builtin types in this section.
    pub fn prefix(self) -> &'static str {
        match self {
            TypeSection::Imports => "",
            TypeSection::NodeTypes => "tosca.nodes.",
            TypeSection::CapabilityTypes => "tosca.capabilities.",
            TypeSection::RelationshipTypes => "tosca.relationships.",
            TypeSection::DataTypes => DATATYPE_PREFIX,
            TypeSection::InterfaceTypes => "tosca.interfaces.",
            TypeSection::PolicyTypes => "tosca.policies.",
            TypeSection::GroupTypes => "tosca.groups.",
        }
    }
}

/// A custom type definition and the section it was declared in.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub section: TypeSection,
    pub body: Mapping,
}

/// All type definitions visible to one template: the profile's builtin
/// definitions plus the custom definitions merged from the document and its imports.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    profile: Profile,
    custom: HashMap<String, TypeDefinition>,
}

impl TypeRegistry {
    pub fn new(profile: Profile, custom: HashMap<String, TypeDefinition>) -> Self {
        TypeRegistry { profile, custom }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn custom_types(&self) -> &HashMap<String, TypeDefinition> {
        &self.custom
    }

    pub fn custom(&self, name: &str) -> Option<&TypeDefinition> {
        self.custom.get(name)
    }

    /// True when `name` is a custom (non-builtin) type.
    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    pub fn builtin(&self, name: &str) -> Option<&Mapping> {
        self.profile.definitions().get(name)
    }

    /// Builtin definitions shadow custom ones of the same name.
    pub fn definition(&self, name: &str) -> Option<&Mapping> {
        self.builtin(name)
            .or_else(|| self.custom.get(name).map(|def| &def.body))
    }

    /// Custom definitions declared in `section`.
    pub fn section(&self, section: TypeSection) -> impl Iterator<Item = (&String, &Mapping)> {
        self.custom
            .iter()
            .filter(move |(_, def)| def.section == section)
            .map(|(name, def)| (name, &def.body))
    }

    /// Resolve a possibly short type name (`Compute`) within a section.
    pub fn resolve(&self, name: &str, section: TypeSection) -> Option<String> {
        let belongs = |candidate: &str| match self.custom.get(candidate) {
            Some(def) => def.section == section,
            None => {
                candidate.starts_with(section.prefix()) && self.builtin(candidate).is_some()
            }
        };
        if belongs(name) {
            return Some(name.to_string());
        }
        let prefixed = format!("{}{}", section.prefix(), name);
        if belongs(&prefixed) {
            return Some(prefixed);
        }
        None
    }

    pub fn entity(&self, name: &str) -> Option<EntityType<'_>> {
        EntityType::new(name, self)
    }

    pub fn node_type(&self, name: &str) -> Option<EntityType<'_>> {
        self.resolve(name, TypeSection::NodeTypes)
            .and_then(|resolved| EntityType::new(&resolved, self))
    }

    /// The data type backing an input/property type name, tried as the exact
    /// builtin name, then with the data type prefixes, then as a custom type.
    pub fn datatype_for(&self, type_name: &str) -> Option<EntityType<'_>> {
        let candidates = [
            type_name.to_string(),
            format!("{}{}", DATATYPE_PREFIX, type_name),
            format!("{}{}", DATATYPE_NETWORK_PREFIX, type_name),
        ];
        candidates
            .iter()
            .find(|candidate| self.builtin(candidate).is_some())
            .and_then(|candidate| EntityType::new(candidate, self))
            .or_else(|| {
                self.custom
                    .contains_key(type_name)
                    .then(|| EntityType::new(type_name, self))
                    .flatten()
            })
    }
}
