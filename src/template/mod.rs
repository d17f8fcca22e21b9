//! The template orchestrator.
//!
//! Loading runs in fixed phases: document fields and version, custom type
//! resolution, topology construction, nested template resolution, and finally
//! verification, which turns any collected diagnostic into one
//! [`ValidationError`].

pub mod options;
pub mod repository;

pub use options::{CapabilityCheck, ParserSettings, TemplateOptions};
pub use repository::Repository;

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_yaml::{Mapping, Value};
use tracing::{debug, error, info};

use crate::diagnostics::Collector;
use crate::error::{DiagnosticKind, Issue, ValidationError};
use crate::parse::{ArchiveHandler, DocumentLoader, DocumentLocation, display_value, parse_str, resolve_template_path, str_field};
use crate::resolve::{NestedDocument, TypeResolver};
use crate::topology::functions::{is_function, resolve_get_input};
use crate::topology::{
    Group, Input, NodeTemplate, Output, Policy, RelationshipTemplate, SubstitutionMapping, TopologyGraph,
    TopologyTemplate,
};
use crate::types::{Profile, TypeRegistry, TypeSection};

pub const DEFINITION_VERSION: &str = "tosca_definitions_version";

/// Top-level sections every template may declare.
pub const SECTIONS: [&str; 16] = [
    DEFINITION_VERSION,
    "tosca_default_namespace",
    "topology_template",
    "description",
    "imports",
    "dsl_definitions",
    "node_types",
    "relationship_types",
    "relationship_templates",
    "capability_types",
    "artifact_types",
    "data_types",
    "interface_types",
    "policy_types",
    "group_types",
    "repositories",
];

/// Where a template's document comes from.
enum Source {
    Path(String),
    Document {
        document: Value,
        location: Option<DocumentLocation>,
    },
    Nested(NestedDocument),
    /// YAML text that failed to parse; the failure is already collected.
    Unparsed,
    Nothing,
}

#[derive(Debug)]
pub struct ToscaTemplate {
    input_path: Option<String>,
    location: Option<DocumentLocation>,
    document: Option<Mapping>,
    version: Option<String>,
    metadata: Option<Mapping>,
    description: Option<String>,
    repositories: Vec<Repository>,
    registry: Rc<TypeRegistry>,
    topology: TopologyTemplate,
    graph: Option<TopologyGraph>,
    nested_documents: Vec<NestedDocument>,
    nested_templates: Vec<Rc<ToscaTemplate>>,
}

impl ToscaTemplate {
    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::default()
    }

    /// Load and validate the template at `path`.
    pub fn from_path(path: &str, options: TemplateOptions) -> Result<ToscaTemplate, ValidationError> {
        Self::builder().path(path).options(options).build()
    }

    /// Validate an already parsed document.
    pub fn from_document(document: Value, options: TemplateOptions) -> Result<ToscaTemplate, ValidationError> {
        Self::builder().document(document).options(options).build()
    }

    /// Every phase of one template. Nested templates share the caller's
    /// collector; only the outermost call opens and closes it.
    fn construct(
        source: Source,
        options: &TemplateOptions,
        substituted: Option<&NodeTemplate>,
        collector: &mut Collector,
    ) -> Result<ToscaTemplate, ValidationError> {
        let (input_path, location, document) = Self::load(source, options, collector);

        let mut template = ToscaTemplate {
            input_path,
            location,
            document: None,
            version: None,
            metadata: None,
            description: None,
            repositories: Vec::new(),
            registry: Rc::new(TypeRegistry::default()),
            topology: TopologyTemplate::default(),
            graph: None,
            nested_documents: Vec::new(),
            nested_templates: Vec::new(),
        };

        if let Some(document) = document {
            template.build(document, options, substituted, collector)?;
        }
        template.verify(options, collector)?;
        Ok(template)
    }

    fn load(
        source: Source,
        options: &TemplateOptions,
        collector: &mut Collector,
    ) -> (Option<String>, Option<DocumentLocation>, Option<Mapping>) {
        let (input_path, location, value) = match source {
            Source::Path(path) => {
                let archive = options.archive.as_deref();
                let location = resolve_template_path(&path, archive, collector);
                let value = location
                    .as_ref()
                    .and_then(|location| options.loader.load(location, collector));
                (Some(path), location, value)
            }
            Source::Document { document, location } => {
                let empty = match &document {
                    Value::Null => true,
                    Value::Mapping(document) => document.is_empty(),
                    _ => false,
                };
                if empty {
                    error!("the pre-parsed document is empty");
                    collector.push(Issue::NothingToParse);
                }
                (None, location, Some(document))
            }
            Source::Nested(nested) => (
                Some(nested.location.to_string()),
                Some(nested.location),
                Some(nested.document),
            ),
            Source::Unparsed => (None, None, None),
            Source::Nothing => {
                error!("no path or document was provided");
                collector.push(Issue::NothingToParse);
                (None, None, None)
            }
        };

        let document = match value {
            None | Some(Value::Null) => None,
            Some(Value::Mapping(document)) if document.is_empty() => None,
            Some(Value::Mapping(document)) => Some(document),
            Some(other) => {
                collector.push(Issue::ParseFailure {
                    path: input_path.clone().unwrap_or_else(|| "pre-parsed input".into()),
                    reason: format!("expected a map at the top level, found \"{}\"", display_value(&other)),
                });
                None
            }
        };
        debug!(input = ?input_path, loaded = document.is_some(), "loaded template document");
        (input_path, location, document)
    }

    fn build(
        &mut self,
        document: Mapping,
        options: &TemplateOptions,
        substituted: Option<&NodeTemplate>,
        collector: &mut Collector,
    ) -> Result<(), ValidationError> {
        let profile = self.validate_fields(&document, collector);
        self.metadata = document.get("metadata").and_then(Value::as_mapping).cloned();
        self.description = str_field(&document, "description").map(|d| d.trim_end().to_string());

        let resolution = TypeResolver::new(options.loader.as_ref(), &TypeSection::ALL).resolve(
            &document,
            self.location.as_ref(),
            collector,
        );
        self.registry = Rc::new(TypeRegistry::new(profile, resolution.types));
        self.nested_documents = resolution.nested;

        if let Some(repositories) = document.get("repositories").and_then(Value::as_mapping) {
            self.repositories = repositories
                .iter()
                .map(|(name, definition)| Repository::new(&display_value(name), definition, collector))
                .collect();
        }

        self.topology = TopologyTemplate::new(
            document.get("topology_template"),
            &self.registry,
            &options.params,
            substituted,
            options.capability_check,
            collector,
        );
        if self.topology.body().is_some() {
            self.resolve_nested(options, collector)?;
            self.graph = Some(TopologyGraph::build(&self.topology.node_templates));
        }
        self.document = Some(document);
        Ok(())
    }

    /// Check the version and top-level sections; returns the builtin profile to use.
    fn validate_fields(&mut self, document: &Mapping, collector: &mut Collector) -> Profile {
        let version = str_field(document, DEFINITION_VERSION);
        let mut profile = Profile::default();
        match version {
            None => collector.push(Issue::missing_field("Template", DEFINITION_VERSION)),
            Some(version) => match Profile::for_version(version) {
                Some(found) => {
                    if !Profile::is_standard(version) {
                        debug!(version, "loading extended type definitions");
                    }
                    profile = found;
                }
                None => collector.push(Issue::InvalidTemplateVersion {
                    what: version.to_string(),
                    valid_versions: Profile::valid_versions().join(", "),
                }),
            },
        }
        self.version = version.map(str::to_string);

        let additional = version.map(Profile::additional_sections).unwrap_or_default();
        for key in document.keys() {
            let key = display_value(key);
            if !SECTIONS.contains(&key.as_str()) && !additional.contains(&key.as_str()) {
                collector.push(Issue::unknown_field("Template", key));
            }
        }
        profile
    }

    // ========================================================================
    // Nested templates
    // ========================================================================

    /// Resolve every imported topology against the node template it substitutes.
    /// Diagnostics of a successful nested resolution are rolled back; a nested
    /// validation failure propagates.
    fn resolve_nested(&mut self, options: &TemplateOptions, collector: &mut Collector) -> Result<(), ValidationError> {
        let documents = self.nested_documents.clone();
        for nested_document in documents {
            let node_type = TopologyTemplate::sub_mapping_node_type(nested_document.document.get("topology_template"))
                .map(str::to_string);
            for index in 0..self.topology.node_templates.len() {
                let node = &self.topology.node_templates[index];
                if !is_substitutable(node, node_type.as_deref()) {
                    continue;
                }
                debug!(node_template = %node.name, location = %nested_document.location, "resolving nested template");
                let nested_options = options.with_params(self.nested_params(node, options));

                let save_point = collector.save_point();
                let nested = ToscaTemplate::construct(
                    Source::Nested(nested_document.clone()),
                    &nested_options,
                    Some(node),
                    collector,
                )
                .inspect_err(|e| error!(error = %e.message, "nested template failed validation"))?;
                collector.restore(save_point);

                if nested.has_substitution_mappings() {
                    let nested = Rc::new(nested);
                    self.nested_templates.push(Rc::clone(&nested));
                    self.nested_templates.extend(nested.nested_templates.iter().cloned());
                    self.topology.node_templates[index].substitution_mapped = Some(nested);
                }
            }
        }
        Ok(())
    }

    /// Parameters for a nested template: this template's parameters overlaid
    /// with the node template's own property values. `get_input` calls are
    /// resolved; other functions are not forwarded.
    fn nested_params(&self, node: &NodeTemplate, options: &TemplateOptions) -> BTreeMap<String, Value> {
        let mut params = options.params.clone();
        for (name, value) in node.properties() {
            let value = if is_function(value) {
                match resolve_get_input(value, &options.params, &self.topology.inputs) {
                    Some(resolved) => resolved,
                    None => continue,
                }
            } else {
                value.clone()
            };
            params.insert(display_value(name), value);
        }
        params
    }

    // ========================================================================
    // Verification
    // ========================================================================

    fn verify(&self, options: &TemplateOptions, collector: &mut Collector) -> Result<(), ValidationError> {
        if options.lenient {
            collector.remove_kinds(&DiagnosticKind::MISSING_VALUE_KINDS);
        }
        if collector.has_errors() {
            let failure = ValidationError::new(self.input_path.clone(), collector.diagnostics().to_vec());
            error!(input = ?self.input_path, errors = failure.diagnostics.len(), "template failed validation");
            return Err(failure);
        }
        match &self.input_path {
            Some(path) => info!("The input \"{}\" successfully passed validation.", path),
            None => info!("The pre-parsed input successfully passed validation."),
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The path the template was loaded from; `None` for a pre-parsed document.
    pub fn input_path(&self) -> Option<&str> {
        self.input_path.as_deref()
    }

    pub fn location(&self) -> Option<&DocumentLocation> {
        self.location.as_ref()
    }

    pub fn document(&self) -> Option<&Mapping> {
        self.document.as_ref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn metadata(&self) -> Option<&Mapping> {
        self.metadata.as_ref()
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| str_field(m, key))
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn topology(&self) -> &TopologyTemplate {
        &self.topology
    }

    pub fn inputs(&self) -> &[Input] {
        &self.topology.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.topology.outputs
    }

    pub fn node_templates(&self) -> &[NodeTemplate] {
        &self.topology.node_templates
    }

    pub fn node_template(&self, name: &str) -> Option<&NodeTemplate> {
        self.topology.node_template(name)
    }

    pub fn relationship_templates(&self) -> &[RelationshipTemplate] {
        &self.topology.relationship_templates
    }

    pub fn groups(&self) -> &[Group] {
        &self.topology.groups
    }

    pub fn policies(&self) -> &[Policy] {
        &self.topology.policies
    }

    pub fn substitution_mappings(&self) -> Option<&SubstitutionMapping> {
        self.topology.substitution_mappings.as_ref()
    }

    pub fn graph(&self) -> Option<&TopologyGraph> {
        self.graph.as_ref()
    }

    /// Nested templates with a substitution mapping, at any depth.
    pub fn nested_templates(&self) -> &[Rc<ToscaTemplate>] {
        &self.nested_templates
    }

    pub fn has_nested_templates(&self) -> bool {
        !self.nested_templates.is_empty()
    }

    pub fn has_substitution_mappings(&self) -> bool {
        self.topology.substitution_mappings.is_some()
    }
}

/// A node template is substituted by a nested topology when it is not already
/// substituted, assigns no interfaces, and its type is the mapping's node type.
fn is_substitutable(node: &NodeTemplate, node_type: Option<&str>) -> bool {
    node.substitution_mapped.is_none()
        && node.interfaces().is_empty()
        && node_type.is_some_and(|node_type| node_type == node.type_name)
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Default)]
pub struct TemplateBuilder {
    path: Option<String>,
    document: Option<Value>,
    document_location: Option<DocumentLocation>,
    source_issue: Option<Issue>,
    options: TemplateOptions,
}

impl TemplateBuilder {
    /// Load from a path. Takes precedence over [`document`](Self::document).
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn document(mut self, document: Value) -> Self {
        self.document = Some(document);
        self
    }

    /// Parse YAML text as the document. A parse failure is reported at build time.
    pub fn yaml(mut self, source: &str) -> Self {
        match parse_str(source) {
            Ok(document) => self.document = Some(document),
            Err(issue) => self.source_issue = Some(issue),
        }
        self
    }

    /// Base location for relative imports of a pre-parsed document.
    pub fn document_location(mut self, location: impl AsRef<str>) -> Self {
        self.document_location = Some(DocumentLocation::parse(location.as_ref()));
        self
    }

    pub fn options(mut self, options: TemplateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn params(mut self, params: BTreeMap<String, Value>) -> Self {
        self.options.params = params;
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.params.insert(name.into(), value.into());
        self
    }

    pub fn lenient(mut self, lenient: bool) -> Self {
        self.options.lenient = lenient;
        self
    }

    pub fn capability_check(mut self, check: CapabilityCheck) -> Self {
        self.options.capability_check = check;
        self
    }

    pub fn loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.options.loader = Rc::new(loader);
        self
    }

    pub fn archive(mut self, archive: impl ArchiveHandler + 'static) -> Self {
        self.options.archive = Some(Rc::new(archive));
        self
    }

    /// Run the whole pipeline in a fresh collection window.
    pub fn build(self) -> Result<ToscaTemplate, ValidationError> {
        let source = match (self.path, self.document) {
            (Some(path), document) => {
                if document.is_some() {
                    info!("Both path and document were provided. Using path and ignoring document.");
                }
                Source::Path(path)
            }
            (None, Some(document)) => Source::Document {
                document,
                location: self.document_location,
            },
            (None, None) if self.source_issue.is_some() => Source::Unparsed,
            (None, None) => Source::Nothing,
        };

        let mut collector = Collector::new();
        collector.start();
        if let Some(issue) = self.source_issue {
            collector.push(issue);
        }
        let result = ToscaTemplate::construct(source, &self.options, None, &mut collector);
        collector.stop();
        result
    }
}
