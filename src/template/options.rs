//! Template construction settings.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Deserialize;
use serde_yaml::Value;

use crate::parse::{ArchiveHandler, DocumentLoader, FsLoader};
pub use crate::topology::CapabilityCheck;

#[derive(Clone)]
pub struct TemplateOptions {
    /// Values for topology inputs, by input name.
    pub params: BTreeMap<String, Value>,
    /// Drop "missing required" diagnostics before verification, for fragments
    /// that expect their values from elsewhere.
    pub lenient: bool,
    pub capability_check: CapabilityCheck,
    pub loader: Rc<dyn DocumentLoader>,
    pub archive: Option<Rc<dyn ArchiveHandler>>,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        TemplateOptions {
            params: BTreeMap::new(),
            lenient: false,
            capability_check: CapabilityCheck::default(),
            loader: Rc::new(FsLoader),
            archive: None,
        }
    }
}

impl std::fmt::Debug for TemplateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateOptions")
            .field("params", &self.params)
            .field("lenient", &self.lenient)
            .field("capability_check", &self.capability_check)
            .field("archive", &self.archive.is_some())
            .finish_non_exhaustive()
    }
}

impl TemplateOptions {
    /// The same settings with a different parameter set.
    pub fn with_params(&self, params: BTreeMap<String, Value>) -> TemplateOptions {
        TemplateOptions {
            params,
            ..self.clone()
        }
    }
}

/// The serializable subset of [`TemplateOptions`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub lenient: bool,
    pub capability_check: CapabilityCheck,
    pub params: BTreeMap<String, Value>,
}

impl ParserSettings {
    /// An empty string means defaults.
    pub fn from_json(json: &str) -> Result<ParserSettings, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(ParserSettings::default());
        }
        serde_json::from_str(json)
    }

    pub fn into_options(self) -> TemplateOptions {
        TemplateOptions {
            params: self.params,
            lenient: self.lenient,
            capability_check: self.capability_check,
            ..TemplateOptions::default()
        }
    }
}
