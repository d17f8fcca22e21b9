//! Document loading seam.
//!
//! Loaders never fail hard: unreadable or malformed documents are reported
//! into the collector and yield `None`.

use std::collections::HashMap;

use serde_yaml::{Mapping, Value};
use tracing::{debug, error};

use super::location::DocumentLocation;
use crate::diagnostics::Collector;
use crate::error::Issue;

pub trait DocumentLoader {
    fn load(&self, location: &DocumentLocation, collector: &mut Collector) -> Option<Value>;
}

/// Unpacks a template archive (CSAR) and returns the location of its main document.
pub trait ArchiveHandler {
    fn main_template(&self, path: &str, collector: &mut Collector) -> Option<DocumentLocation>;
}

/// Reads local files. Remote locations are reported, not fetched.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl DocumentLoader for FsLoader {
    fn load(&self, location: &DocumentLocation, collector: &mut Collector) -> Option<Value> {
        let path = match location {
            DocumentLocation::File(path) => path,
            DocumentLocation::Url(url) => {
                error!(%url, "remote documents are not fetched by the filesystem loader");
                collector.push(Issue::UrlFailure {
                    what: format!(
                        "Error reaching server \"{}\": Reason is remote documents are not supported by the filesystem loader.",
                        url
                    ),
                });
                return None;
            }
        };

        debug!(path = %path.display(), "loading document");
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read document");
                collector.push(Issue::IoFailure {
                    path: location.to_string(),
                    reason: e.to_string(),
                });
                return None;
            }
        };
        parse_document(location, &source, collector)
    }
}

/// Serves documents from memory, keyed by their location string.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    documents: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, source: impl Into<String>) -> Self {
        self.documents.insert(location.into(), source.into());
        self
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, location: &DocumentLocation, collector: &mut Collector) -> Option<Value> {
        let key = location.to_string();
        match self.documents.get(&key) {
            Some(source) => parse_document(location, source, collector),
            None => {
                collector.push(Issue::IoFailure {
                    path: key,
                    reason: "No such document".into(),
                });
                None
            }
        }
    }
}

fn parse_document(
    location: &DocumentLocation,
    source: &str,
    collector: &mut Collector,
) -> Option<Value> {
    match serde_yaml::from_str::<Value>(source) {
        Ok(Value::Null) => Some(Value::Mapping(Mapping::new())),
        Ok(value) => Some(value),
        Err(e) => {
            error!(location = %location, error = %e, "failed to parse document");
            collector.push(Issue::ParseFailure {
                path: location.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}
