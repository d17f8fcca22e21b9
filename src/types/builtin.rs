//! Embedded normative type definitions and the supported template versions.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_yaml::{Mapping, Value};
use tracing::error;

use crate::parse::display_value;

const SIMPLE_DEFINITIONS: &str = include_str!("definitions/tosca_simple_yaml_1_0.yaml");
const NFV_DEFINITIONS: &str = include_str!("definitions/tosca_simple_profile_for_nfv_1_0_0.yaml");

pub const STANDARD_VERSIONS: [&str; 3] = [
    "tosca_simple_yaml_1_0",
    "tosca_simple_yaml_1_2",
    "tosca_simple_yaml_1_3",
];

pub const NFV_VERSION: &str = "tosca_simple_profile_for_nfv_1_0_0";

/// Sections every supported version accepts beyond the base section set.
const ADDITIONAL_SECTIONS: [&str; 1] = ["metadata"];

/// Which set of builtin definitions a template sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Simple,
    Nfv,
}

impl Profile {
    /// The profile for a supported version, `None` for an unsupported one.
    pub fn for_version(version: &str) -> Option<Profile> {
        if STANDARD_VERSIONS.contains(&version) {
            Some(Profile::Simple)
        } else if version == NFV_VERSION {
            Some(Profile::Nfv)
        } else {
            None
        }
    }

    pub fn valid_versions() -> Vec<&'static str> {
        let mut versions: Vec<&str> = STANDARD_VERSIONS.to_vec();
        versions.push(NFV_VERSION);
        versions.sort_unstable();
        versions
    }

    pub fn is_standard(version: &str) -> bool {
        STANDARD_VERSIONS.contains(&version)
    }

    /// Extra top-level sections allowed for `version`.
    pub fn additional_sections(version: &str) -> &'static [&'static str] {
        if Profile::for_version(version).is_some() {
            &ADDITIONAL_SECTIONS
        } else {
            &[]
        }
    }

    pub fn definitions(self) -> &'static HashMap<String, Mapping> {
        static SIMPLE: OnceLock<HashMap<String, Mapping>> = OnceLock::new();
        static NFV: OnceLock<HashMap<String, Mapping>> = OnceLock::new();
        match self {
            Profile::Simple => SIMPLE.get_or_init(|| load(&[SIMPLE_DEFINITIONS])),
            Profile::Nfv => NFV.get_or_init(|| load(&[SIMPLE_DEFINITIONS, NFV_DEFINITIONS])),
        }
    }
}

fn load(sources: &[&str]) -> HashMap<String, Mapping> {
    let mut definitions = HashMap::new();
    for source in sources {
        let parsed: Mapping = match serde_yaml::from_str(source) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "embedded type definitions failed to parse");
                continue;
            }
        };
        for (name, body) in parsed {
            if let Value::Mapping(body) = body {
                definitions.insert(display_value(&name), body);
            }
        }
    }
    definitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_definitions_parse() {
        let simple = Profile::Simple.definitions();
        assert!(simple.contains_key("tosca.nodes.Root"));
        assert!(simple.contains_key("tosca.datatypes.network.PortSpec"));
        assert!(!simple.contains_key("tosca.nodes.nfv.VNF"));

        let nfv = Profile::Nfv.definitions();
        assert!(nfv.contains_key("tosca.nodes.Root"));
        assert!(nfv.contains_key("tosca.nodes.nfv.VNF"));
    }

    #[test]
    fn versions_map_to_profiles() {
        assert_eq!(Profile::for_version("tosca_simple_yaml_1_3"), Some(Profile::Simple));
        assert_eq!(Profile::for_version(NFV_VERSION), Some(Profile::Nfv));
        assert_eq!(Profile::for_version("tosca_simple_yaml_9_9"), None);
        assert!(Profile::additional_sections("tosca_simple_yaml_9_9").is_empty());
    }
}
