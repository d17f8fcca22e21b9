//! Requirement assignments, written either as a map or as a list of
//! single-key maps.

use serde_yaml::{Mapping, Value};

use crate::parse::display_value;

#[derive(Debug, Clone, PartialEq)]
pub struct RequirementAssignment {
    pub name: String,
    pub target: Value,
}

impl RequirementAssignment {
    /// The node template this requirement points at: `req: node` or
    /// `req: {node: name, ...}`.
    pub fn node(&self) -> Option<&str> {
        match &self.target {
            Value::String(node) => Some(node),
            Value::Mapping(map) => map.get("node").and_then(Value::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Requirements {
    Map(Mapping),
    List(Vec<Value>),
}

impl Default for Requirements {
    fn default() -> Self {
        Requirements::List(Vec::new())
    }
}

impl Requirements {
    /// `None` when the value is neither a map nor a list. An absent section is empty.
    pub fn parse(value: Option<&Value>) -> Option<Requirements> {
        match value {
            None | Some(Value::Null) => Some(Requirements::default()),
            Some(Value::Mapping(map)) => Some(Requirements::Map(map.clone())),
            Some(Value::Sequence(items)) => Some(Requirements::List(items.clone())),
            Some(_) => None,
        }
    }

    /// One assignment per requirement name, in declaration order.
    pub fn normalize(&self) -> Vec<RequirementAssignment> {
        let entries: Box<dyn Iterator<Item = (&Value, &Value)>> = match self {
            Requirements::Map(map) => Box::new(map.iter()),
            Requirements::List(items) => Box::new(
                items
                    .iter()
                    .filter_map(Value::as_mapping)
                    .flat_map(|entry| entry.iter()),
            ),
        };
        entries
            .map(|(name, target)| RequirementAssignment {
                name: display_value(name),
                target: target.clone(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.normalize().into_iter().map(|r| r.name).collect()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Requirements::Map(map) => map.is_empty(),
            Requirements::List(items) => items.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Option<Requirements> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        Requirements::parse(Some(&value))
    }

    #[test]
    fn both_forms_normalize_to_the_same_assignments() {
        let map = parse("{host: server, link: {node: net}}").unwrap();
        let list = parse("[{host: server}, {link: {node: net}}]").unwrap();
        assert_eq!(map.normalize(), list.normalize());
        assert_eq!(list.names(), vec!["host", "link"]);
        assert_eq!(list.normalize()[1].node(), Some("net"));
    }

    #[test]
    fn scalars_are_rejected_and_absence_is_empty() {
        assert!(parse("just-a-string").is_none());
        assert!(Requirements::parse(None).unwrap().is_empty());
    }
}
