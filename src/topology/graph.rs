//! petgraph-based dependency graph over a topology's node templates.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::debug;

use super::node_template::NodeTemplate;

/// An edge from a node template to the node template one of its requirements
/// targets, labelled with the requirement name.
#[derive(Debug)]
pub struct TopologyGraph {
    pub graph: DiGraph<String, String>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl TopologyGraph {
    /// Requirements that target node types rather than templates add no edge.
    pub fn build(node_templates: &[NodeTemplate]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        // Add all nodes
        for node in node_templates {
            let idx = graph.add_node(node.name.clone());
            node_indices.insert(node.name.clone(), idx);
        }

        // Add requirement edges
        for node in node_templates {
            let Some(requirements) = node.requirements() else {
                continue;
            };
            let Some(&source) = node_indices.get(&node.name) else {
                continue;
            };
            for assignment in requirements.normalize() {
                let Some(target) = assignment.node() else {
                    continue;
                };
                match node_indices.get(target) {
                    Some(&t) => {
                        graph.add_edge(source, t, assignment.name.clone());
                    }
                    None => {
                        debug!(node = %node.name, requirement = %assignment.name, target_node = target, "requirement target is not a node template");
                    }
                }
            }
        }

        TopologyGraph { graph, node_indices }
    }

    /// `(requirement, target)` pairs of a node template.
    pub fn requirement_targets(&self, node: &str) -> Vec<(&str, &str)> {
        let Some(&idx) = self.node_indices.get(node) else {
            return vec![];
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (edge.weight().as_str(), self.graph[edge.target()].as_str()))
            .collect()
    }

    /// Node templates with a requirement on `node`.
    pub fn dependents(&self, node: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(node) else {
            return vec![];
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Node templates ordered so that requirement targets come first; `None`
    /// when requirements form a cycle.
    pub fn deployment_order(&self) -> Option<Vec<&str>> {
        let mut order = toposort(&self.graph, None).ok()?;
        order.reverse();
        Some(order.into_iter().map(|idx| self.graph[idx].as_str()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Collector;
    use crate::types::TypeRegistry;

    fn nodes(yaml: &str) -> Vec<NodeTemplate> {
        let registry = TypeRegistry::default();
        let mut collector = Collector::new();
        let map: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
        map.iter()
            .filter_map(|(name, body)| NodeTemplate::new(name.as_str().unwrap(), body, &registry, &mut collector))
            .collect()
    }

    #[test]
    fn requirement_edges_and_order() {
        let graph = TopologyGraph::build(&nodes(
            r#"
app: {type: tosca.nodes.WebApplication, requirements: [{host: web}]}
web: {type: tosca.nodes.WebServer, requirements: [{host: server}]}
server: {type: tosca.nodes.Compute}
"#,
        ));
        assert_eq!(graph.requirement_targets("app"), vec![("host", "web")]);
        assert_eq!(graph.dependents("server"), vec!["web"]);
        assert!(!graph.is_cyclic());
        assert_eq!(graph.deployment_order().unwrap(), vec!["server", "web", "app"]);
    }

    #[test]
    fn cycles_have_no_order() {
        let graph = TopologyGraph::build(&nodes(
            r#"
a: {type: tosca.nodes.Root, requirements: [{dependency: b}]}
b: {type: tosca.nodes.Root, requirements: [{dependency: a}]}
"#,
        ));
        assert!(graph.is_cyclic());
        assert!(graph.deployment_order().is_none());
    }
}
