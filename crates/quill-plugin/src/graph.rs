//! Plugin dependency graph: cycle detection and dependency-first ordering.

use std::collections::{BTreeMap, HashMap};

use crate::descriptor::PluginDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Directed graph from each plugin id to the ids it depends on.
///
/// Edges to ids that are not nodes of the graph are treated as external
/// and ignored by traversal.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a set of descriptors.
    pub fn from_descriptors<'a>(descriptors: impl IntoIterator<Item = &'a PluginDescriptor>) -> Self {
        let mut graph = Self::new();
        for d in descriptors {
            graph.add_node(d.id(), d.dependency_ids());
        }
        graph
    }

    /// Adds (or replaces) a node with its dependency edges.
    pub fn add_node<I, S>(&mut self, id: impl Into<String>, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edges
            .insert(id.into(), dependencies.into_iter().map(Into::into).collect());
    }

    /// Whether `id` is a node of the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns the first cycle found, as a closed path (`a -> b -> a`).
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        self.topological_order().err()
    }

    /// Orders all nodes so that every dependency precedes its dependents.
    ///
    /// Nodes are visited in id order, so the result is deterministic. On a
    /// cycle, returns the cycle as a closed path.
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.edges.len());
        let mut stack: Vec<&str> = Vec::new();
        let mut order = Vec::with_capacity(self.edges.len());

        for id in self.edges.keys() {
            self.visit(id, &mut marks, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<(), Vec<String>> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::OnStack) => {
                // Revisited while still on the recursion stack.
                let start = stack.iter().position(|s| *s == id).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(id.to_string());
                return Err(cycle);
            }
            None => {}
        }

        let Some(dependencies) = self.edges.get(id) else {
            return Ok(());
        };

        marks.insert(id, Mark::OnStack);
        stack.push(id);

        for dep in dependencies {
            if self.edges.contains_key(dep.as_str()) {
                self.visit(dep, marks, stack, order)?;
            }
        }

        stack.pop();
        marks.insert(id, Mark::Done);
        order.push(id.to_string());
        Ok(())
    }
}
