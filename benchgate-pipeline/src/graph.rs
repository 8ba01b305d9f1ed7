//! Job dependency graph
//!
//! Edges point from a job to the jobs it needs. Ordering is deterministic:
//! nodes keep insertion order and each node's dependencies are sorted.

use fxhash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Errors from graph operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// A cycle runs through this node.
    #[error("cycle detected through `{0}`")]
    CycleDetected(String),

    /// The node was never added.
    #[error("unknown job `{0}`")]
    UnknownNode(String),
}

/// Dependency graph over job ids.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    order: Vec<String>,
    index: FxHashSet<String>,
    edges: FxHashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it is not present yet.
    pub fn add_node(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.index.insert(id.clone()) {
            self.order.push(id);
        }
    }

    /// Record that `from` needs `to`. Both nodes are added if missing.
    pub fn add_dependency(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let (from, to) = (from.into(), to.into());
        self.add_node(from.clone());
        self.add_node(to.clone());
        let deps = self.edges.entry(from).or_default();
        if let Err(pos) = deps.binary_search(&to) {
            deps.insert(pos, to);
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.order
    }

    /// Whether `id` is a node.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Jobs `id` needs, sorted.
    pub fn dependencies(&self, id: &str) -> Result<&[String], GraphError> {
        if !self.contains(id) {
            return Err(GraphError::UnknownNode(id.to_string()));
        }
        Ok(self.edges.get(id).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Jobs that need `id`, in insertion order.
    pub fn dependents(&self, id: &str) -> Result<Vec<&str>, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::UnknownNode(id.to_string()));
        }
        Ok(self
            .order
            .iter()
            .filter(|n| self.edges.get(*n).is_some_and(|d| d.iter().any(|x| x == id)))
            .map(String::as_str)
            .collect())
    }

    /// All `(from, to)` pairs, sorted.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = self
            .edges
            .iter()
            .flat_map(|(from, deps)| deps.iter().map(move |to| (from.as_str(), to.as_str())))
            .collect();
        out.sort_unstable();
        out
    }

    /// Nodes ordered so that every dependency precedes its dependents.
    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        let mut result = Vec::with_capacity(self.order.len());
        let mut done = FxHashSet::default();
        let mut in_progress = FxHashSet::default();
        for node in &self.order {
            self.visit(node, &mut done, &mut in_progress, &mut result)?;
        }
        Ok(result)
    }

    fn visit(
        &self,
        node: &str,
        done: &mut FxHashSet<String>,
        in_progress: &mut FxHashSet<String>,
        result: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        if done.contains(node) {
            return Ok(());
        }
        if !in_progress.insert(node.to_string()) {
            return Err(GraphError::CycleDetected(node.to_string()));
        }
        for dep in self.edges.get(node).into_iter().flatten() {
            self.visit(dep, done, in_progress, result)?;
        }
        in_progress.remove(node);
        done.insert(node.to_string());
        result.push(node.to_string());
        Ok(())
    }

    /// Group nodes into levels: a node sits one level after the deepest
    /// node it needs. Nodes in a level have no edges between them.
    pub fn stages(&self) -> Result<Vec<Vec<String>>, GraphError> {
        let sorted = self.topological_sort()?;
        let mut level: FxHashMap<&str, usize> = FxHashMap::default();
        for node in &sorted {
            let depth = self
                .edges
                .get(node)
                .into_iter()
                .flatten()
                .map(|dep| level.get(dep.as_str()).copied().unwrap_or(0) + 1)
                .max()
                .unwrap_or(0);
            level.insert(node.as_str(), depth);
        }

        let depth = level.values().copied().max().map_or(0, |d| d + 1);
        let mut stages = vec![Vec::new(); depth];
        for node in &self.order {
            stages[level[node.as_str()]].push(node.clone());
        }
        Ok(stages)
    }
}
