use log::trace;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::common::errors::{FactorError, Result};

/// Directed graph over variable names that refuses edges closing a cycle.
///
/// Only child lists are stored; parents are found by scanning them.
#[derive(Debug, Clone, Default)]
pub struct DirectedAcyclicGraph {
    nodes: BTreeSet<String>,
    children: BTreeMap<String, Vec<String>>,
}

impl DirectedAcyclicGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn add_node(&mut self, node: &str) {
        if self.nodes.insert(node.to_string()) {
            trace!("added node {}", node);
        }
    }

    /// Add `start -> end`. Both endpoints become nodes. Re-adding an existing edge is a no-op;
    /// an edge that would close a cycle is rejected and leaves the graph unchanged.
    pub fn add_edge(&mut self, start: &str, end: &str) -> Result<()> {
        if self.get_children(start).iter().any(|c| c == end) {
            return Ok(());
        }
        if start == end || self.has_path(end, start) {
            return Err(FactorError::CycleDetected {
                from: start.to_string(),
                to: end.to_string(),
            });
        }
        self.add_node(start);
        self.add_node(end);
        self.children
            .entry(start.to_string())
            .or_default()
            .push(end.to_string());
        trace!("added edge {} -> {}", start, end);
        Ok(())
    }

    /// Remove `start -> end`, returning whether it existed. Nodes stay.
    pub fn remove_edge(&mut self, start: &str, end: &str) -> bool {
        let Some(children) = self.children.get_mut(start) else {
            return false;
        };
        let before = children.len();
        children.retain(|c| c != end);
        let removed = children.len() != before;
        if children.is_empty() {
            self.children.remove(start);
        }
        removed
    }

    pub fn nodes(&self) -> &BTreeSet<String> {
        &self.nodes
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    /// Nodes with an edge into `node`.
    pub fn get_parents(&self, node: &str) -> Vec<String> {
        self.children
            .iter()
            .filter(|(_, children)| children.iter().any(|c| c == node))
            .map(|(parent, _)| parent.clone())
            .collect()
    }

    pub fn get_children(&self, node: &str) -> &[String] {
        self.children.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parents followed by children.
    pub fn get_neighbors(&self, node: &str) -> Vec<String> {
        let mut neighbors = self.get_parents(node);
        neighbors.extend(self.get_children(node).iter().cloned());
        neighbors
    }

    /// Whether `end` is reachable from `start` along directed edges.
    pub fn has_path(&self, start: &str, end: &str) -> bool {
        let mut stack = vec![start];
        let mut seen: HashSet<&str> = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == end {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            stack.extend(self.get_children(node).iter().map(String::as_str));
        }
        false
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }
}
