//! Visualization hooks fired as a Bayesian network gains nodes and edges.

use std::fmt::Debug;

/// Receives structural changes. Calls are fire-and-forget; the network never reads
/// anything back except through [`GraphSink::render`].
pub trait GraphSink: Send + Debug {
    fn node(&mut self, name: &str);

    fn edge(&mut self, from: &str, to: &str);

    /// Called when a replaced CPT retracts an edge.
    fn remove_edge(&mut self, _from: &str, _to: &str) {}

    /// Rendered form of everything received so far, if the sink produces one.
    fn render(&self) -> Option<String> {
        None
    }
}

/// Default sink. Does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGraphSink;

impl GraphSink for NullGraphSink {
    fn node(&mut self, _name: &str) {}

    fn edge(&mut self, _from: &str, _to: &str) {}
}

/// Records nodes and edges and renders them as a Graphviz `digraph`.
#[derive(Debug, Default, Clone)]
pub struct DotGraphSink {
    nodes: Vec<String>,
    edges: Vec<(String, String)>,
}

impl DotGraphSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, name: &str) {
        if !self.nodes.iter().any(|n| n == name) {
            self.nodes.push(name.to_string());
        }
    }
}

impl GraphSink for DotGraphSink {
    fn node(&mut self, name: &str) {
        self.ensure_node(name);
    }

    fn edge(&mut self, from: &str, to: &str) {
        self.ensure_node(from);
        self.ensure_node(to);
        if !self.edges.iter().any(|(f, t)| f == from && t == to) {
            self.edges.push((from.to_string(), to.to_string()));
        }
    }

    fn remove_edge(&mut self, from: &str, to: &str) {
        self.edges.retain(|(f, t)| !(f == from && t == to));
    }

    fn render(&self) -> Option<String> {
        let mut dot = String::from("digraph {\n");
        for node in &self.nodes {
            dot.push_str(&format!("    {:?};\n", node));
        }
        for (from, to) in &self.edges {
            dot.push_str(&format!("    {:?} -> {:?};\n", from, to));
        }
        dot.push_str("}\n");
        Some(dot)
    }
}
