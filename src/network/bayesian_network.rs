use log::{debug, info};
use std::collections::BTreeMap;

use super::cpt::ConditionalProbabilityTable;
use super::dag::DirectedAcyclicGraph;
use super::markov_network::MarkovNetwork;
use super::sink::{GraphSink, NullGraphSink};
use crate::common::errors::{FactorError, Result};
use crate::factor::Factor;
use crate::table::backend::Storage;
use crate::table::models::Value;

/// A DAG holding exactly one CPT per node. Each CPT's givens become edges into its outcome.
#[derive(Debug)]
pub struct BayesianNetwork {
    graph: DirectedAcyclicGraph,
    cpts: BTreeMap<String, ConditionalProbabilityTable>,
    graphviz_dag: Box<dyn GraphSink>,
}

impl Default for BayesianNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianNetwork {
    pub fn new() -> Self {
        Self::with_sink(Box::new(NullGraphSink))
    }

    pub fn with_sink(graphviz_dag: Box<dyn GraphSink>) -> Self {
        BayesianNetwork {
            graph: DirectedAcyclicGraph::new(),
            cpts: BTreeMap::new(),
            graphviz_dag,
        }
    }

    /// Build from CPTs of endogenous variables and priors of exogenous ones.
    pub fn from_parts(
        cpts: Vec<ConditionalProbabilityTable>,
        priors: Vec<ConditionalProbabilityTable>,
        graphviz_dag: Option<Box<dyn GraphSink>>,
    ) -> Result<Self> {
        let mut network = match graphviz_dag {
            Some(sink) => Self::with_sink(sink),
            None => Self::new(),
        };
        for cpt in cpts {
            network.add_edge(cpt)?;
        }
        for prior in priors {
            network.add_node(prior)?;
        }
        Ok(network)
    }

    /// Add a prior: a CPT with no givens and a single outcome.
    pub fn add_node(&mut self, cpt: ConditionalProbabilityTable) -> Result<()> {
        if !cpt.get_givens().is_empty() {
            return Err(FactorError::PriorHasGivens {
                outcome: cpt.get_outcomes().join(", "),
                givens: cpt.get_givens().to_vec(),
            });
        }
        self.register(cpt)
    }

    pub fn add_prior(&mut self, cpt: ConditionalProbabilityTable) -> Result<()> {
        self.add_node(cpt)
    }

    /// Add a CPT with a single outcome, threading an edge from every given into it.
    pub fn add_edge(&mut self, cpt: ConditionalProbabilityTable) -> Result<()> {
        self.register(cpt)
    }

    pub fn add_cpt(&mut self, cpt: ConditionalProbabilityTable) -> Result<()> {
        self.add_edge(cpt)
    }

    /// Store `cpt` under its outcome. A CPT already stored for that outcome is replaced:
    /// its edges are retracted on a copy of the graph, the new edges are added to the copy,
    /// and the copy becomes live only if no edge closes a cycle.
    fn register(&mut self, cpt: ConditionalProbabilityTable) -> Result<()> {
        let outcome = cpt
            .outcome()
            .ok_or(FactorError::OutcomeArity(cpt.get_outcomes().len()))?
            .to_string();

        let previous_givens: Vec<String> = self
            .cpts
            .get(&outcome)
            .map(|previous| previous.get_givens().to_vec())
            .unwrap_or_default();

        let mut graph = self.graph.clone();
        for given in &previous_givens {
            graph.remove_edge(given, &outcome);
        }
        graph.add_node(&outcome);
        for given in cpt.get_givens() {
            graph.add_edge(given, &outcome)?;
        }
        self.graph = graph;

        for given in &previous_givens {
            if !cpt.get_givens().contains(given) {
                self.graphviz_dag.remove_edge(given, &outcome);
            }
        }
        self.graphviz_dag.node(&outcome);
        for given in cpt.get_givens() {
            self.graphviz_dag.edge(given, &outcome);
        }

        if self.cpts.insert(outcome.clone(), cpt).is_some() {
            debug!("replaced CPT for {}", outcome);
        } else {
            debug!("added CPT for {}", outcome);
        }
        Ok(())
    }

    /// Drop the CPT stored for `node` along with the edges it contributed.
    pub fn remove_cpt(&mut self, node: &str) -> Result<ConditionalProbabilityTable> {
        let cpt = self
            .cpts
            .remove(node)
            .ok_or_else(|| FactorError::UnknownNode(node.to_string()))?;
        for given in cpt.get_givens() {
            self.graph.remove_edge(given, node);
            self.graphviz_dag.remove_edge(given, node);
        }
        Ok(cpt)
    }

    pub fn find_cpt_for_node(&self, node: &str) -> Result<&ConditionalProbabilityTable> {
        self.cpts
            .get(node)
            .ok_or_else(|| FactorError::UnknownNode(node.to_string()))
    }

    /// Add one prior per entry of `priors`, each given as `(value, probability)` pairs.
    pub fn set_priors(
        &mut self,
        priors: &BTreeMap<String, Vec<(Value, f64)>>,
        storage: &Storage,
    ) -> Result<()> {
        for (variable, distribution) in priors {
            let cpt = ConditionalProbabilityTable::prior(storage, variable, distribution)?;
            self.add_prior(cpt)?;
        }
        Ok(())
    }

    pub fn cpts(&self) -> impl Iterator<Item = (&String, &ConditionalProbabilityTable)> {
        self.cpts.iter()
    }

    pub fn len(&self) -> usize {
        self.cpts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpts.is_empty()
    }

    pub fn graph(&self) -> &DirectedAcyclicGraph {
        &self.graph
    }

    pub fn get_parents(&self, node: &str) -> Vec<String> {
        self.graph.get_parents(node)
    }

    pub fn get_children(&self, node: &str) -> &[String] {
        self.graph.get_children(node)
    }

    pub fn get_neighbors(&self, node: &str) -> Vec<String> {
        self.graph.get_neighbors(node)
    }

    pub fn sink(&self) -> &dyn GraphSink {
        self.graphviz_dag.as_ref()
    }

    /// Feed the current structure to `sink`, for sinks attached after the network was built.
    pub fn replay_into(&self, sink: &mut dyn GraphSink) {
        for node in self.graph.nodes() {
            sink.node(node);
        }
        for node in self.graph.nodes() {
            for child in self.graph.get_children(node) {
                sink.edge(node, child);
            }
        }
    }

    /// Wrap every CPT as a factor. Each CPT already spans its outcome and all of its
    /// givens, so no moralizing edges are needed.
    pub fn to_markov_network(&self) -> Result<MarkovNetwork> {
        let mut markov_network = MarkovNetwork::new();
        for cpt in self.cpts.values() {
            markov_network.add_factor(Factor::from_cpt(cpt)?);
        }
        info!(
            "converted Bayesian network with {} CPTs into Markov network over {} variables",
            self.cpts.len(),
            markov_network.get_variables().len()
        );
        Ok(markov_network)
    }
}

impl std::fmt::Display for BayesianNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "BayesianNetwork(")?;
        for cpt in self.cpts.values() {
            writeln!(f, "    {}", cpt)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::sink::DotGraphSink;
    use crate::row;
    use crate::table::models::{Row, Table};

    fn cpt(
        columns: &[&str],
        rows: Vec<Row>,
        outcomes: &[&str],
        givens: &[&str],
    ) -> ConditionalProbabilityTable {
        let data = Storage::in_memory()
            .create(Table::from_rows(columns, rows).unwrap())
            .unwrap();
        ConditionalProbabilityTable::new(data, outcomes, givens).unwrap()
    }

    fn prior(variable: &str) -> ConditionalProbabilityTable {
        cpt(&[variable, "value"], vec![row![0, 0.5], row![1, 0.5]], &[variable], &[])
    }

    fn conditional(given: &str, outcome: &str) -> ConditionalProbabilityTable {
        cpt(
            &[given, outcome, "value"],
            vec![row![0, 0, 0.9], row![0, 1, 0.1], row![1, 0, 0.2], row![1, 1, 0.8]],
            &[outcome],
            &[given],
        )
    }

    #[test]
    fn test_add_node_rejects_givens() {
        let mut network = BayesianNetwork::new();
        let result = network.add_node(conditional("X", "Z"));
        assert!(matches!(result, Err(FactorError::PriorHasGivens { .. })));
        assert!(network.is_empty());
    }

    #[test]
    fn test_outcome_arity() {
        let mut network = BayesianNetwork::new();
        let joint = cpt(&["X", "Y", "value"], vec![row![0, 0, 1.0]], &["X", "Y"], &[]);
        assert!(matches!(network.add_edge(joint.clone()), Err(FactorError::OutcomeArity(2))));
        assert!(matches!(network.add_node(joint), Err(FactorError::OutcomeArity(2))));
    }

    #[test]
    fn test_prior_becomes_node() {
        let mut network = BayesianNetwork::new();
        network.add_prior(prior("X")).unwrap();
        assert!(network.graph().contains("X"));
        assert!(network.find_cpt_for_node("X").is_ok());
        assert!(matches!(
            network.find_cpt_for_node("Y"),
            Err(FactorError::UnknownNode(n)) if n == "Y"
        ));
    }

    #[test]
    fn test_replacing_cpt_retracts_old_edges() {
        let mut network = BayesianNetwork::with_sink(Box::new(DotGraphSink::new()));
        network.add_edge(conditional("X", "Z")).unwrap();
        network.add_edge(conditional("Y", "Z")).unwrap();

        assert_eq!(network.get_parents("Z"), vec!["Y".to_string()]);
        assert!(network.get_children("X").is_empty());
        assert_eq!(network.find_cpt_for_node("Z").unwrap().get_givens(), &["Y".to_string()]);

        let dot = network.sink().render().unwrap();
        assert!(dot.contains("\"Y\" -> \"Z\""));
        assert!(!dot.contains("\"X\" -> \"Z\""));
    }

    #[test]
    fn test_cycle_leaves_network_unchanged() {
        let mut network = BayesianNetwork::new();
        network.add_edge(conditional("X", "Z")).unwrap();
        let result = network.add_edge(conditional("Z", "X"));
        assert!(matches!(result, Err(FactorError::CycleDetected { .. })));
        assert!(network.find_cpt_for_node("X").is_err());
        assert!(network.get_children("Z").is_empty());
    }

    #[test]
    fn test_remove_cpt() {
        let mut network = BayesianNetwork::new();
        network.add_edge(conditional("X", "Z")).unwrap();
        let removed = network.remove_cpt("Z").unwrap();
        assert_eq!(removed.outcome(), Some("Z"));
        assert!(network.get_parents("Z").is_empty());
        assert!(network.remove_cpt("Z").is_err());
    }

    #[test]
    fn test_set_priors() {
        let mut network = BayesianNetwork::new();
        let priors = BTreeMap::from([
            ("X".to_string(), vec![(Value::from(0), 0.7), (Value::from(1), 0.3)]),
            ("Y".to_string(), vec![(Value::from("a"), 1.0)]),
        ]);
        network.set_priors(&priors, &Storage::in_memory()).unwrap();
        assert_eq!(network.len(), 2);
        let table = network.find_cpt_for_node("X").unwrap().read().unwrap();
        assert_eq!(table.weight_where(&[("X", Value::from(1))]), Some(0.3));
    }

    #[test]
    fn test_replay_into() {
        let mut network = BayesianNetwork::new();
        network.add_edge(conditional("X", "Z")).unwrap();
        network.add_prior(prior("X")).unwrap();

        let mut sink = DotGraphSink::new();
        network.replay_into(&mut sink);
        assert_eq!(
            sink.render().unwrap(),
            "digraph {\n    \"X\";\n    \"Z\";\n    \"X\" -> \"Z\";\n}\n"
        );
    }

    #[test]
    fn test_from_parts() {
        let network = BayesianNetwork::from_parts(
            vec![conditional("X", "Z")],
            vec![prior("X")],
            None,
        )
        .unwrap();
        assert_eq!(network.len(), 2);
        assert_eq!(network.get_parents("Z"), vec!["X".to_string()]);
        assert!(network.to_string().contains("P(Z | X)"));
    }
}
