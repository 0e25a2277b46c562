use crate::error::{GraphError, Result};
use crate::types::{Edge, GraphSource, ServiceGraph, ServiceNode};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

impl ServiceGraph {
    /// Build graph from node and edge records
    ///
    /// Duplicate node names fail the build. Edges naming an unknown endpoint
    /// are dropped, and repeated edges collapse into one.
    pub fn build(
        nodes: impl IntoIterator<Item = ServiceNode>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut name_index: HashMap<String, NodeIndex> = HashMap::new();

        for node in nodes {
            if name_index.contains_key(&node.name) {
                return Err(GraphError::ValidationError(format!(
                    "duplicate node name '{}'",
                    node.name
                )));
            }
            let name = node.name.clone();
            let idx = graph.add_node(node);
            name_index.insert(name, idx);
        }

        let mut dropped = 0usize;
        for edge in edges {
            let (Some(&from), Some(&to)) = (name_index.get(&edge.from), name_index.get(&edge.to))
            else {
                log::debug!("Dropping edge {} -> {}: unknown endpoint", edge.from, edge.to);
                dropped += 1;
                continue;
            };
            graph.update_edge(from, to, ());
        }

        log::info!(
            "Built service graph: {} nodes, {} edges ({} dropped)",
            graph.node_count(),
            graph.edge_count(),
            dropped
        );

        Ok(Self { graph, name_index })
    }

    /// Build graph from a deserialized graph source
    pub fn from_source(source: GraphSource) -> Result<Self> {
        let edges: Vec<Edge> = source
            .edges
            .into_iter()
            .flat_map(|record| record.into_edges())
            .collect();
        Self::build(source.nodes, edges)
    }

    /// Parse a JSON graph source and build the graph
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let source: GraphSource = serde_json::from_slice(bytes)?;
        Self::from_source(source)
    }

    /// Find node by name
    pub fn node(&self, name: &str) -> Option<&ServiceNode> {
        self.index_of(name)
            .and_then(|idx| self.graph.node_weight(idx))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Names of nodes this node calls, in insertion order
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.neighbor_names(name, Direction::Outgoing)
    }

    /// Names of nodes calling this node, in insertion order
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.neighbor_names(name, Direction::Incoming)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ServiceNode> {
        self.graph.node_weights()
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_references().map(move |e| {
            Edge::new(
                self.graph[e.source()].name.as_str(),
                self.graph[e.target()].name.as_str(),
            )
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.name_index.get(name).copied()
    }

    pub(crate) fn weight(&self, idx: NodeIndex) -> &ServiceNode {
        &self.graph[idx]
    }

    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    /// Successor indices sorted by insertion order
    ///
    /// petgraph walks adjacency lists newest-first, so traversal order is
    /// pinned here.
    pub(crate) fn successor_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(idx, Direction::Outgoing)
    }

    fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    fn neighbor_names(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(idx) = self.index_of(name) else {
            return Vec::new();
        };
        self.sorted_neighbors(idx, direction)
            .into_iter()
            .map(|n| self.graph[n].name.as_str())
            .collect()
    }
}
