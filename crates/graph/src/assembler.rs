use crate::routes::Route;
use crate::types::Edge;
use std::collections::HashSet;

/// Deduplicated node names and edges covered by a set of routes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledSubgraph {
    pub nodes: HashSet<String>,
    pub edges: HashSet<Edge>,
}

impl AssembledSubgraph {
    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reduces routes into the subgraph they cover
pub struct SubgraphAssembler;

impl SubgraphAssembler {
    pub fn assemble<'a>(routes: impl IntoIterator<Item = &'a Route>) -> AssembledSubgraph {
        let mut subgraph = AssembledSubgraph::default();

        for route in routes {
            subgraph.nodes.extend(route.nodes().iter().cloned());
            for (from, to) in route.hops() {
                subgraph.edges.insert(Edge::new(from, to));
            }
        }

        subgraph
    }
}
