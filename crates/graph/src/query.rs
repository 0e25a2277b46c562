use crate::assembler::SubgraphAssembler;
use crate::error::{GraphError, Result};
use crate::predicate::{FilterFlags, PredicateSet};
use crate::routes::{Route, RouteEnumerator};
use crate::types::{Edge, ServiceGraph, ServiceNode};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Maximum route length, in edges, when the caller gives none
pub const DEFAULT_CUTOFF: usize = 10;

/// Reject negative cutoffs coming from untyped callers
pub fn validate_cutoff(cutoff: i64) -> Result<usize> {
    usize::try_from(cutoff).map_err(|_| {
        GraphError::InvalidArgument(format!("cutoff must be non-negative, got {cutoff}"))
    })
}

/// Nodes and edges of every qualifying route, with full node records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredSubgraph {
    pub nodes: Vec<ServiceNode>,
    pub edges: Vec<Edge>,
}

impl FilteredSubgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }
}

/// Result of one query
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Qualifying routes; `None` when no filter was enabled and enumeration was skipped
    pub routes: Option<Vec<Route>>,
    pub subgraph: FilteredSubgraph,
}

/// One filtered route query against a service graph
#[derive(Debug)]
pub struct RouteQuery {
    predicates: PredicateSet,
    cutoff: usize,
}

impl RouteQuery {
    pub fn new(predicates: PredicateSet) -> Self {
        Self {
            predicates,
            cutoff: DEFAULT_CUTOFF,
        }
    }

    pub fn from_flags(flags: FilterFlags) -> Self {
        Self::new(PredicateSet::from_flags(flags))
    }

    pub fn with_cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    pub fn predicates(&self) -> &PredicateSet {
        &self.predicates
    }

    pub fn execute(&self, graph: &ServiceGraph) -> QueryOutcome {
        if self.predicates.is_empty() {
            log::debug!("No filters enabled; returning full graph");
            return QueryOutcome {
                routes: None,
                subgraph: FilteredSubgraph {
                    nodes: graph.nodes().cloned().collect(),
                    edges: graph.edges().collect(),
                },
            };
        }

        let starts: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&idx| self.predicates.accepts_start(graph.weight(idx)))
            .collect();
        let ends: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&idx| self.predicates.accepts_end(graph.weight(idx)))
            .collect();

        log::debug!(
            "Query {:?}: {} start candidates, {} end candidates, cutoff {}",
            self.predicates.names(),
            starts.len(),
            ends.len(),
            self.cutoff
        );

        if starts.is_empty() || ends.is_empty() {
            return QueryOutcome {
                routes: Some(Vec::new()),
                subgraph: FilteredSubgraph::default(),
            };
        }

        let routes = RouteEnumerator::new(graph, self.cutoff).enumerate_indices(
            &starts,
            &ends,
            self.predicates.content_predicates(),
        );
        let covered = SubgraphAssembler::assemble(&routes);

        // Graph order keeps repeated queries byte-identical
        let subgraph = FilteredSubgraph {
            nodes: graph
                .nodes()
                .filter(|node| covered.contains_node(&node.name))
                .cloned()
                .collect(),
            edges: graph
                .edges()
                .filter(|edge| covered.contains_edge(edge))
                .collect(),
        };

        log::debug!(
            "Query matched {} routes covering {} nodes, {} edges",
            routes.len(),
            subgraph.nodes.len(),
            subgraph.edges.len()
        );

        QueryOutcome {
            routes: Some(routes),
            subgraph,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{PubliclyExposed, SinkKind};
    use pretty_assertions::assert_eq;

    fn chain() -> ServiceGraph {
        ServiceGraph::build(
            vec![
                ServiceNode::new("web", "service").with_public_exposed(true),
                ServiceNode::new("api", "service"),
                ServiceNode::new("db", "rds"),
            ],
            vec![Edge::new("web", "api"), Edge::new("api", "db")],
        )
        .unwrap()
    }

    #[test]
    fn test_no_filters_skips_enumeration() {
        let graph = chain();

        let outcome = RouteQuery::new(PredicateSet::new()).execute(&graph);

        assert!(outcome.routes.is_none());
        assert_eq!(outcome.subgraph.node_names(), vec!["web", "api", "db"]);
        assert_eq!(outcome.subgraph.edges.len(), 2);
    }

    #[test]
    fn test_empty_end_candidates_short_circuit() {
        let graph = chain();
        let predicates = PredicateSet::new()
            .with_start(PubliclyExposed)
            .with_end(SinkKind::new(["sqs"]));

        let outcome = RouteQuery::new(predicates).execute(&graph);

        assert_eq!(outcome.routes.map(|r| r.len()), Some(0));
        assert!(outcome.subgraph.is_empty());
    }

    #[test]
    fn test_subgraph_carries_full_node_records() {
        let mut graph_nodes = vec![
            ServiceNode::new("web", "service")
                .with_public_exposed(true)
                .with_language("typescript"),
            ServiceNode::new("db", "rds"),
        ];
        graph_nodes[1]
            .metadata
            .insert("engine".to_string(), serde_json::json!("postgres"));
        let graph = ServiceGraph::build(graph_nodes.clone(), vec![Edge::new("web", "db")]).unwrap();

        let outcome = RouteQuery::from_flags(FilterFlags {
            start_public: true,
            end_sink: true,
            has_vuln_filter: false,
        })
        .execute(&graph);

        assert_eq!(outcome.subgraph.nodes, graph_nodes);
        assert_eq!(outcome.subgraph.edges, vec![Edge::new("web", "db")]);
    }

    #[test]
    fn test_default_cutoff() {
        assert_eq!(RouteQuery::new(PredicateSet::new()).cutoff(), DEFAULT_CUTOFF);
        assert_eq!(validate_cutoff(0).unwrap(), 0);
    }
}
