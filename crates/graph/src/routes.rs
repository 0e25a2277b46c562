use crate::error::{GraphError, Result};
use crate::predicate::{ContentPredicate, NodeLookup};
use crate::types::ServiceGraph;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Simple call route: distinct node names joined by existing edges
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route {
    nodes: Vec<String>,
}

impl Route {
    pub fn new(nodes: Vec<String>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn start(&self) -> Option<&str> {
        self.nodes.first().map(String::as_str)
    }

    pub fn end(&self) -> Option<&str> {
        self.nodes.last().map(String::as_str)
    }

    /// Number of edges on the route
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consecutive `(from, to)` pairs
    pub fn hops(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }
}

/// Enumerates bounded simple routes between candidate endpoints
pub struct RouteEnumerator<'g> {
    graph: &'g ServiceGraph,
    cutoff: usize,
}

impl<'g> RouteEnumerator<'g> {
    /// `cutoff` is the maximum number of edges in a route
    pub fn new(graph: &'g ServiceGraph, cutoff: usize) -> Self {
        Self { graph, cutoff }
    }

    /// Routes from any start to any other end passing every content predicate
    pub fn enumerate(
        &self,
        starts: &[&str],
        ends: &[&str],
        contents: &[Box<dyn ContentPredicate>],
    ) -> Result<Vec<Route>> {
        let starts = self.resolve(starts)?;
        let ends = self.resolve(ends)?;
        Ok(self.enumerate_indices(&starts, &ends, contents))
    }

    /// Every simple route from `start` to `end` within the cutoff
    pub fn simple_routes(&self, start: &str, end: &str) -> Result<Vec<Route>> {
        self.enumerate(&[start], &[end], &[])
    }

    pub(crate) fn enumerate_indices(
        &self,
        starts: &[NodeIndex],
        ends: &[NodeIndex],
        contents: &[Box<dyn ContentPredicate>],
    ) -> Vec<Route> {
        let lookup: &dyn NodeLookup = self.graph;
        let mut routes = Vec::new();

        for &start in starts {
            for &end in ends {
                if start == end {
                    continue;
                }
                self.walk_pair(start, end, |route| {
                    if contents.iter().all(|p| p.accepts(&route, lookup)) {
                        routes.push(route);
                    }
                });
            }
        }

        routes
    }

    /// Iterative depth-limited DFS from `start`, emitting each simple path to `end`
    fn walk_pair(&self, start: NodeIndex, end: NodeIndex, mut emit: impl FnMut(Route)) {
        if self.cutoff == 0 {
            return;
        }

        let mut path = vec![start];
        let mut on_path: HashSet<NodeIndex> = HashSet::from([start]);
        let mut stack = vec![self.graph.successor_indices(start).into_iter()];

        while let Some(children) = stack.last_mut() {
            let Some(child) = children.next() else {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
                continue;
            };

            if on_path.contains(&child) {
                continue;
            }

            if child == end {
                // path.len() edges once `end` is appended
                emit(self.to_route(&path, end));
                continue;
            }

            // descending makes path.len() edges; `end` still needs one more
            if path.len() < self.cutoff {
                path.push(child);
                on_path.insert(child);
                stack.push(self.graph.successor_indices(child).into_iter());
            }
        }
    }

    fn to_route(&self, path: &[NodeIndex], end: NodeIndex) -> Route {
        Route::new(
            path.iter()
                .chain(std::iter::once(&end))
                .map(|&idx| self.graph.weight(idx).name.clone())
                .collect(),
        )
    }

    fn resolve(&self, names: &[&str]) -> Result<Vec<NodeIndex>> {
        names
            .iter()
            .map(|name| {
                self.graph
                    .index_of(name)
                    .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::HasVulnerability;
    use crate::types::{Edge, ServiceNode};
    use pretty_assertions::assert_eq;

    fn names(routes: &[Route]) -> Vec<Vec<&str>> {
        routes
            .iter()
            .map(|r| r.nodes().iter().map(String::as_str).collect())
            .collect()
    }

    /// a -> b -> c -> d, a -> c, c -> a (cycle), b -> d
    fn diamond_with_cycle() -> ServiceGraph {
        ServiceGraph::build(
            ["a", "b", "c", "d"]
                .into_iter()
                .map(|n| ServiceNode::new(n, "service")),
            vec![
                Edge::new("a", "b"),
                Edge::new("b", "c"),
                Edge::new("c", "d"),
                Edge::new("a", "c"),
                Edge::new("c", "a"),
                Edge::new("b", "d"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_all_simple_routes_in_insertion_order() {
        let graph = diamond_with_cycle();
        let routes = RouteEnumerator::new(&graph, 10)
            .simple_routes("a", "d")
            .unwrap();

        assert_eq!(
            names(&routes),
            vec![vec!["a", "b", "c", "d"], vec!["a", "b", "d"], vec!["a", "c", "d"]]
        );
    }

    #[test]
    fn test_cycles_terminate_and_routes_stay_simple() {
        let graph = diamond_with_cycle();
        let routes = RouteEnumerator::new(&graph, 10)
            .enumerate(&["a", "b", "c", "d"], &["a", "b", "c", "d"], &[])
            .unwrap();

        assert!(!routes.is_empty());
        for route in &routes {
            let unique: HashSet<&String> = route.nodes().iter().collect();
            assert_eq!(unique.len(), route.nodes().len(), "repeated node in {route:?}");
            assert_ne!(route.start(), route.end());
            for (from, to) in route.hops() {
                assert!(graph.successors(from).contains(&to));
            }
        }
        assert!(names(&routes).contains(&vec!["c", "a", "b"]));
    }

    #[test]
    fn test_cutoff_bounds_route_length() {
        let graph = diamond_with_cycle();

        let two = RouteEnumerator::new(&graph, 2)
            .simple_routes("a", "d")
            .unwrap();
        assert_eq!(names(&two), vec![vec!["a", "b", "d"], vec!["a", "c", "d"]]);

        let one = RouteEnumerator::new(&graph, 1)
            .simple_routes("a", "d")
            .unwrap();
        assert!(one.is_empty());

        let zero = RouteEnumerator::new(&graph, 0)
            .simple_routes("a", "b")
            .unwrap();
        assert!(zero.is_empty());
    }

    #[test]
    fn test_same_start_and_end_is_skipped() {
        let graph = ServiceGraph::build(
            vec![ServiceNode::new("a", "service")],
            vec![Edge::new("a", "a")],
        )
        .unwrap();

        let routes = RouteEnumerator::new(&graph, 10)
            .enumerate(&["a"], &["a"], &[])
            .unwrap();
        assert!(routes.is_empty());
    }

    #[test]
    fn test_content_predicates_filter_routes() {
        let graph = ServiceGraph::build(
            vec![
                ServiceNode::new("a", "service"),
                ServiceNode::new("b", "service")
                    .with_vulnerabilities(vec![serde_json::json!({"id": "CVE-1"})]),
                ServiceNode::new("c", "service"),
                ServiceNode::new("d", "rds"),
            ],
            vec![
                Edge::new("a", "b"),
                Edge::new("b", "d"),
                Edge::new("a", "c"),
                Edge::new("c", "d"),
            ],
        )
        .unwrap();

        let contents: Vec<Box<dyn ContentPredicate>> = vec![Box::new(HasVulnerability)];
        let routes = RouteEnumerator::new(&graph, 10)
            .enumerate(&["a"], &["d"], &contents)
            .unwrap();

        assert_eq!(names(&routes), vec![vec!["a", "b", "d"]]);
    }

    #[test]
    fn test_unknown_candidate_is_not_found() {
        let graph = diamond_with_cycle();
        let result = RouteEnumerator::new(&graph, 10).simple_routes("a", "zz");
        assert!(matches!(result, Err(GraphError::NodeNotFound(name)) if name == "zz"));
    }

    #[test]
    fn test_route_accessors() {
        let route = Route::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(route.len(), 2);
        assert_eq!(route.start(), Some("a"));
        assert_eq!(route.end(), Some("c"));
        assert_eq!(route.hops().collect::<Vec<_>>(), vec![("a", "b"), ("b", "c")]);
        assert_eq!(serde_json::to_value(&route).unwrap(), serde_json::json!(["a", "b", "c"]));
    }
}
