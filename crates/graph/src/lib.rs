//! # Routemap Graph
//!
//! Filtered route discovery over a service-dependency graph.
//!
//! ## Features
//!
//! - **Immutable service graph** - built once from raw node/edge records
//! - **Composable predicates** - start, end and route-content classifiers
//! - **Bounded route enumeration** - every simple call route up to a cutoff
//! - **Subgraph assembly** - the union of qualifying routes as nodes + edges
//!
//! ## Architecture
//!
//! ```text
//! GraphSource { nodes, edges }
//!     │
//!     ├──> ServiceGraph (petgraph)
//!     │      ├─ Nodes: services and datastores
//!     │      └─ Edges: directed calls (dangling edges dropped)
//!     │
//!     ├──> PredicateSet
//!     │      ├─ Start candidates (e.g. publicly exposed)
//!     │      ├─ End candidates (e.g. sinks)
//!     │      └─ Route content (e.g. has vulnerability)
//!     │
//!     ├──> RouteEnumerator
//!     │      └─ Iterative depth-limited DFS per (start, end) pair
//!     │
//!     └──> SubgraphAssembler
//!            └─ Deduplicated nodes + edges of all qualifying routes
//! ```

mod assembler;
mod error;
mod graph;
mod predicate;
mod query;
mod routes;
mod types;

pub use assembler::{AssembledSubgraph, SubgraphAssembler};
pub use error::{GraphError, Result};
pub use predicate::{
    ContentPredicate, EndPredicate, FilterFlags, HasVulnerability, NodeLookup, PredicateSet,
    PubliclyExposed, SinkKind, StartPredicate, DEFAULT_SINK_KINDS,
};
pub use query::{validate_cutoff, FilteredSubgraph, QueryOutcome, RouteQuery, DEFAULT_CUTOFF};
pub use routes::{Route, RouteEnumerator};
pub use types::{Edge, EdgeRecord, EdgeTargets, GraphSource, ServiceGraph, ServiceNode};
