use crate::routes::Route;
use crate::types::{ServiceGraph, ServiceNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Node kinds treated as sinks by default
pub const DEFAULT_SINK_KINDS: [&str; 2] = ["rds", "sqs"];

/// Read access to node attributes by name
pub trait NodeLookup {
    fn lookup(&self, name: &str) -> Option<&ServiceNode>;
}

impl NodeLookup for ServiceGraph {
    fn lookup(&self, name: &str) -> Option<&ServiceNode> {
        self.node(name)
    }
}

/// Decides whether a node may open a route
pub trait StartPredicate: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, node: &ServiceNode) -> bool;
}

/// Decides whether a node may close a route
pub trait EndPredicate: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, node: &ServiceNode) -> bool;
}

/// Decides whether a complete route qualifies
pub trait ContentPredicate: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, route: &Route, lookup: &dyn NodeLookup) -> bool;
}

/// Start at nodes reachable from outside
#[derive(Debug, Clone, Copy, Default)]
pub struct PubliclyExposed;

impl StartPredicate for PubliclyExposed {
    fn name(&self) -> &str {
        "start_public"
    }

    fn accepts(&self, node: &ServiceNode) -> bool {
        node.public_exposed
    }
}

/// End at terminal data stores and queues
#[derive(Debug, Clone)]
pub struct SinkKind {
    kinds: BTreeSet<String>,
}

impl SinkKind {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(String::as_str)
    }
}

impl Default for SinkKind {
    fn default() -> Self {
        Self::new(DEFAULT_SINK_KINDS)
    }
}

impl EndPredicate for SinkKind {
    fn name(&self) -> &str {
        "end_sink"
    }

    fn accepts(&self, node: &ServiceNode) -> bool {
        self.kinds.contains(&node.kind)
    }
}

/// Keep routes touching at least one vulnerable node
#[derive(Debug, Clone, Copy, Default)]
pub struct HasVulnerability;

impl ContentPredicate for HasVulnerability {
    fn name(&self) -> &str {
        "has_vuln_filter"
    }

    fn accepts(&self, route: &Route, lookup: &dyn NodeLookup) -> bool {
        route
            .nodes()
            .iter()
            .filter_map(|name| lookup.lookup(name))
            .any(ServiceNode::is_vulnerable)
    }
}

/// Externally controlled toggles for the built-in predicates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFlags {
    #[serde(default)]
    pub start_public: bool,

    #[serde(default)]
    pub end_sink: bool,

    #[serde(default)]
    pub has_vuln_filter: bool,
}

/// Enabled predicates for one query, combined with logical AND per category
#[derive(Default)]
pub struct PredicateSet {
    starts: Vec<Box<dyn StartPredicate>>,
    ends: Vec<Box<dyn EndPredicate>>,
    contents: Vec<Box<dyn ContentPredicate>>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the built-in predicate behind each set flag
    pub fn from_flags(flags: FilterFlags) -> Self {
        let mut set = Self::new();
        if flags.start_public {
            set = set.with_start(PubliclyExposed);
        }
        if flags.end_sink {
            set = set.with_end(SinkKind::default());
        }
        if flags.has_vuln_filter {
            set = set.with_content(HasVulnerability);
        }
        set
    }

    pub fn with_start(mut self, predicate: impl StartPredicate + 'static) -> Self {
        self.starts.push(Box::new(predicate));
        self
    }

    pub fn with_end(mut self, predicate: impl EndPredicate + 'static) -> Self {
        self.ends.push(Box::new(predicate));
        self
    }

    pub fn with_content(mut self, predicate: impl ContentPredicate + 'static) -> Self {
        self.contents.push(Box::new(predicate));
        self
    }

    /// No predicate of any category is enabled
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty() && self.ends.is_empty() && self.contents.is_empty()
    }

    pub fn accepts_start(&self, node: &ServiceNode) -> bool {
        self.starts.iter().all(|p| p.accepts(node))
    }

    pub fn accepts_end(&self, node: &ServiceNode) -> bool {
        self.ends.iter().all(|p| p.accepts(node))
    }

    pub fn accepts_route(&self, route: &Route, lookup: &dyn NodeLookup) -> bool {
        self.contents.iter().all(|p| p.accepts(route, lookup))
    }

    pub fn content_predicates(&self) -> &[Box<dyn ContentPredicate>] {
        &self.contents
    }

    /// Names of all enabled predicates, for logging
    pub fn names(&self) -> Vec<&str> {
        self.starts
            .iter()
            .map(|p| p.name())
            .chain(self.ends.iter().map(|p| p.name()))
            .chain(self.contents.iter().map(|p| p.name()))
            .collect()
    }
}

impl std::fmt::Debug for PredicateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateSet")
            .field("enabled", &self.names())
            .finish()
    }
}
