use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub(crate) const DEFAULT_KIND: &str = "service";

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}

/// Keep a present key as `Some`, even when its value is `null`
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Service or datastore in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNode {
    /// Unique node name (e.g., "ts-order-service")
    pub name: String,

    /// Free-form classification (e.g., "service", "rds", "sqs")
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Implementation language, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Reachable from outside the cluster
    #[serde(rename = "publicExposed", default)]
    pub public_exposed: bool,

    /// Known vulnerabilities as written in the source; presence of the key,
    /// whatever its value, marks the node vulnerable
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub vulnerabilities: Option<serde_json::Value>,

    /// Any other attributes, preserved verbatim for output
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ServiceNode {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            language: None,
            public_exposed: false,
            vulnerabilities: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_public_exposed(mut self, exposed: bool) -> Self {
        self.public_exposed = exposed;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_vulnerabilities(mut self, vulnerabilities: Vec<serde_json::Value>) -> Self {
        self.vulnerabilities = Some(serde_json::Value::Array(vulnerabilities));
        self
    }

    /// True when the record carries a `vulnerabilities` key, even `[]` or `null`
    pub fn is_vulnerable(&self) -> bool {
        self.vulnerabilities.is_some()
    }

    /// True when the `vulnerabilities` value actually lists something
    pub fn has_listed_vulnerabilities(&self) -> bool {
        use serde_json::Value;

        match &self.vulnerabilities {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(fields)) => !fields.is_empty(),
            Some(Value::String(text)) => !text.is_empty(),
            Some(Value::Number(n)) => n.as_f64() != Some(0.0),
            Some(Value::Bool(true)) => true,
        }
    }
}

/// Directed call dependency `from -> to`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Edge target(s) as written in the graph source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeTargets {
    One(String),
    Many(Vec<String>),
}

/// Raw edge record; a list of targets expands into one edge per target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: EdgeTargets,
}

impl EdgeRecord {
    pub fn into_edges(self) -> Vec<Edge> {
        let from = self.from;
        match self.to {
            EdgeTargets::One(to) => vec![Edge { from, to }],
            EdgeTargets::Many(targets) => targets
                .into_iter()
                .map(|to| Edge {
                    from: from.clone(),
                    to,
                })
                .collect(),
        }
    }
}

/// Raw graph description as loaded from storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSource {
    pub nodes: Vec<ServiceNode>,

    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

/// Immutable service-dependency graph
///
/// Built once, then shared read-only between queries.
#[derive(Debug, Clone)]
pub struct ServiceGraph {
    /// Directed call graph; node indices follow insertion order
    pub(crate) graph: DiGraph<ServiceNode, ()>,

    /// Node name -> NodeIndex mapping for fast lookup
    pub(crate) name_index: HashMap<String, NodeIndex>,
}
