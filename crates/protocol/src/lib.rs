use anyhow::Result;
use routemap_graph::{
    validate_cutoff, Edge, FilterFlags, FilteredSubgraph, RouteQuery, ServiceNode,
    DEFAULT_CUTOFF,
};
use schemars::JsonSchema;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const QUERY_SCHEMA_VERSION: u32 = 1;

fn default_cutoff() -> i64 {
    DEFAULT_CUTOFF as i64
}

struct FlagVisitor;

impl<'de> Visitor<'de> for FlagVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a boolean flag (true/false, 1/0, yes/no, on/off)")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
        match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "on" | "t" => Ok(true),
            "false" | "0" | "no" | "n" | "off" | "f" => Ok(false),
            _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
        }
    }
}

/// Query strings carry flags as text, so accept the usual spellings
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(FlagVisitor)
}

/// Query parameters shared by the CLI and the HTTP endpoints
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct GraphQueryParams {
    /// Only routes starting at publicly exposed services
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub start_public: bool,

    /// Only routes ending at sinks (rds/sqs)
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub end_sink: bool,

    /// Only routes with at least one vulnerable node
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub has_vuln_filter: bool,

    /// Maximum number of edges per route
    #[serde(default = "default_cutoff")]
    pub cutoff: i64,
}

impl Default for GraphQueryParams {
    fn default() -> Self {
        Self {
            start_public: false,
            end_sink: false,
            has_vuln_filter: false,
            cutoff: default_cutoff(),
        }
    }
}

impl GraphQueryParams {
    pub fn flags(&self) -> FilterFlags {
        FilterFlags {
            start_public: self.start_public,
            end_sink: self.end_sink,
            has_vuln_filter: self.has_vuln_filter,
        }
    }

    pub fn to_query(&self) -> Result<RouteQuery> {
        let cutoff = validate_cutoff(self.cutoff)?;
        Ok(RouteQuery::from_flags(self.flags()).with_cutoff(cutoff))
    }
}

/// Filtered graph plus its diagram text
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GraphResponse {
    pub nodes: Vec<ServiceNode>,
    pub edges: Vec<Edge>,
    pub mermaid: String,
}

impl GraphResponse {
    pub fn new(subgraph: FilteredSubgraph, mermaid: String) -> Self {
        Self {
            nodes: subgraph.nodes,
            edges: subgraph.edges,
            mermaid,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: "invalid_request".to_string(),
            message: message.into(),
            hint: Some(
                "Flags (start_public, end_sink, has_vuln_filter) take true/false, 1/0, yes/no or on/off; cutoff is a non-negative integer."
                    .to_string(),
            ),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "internal".to_string(),
            message: message.into(),
            hint: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct HealthReport {
    pub status: String,
    pub nodes: usize,
    pub edges: usize,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

/// JSON schema of [`GraphQueryParams`]
pub fn query_params_schema() -> Result<String> {
    let schema = schemars::schema_for!(GraphQueryParams);
    serde_json::to_string_pretty(&schema).map_err(Into::into)
}
