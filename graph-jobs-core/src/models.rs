//! Result payloads of the graph generation operations.
//!
//! Only the fields this client relies on are typed; everything else the server sends is
//! kept in the flattened `extra` maps so nothing is lost when results are written back out.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The five graph generation operations offered by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Dependency,
    Call,
    Domain,
    Parse,
    /// Full IR bundle combining the other graphs.
    Supermodel,
}

impl GraphKind {
    pub const ALL: [GraphKind; 5] = [
        GraphKind::Dependency,
        GraphKind::Call,
        GraphKind::Domain,
        GraphKind::Parse,
        GraphKind::Supermodel,
    ];

    /// URL path segment under `/v1/graphs/`.
    pub fn path_segment(self) -> &'static str {
        match self {
            GraphKind::Dependency => "dependency",
            GraphKind::Call => "call",
            GraphKind::Domain => "domain",
            GraphKind::Parse => "parse",
            GraphKind::Supermodel => "supermodel",
        }
    }
}

impl FromStr for GraphKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GraphKind::ALL
            .into_iter()
            .find(|kind| kind.path_segment().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown graph kind {s:?}, expected one of dependency, call, domain, parse, supermodel")
            })
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRelationship {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub start_node: String,
    pub end_node: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Result of the dependency, call and parse graph operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub relationships: Vec<GraphRelationship>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subdomains: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Result of the domain graph operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainGraph {
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub relationships: Vec<GraphRelationship>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Result of the full IR bundle operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupermodelIr {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub graph: CodeGraph,
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
