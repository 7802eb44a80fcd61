//! Chord transition graph: named chord nodes joined by weighted edges.
//!
//! Loaded once from a JSON document and treated as immutable afterwards:
//!
//! ```json
//! { "name": "...", "description": "...",
//!   "nodes": [{ "id": "Imaj7" }],
//!   "links": [{ "source": "Imaj7", "target": "ii7", "weight": 0.6 }] }
//! ```
//!
//! Weights are relative sizes in (0, 1]; edges sharing a source need not
//! sum to 1.

use crate::chord_function::extract_degree;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),
    #[error("Link {from} → {to} references unknown node {missing}")]
    UnknownNode {
        from: String,
        to: String,
        missing: String,
    },
    #[error("Link {from} → {to} has weight {weight}, expected (0, 1]")]
    BadWeight {
        from: String,
        to: String,
        weight: f32,
    },
    #[error("Graph {0:?} has no tonic (I) node to start from")]
    NoTonicStart(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordNode {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordLink {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

/// A validated chord graph. Edge order is declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordGraph {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<ChordNode>,
    pub links: Vec<ChordLink>,
}

const JAZZ_JSON: &str = include_str!("../data/jazz.json");

impl ChordGraph {
    /// Build from node ids and (source, target, weight) triples, validating.
    pub fn new(
        name: impl Into<String>,
        nodes: &[&str],
        links: &[(&str, &str, f32)],
    ) -> Result<Self, GraphError> {
        let graph = Self {
            name: name.into(),
            description: String::new(),
            nodes: nodes.iter().map(|id| ChordNode { id: id.to_string() }).collect(),
            links: links
                .iter()
                .map(|(s, t, w)| ChordLink {
                    source: s.to_string(),
                    target: t.to_string(),
                    weight: *w,
                })
                .collect(),
        };
        graph.validate()?;
        Ok(graph)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let graph: ChordGraph = serde_json::from_str(json)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let data = std::fs::read_to_string(path)?;
        let graph = Self::from_json(&data)?;
        info!(
            "Loaded chord graph {:?} from {:?}: {} nodes, {} links",
            graph.name,
            path,
            graph.nodes.len(),
            graph.links.len()
        );
        Ok(graph)
    }

    /// The built-in jazz graph.
    pub fn jazz() -> Result<Self, GraphError> {
        Self::from_json(JAZZ_JSON)
    }

    /// Check node uniqueness, edge endpoints and weights.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }
        for link in &self.links {
            for endpoint in [&link.source, &link.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(GraphError::UnknownNode {
                        from: link.source.clone(),
                        to: link.target.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
            if !(link.weight > 0.0 && link.weight <= 1.0) {
                return Err(GraphError::BadWeight {
                    from: link.source.clone(),
                    to: link.target.clone(),
                    weight: link.weight,
                });
            }
        }
        if !self.nodes.iter().any(|n| extract_degree(&n.id) == Some("I")) {
            return Err(GraphError::NoTonicStart(self.name.clone()));
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Outgoing edges of `source`, in declaration order.
    pub fn links_from<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a ChordLink> + 'a {
        self.links.iter().filter(move |l| l.source == source)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }
}
