use serde::{Deserialize, Serialize};

use crate::types::{LinkId, NodeId};

/// Kind of edge in the visual graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Entity-to-entity relationship.
    Relation,
    /// Entity-to-candidate-value edge.
    Value,
}

/// Directed edge between two nodes of the same graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// Identifier, unique within the owning graph.
    pub id: LinkId,
    /// Kind of edge.
    pub link_type: LinkType,
    /// Node the edge starts from.
    pub source: NodeId,
    /// Node the edge points to.
    pub target: NodeId,
    /// Relationship type. Only set for relation links.
    pub label: Option<String>,
}

impl Link {
    /// Returns true for relationship links.
    pub fn is_relation(&self) -> bool {
        self.link_type == LinkType::Relation
    }
}
