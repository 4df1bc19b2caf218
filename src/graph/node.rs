use serde::{Deserialize, Serialize};

use crate::types::NodeId;
use crate::value::{PropertyValue, Row};

/// Role a node plays in the visual query.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// The single return target of the query.
    Root,
    /// An entity term that may be bound to a value or expanded further.
    Choose,
    /// One candidate value of a root or choose node.
    Value,
    /// Organisational node used only to fan out relationships.
    Group,
}

/// Relationship discovered for a node by the relation query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipInfo {
    /// Relationship type name.
    pub relationship: String,
    /// Label of the node at the far end.
    pub label: String,
    /// Number of matching relationships.
    pub count: u64,
}

/// One visual query term.
#[derive(Clone, Debug)]
pub struct Node {
    /// Identifier, unique within the owning graph.
    pub id: NodeId,
    /// Role of the node.
    pub node_type: NodeType,
    /// Entity type name.
    pub label: String,
    /// Query variable name. Empty for value nodes.
    pub internal_label: String,
    /// Bound value node, if any.
    pub value: Option<NodeId>,
    /// Node this one was expanded from. `None` only for the root.
    pub parent: Option<NodeId>,
    /// Constraint must be applied even when the compiler would skip it.
    pub immutable: bool,
    /// Raw property bag returned by the database (value nodes).
    pub attributes: Row,
    /// Database identity of the value, when returned.
    pub internal_id: Option<i64>,
    /// Last known count for this node.
    pub count: u64,
    /// Candidate value rows loaded for this node.
    pub data: Vec<Row>,
    /// Current page of `data` displayed as value nodes (1-based, 0 = none).
    pub page: usize,
    /// Value nodes are currently attached below this node.
    pub value_expanded: bool,
    /// Relationships available from this node.
    pub relationships: Vec<RelationshipInfo>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        node_type: NodeType,
        label: String,
        internal_label: String,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            id,
            node_type,
            label,
            internal_label,
            value: None,
            parent,
            immutable: false,
            attributes: Row::new(),
            internal_id: None,
            count: 0,
            data: Vec::new(),
            page: 0,
            value_expanded: false,
            relationships: Vec::new(),
        }
    }

    /// Returns true when a value is bound to this node.
    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    /// Returns true for the root node.
    pub fn is_root(&self) -> bool {
        self.node_type == NodeType::Root
    }

    /// Looks up a raw attribute of a value node.
    pub fn attribute(&self, name: &str) -> Option<&PropertyValue> {
        self.attributes.get(name)
    }
}
