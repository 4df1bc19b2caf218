use serde::{Deserialize, Serialize};

use crate::value::Row;

/// Declarative description of a whole query graph, rooted at one label.
///
/// ```toml
/// label = "Account"
///
/// [[rel]]
/// label = "OWNS"
/// node = { label = "Contact", value = { name = "Ada" } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    /// Entity type of the node.
    pub label: String,
    /// Attribute bag of a value bound to this node.
    #[serde(default)]
    pub value: Option<Row>,
    /// Keep the bound value applied in every query.
    #[serde(default)]
    pub immutable: bool,
    /// Create the node as a group node.
    #[serde(default)]
    pub group: bool,
    /// Outgoing relationships.
    #[serde(default)]
    pub rel: Vec<RelationSchema>,
}

/// Relationship from a schema node to a child node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationSchema {
    /// Relationship type.
    pub label: String,
    /// Node at the far end.
    pub node: NodeSchema,
}

/// Graph schema, the root node description.
pub type GraphSchema = NodeSchema;
