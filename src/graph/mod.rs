#![forbid(unsafe_code)]

//! In-memory model of the query under construction.
//!
//! Nodes and links live in two ordered arenas addressed by generated
//! identifiers. Iteration follows creation order, which keeps the root first
//! and gives the relevance selector a stable link order. Parents are stored as
//! identifiers, never as references.

mod labels;
mod link;
mod node;
mod schema;

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, trace};

pub use labels::InternalLabels;
pub use link::{Link, LinkType};
pub use node::{Node, NodeType, RelationshipInfo};
pub use schema::{GraphSchema, NodeSchema, RelationSchema};

use crate::types::{LinkId, NodeId, QueryGraphError, Result};
use crate::value::{Row, INTERNAL_ID_COLUMN};

/// Nodes and links of one visual query, plus the identifier state they share.
#[derive(Clone, Debug, Default)]
pub struct QueryGraph {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    next_id: u64,
    labels: InternalLabels,
}

impl QueryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph holding a single root node.
    pub fn with_root(label: &str) -> Self {
        let mut graph = Self::new();
        graph.push_root(label);
        graph
    }

    /// Adds the root node. Fails when the graph is not empty.
    pub fn add_root_node(&mut self, label: &str) -> Result<NodeId> {
        if !self.nodes.is_empty() {
            return Err(QueryGraphError::RootAlreadyPresent);
        }
        Ok(self.push_root(label))
    }

    /// Drops every node, link and counter, then adds a fresh root.
    pub fn reset(&mut self, label: &str) -> NodeId {
        self.clear();
        self.push_root(label)
    }

    /// Drops every node, link and counter.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.next_id = 0;
        self.labels.reset();
    }

    /// Returns the next variable name for `label` and advances its counter.
    pub fn generate_internal_label(&mut self, label: &str) -> String {
        self.labels.generate(label)
    }

    /// Adds a choose (or group) node expanded from `parent`.
    ///
    /// No link is created; see [`QueryGraph::add_relationship`].
    pub fn add_node(&mut self, parent: NodeId, label: &str, is_group: bool) -> Result<NodeId> {
        self.node(parent)?;
        let id = NodeId(self.next_id());
        let node_type = if is_group {
            NodeType::Group
        } else {
            NodeType::Choose
        };
        let internal_label = self.labels.generate(label);
        trace!(node = %id, parent = %parent, label, %internal_label, "graph.node.add");
        self.nodes.insert(
            id,
            Node::new(id, node_type, label.to_owned(), internal_label, Some(parent)),
        );
        Ok(id)
    }

    /// Adds a child node and the relation link pointing to it.
    pub fn add_relationship(
        &mut self,
        parent: NodeId,
        relationship: &str,
        label: &str,
        is_group: bool,
    ) -> Result<NodeId> {
        let child = self.add_node(parent, label, is_group)?;
        self.add_link(parent, child, LinkType::Relation, Some(relationship))?;
        Ok(child)
    }

    /// Adds a candidate value below a root or choose node, linked by a value
    /// link. The database identity is read from the `NEO4JID` column.
    pub fn add_value_node(&mut self, parent: NodeId, attributes: Row) -> Result<NodeId> {
        let owner = self.node(parent)?;
        if !matches!(owner.node_type, NodeType::Root | NodeType::Choose) {
            return Err(QueryGraphError::InvalidArgument(
                "values can only be attached to root or choose nodes",
            ));
        }
        let label = owner.label.clone();
        let id = NodeId(self.next_id());
        let mut node = Node::new(id, NodeType::Value, label, String::new(), Some(parent));
        node.internal_id = attributes
            .get(INTERNAL_ID_COLUMN)
            .and_then(|v| v.as_i64());
        node.count = attributes
            .get("count")
            .and_then(|v| v.as_i64())
            .map_or(0, |c| c.max(0) as u64);
        node.attributes = attributes;
        self.nodes.insert(id, node);
        self.add_link(parent, id, LinkType::Value, None)?;
        Ok(id)
    }

    /// Adds a link between two existing nodes.
    pub fn add_link(
        &mut self,
        source: NodeId,
        target: NodeId,
        link_type: LinkType,
        label: Option<&str>,
    ) -> Result<LinkId> {
        self.node(source)?;
        self.node(target)?;
        let id = LinkId(self.next_id());
        self.links.insert(
            id,
            Link {
                id,
                link_type,
                source,
                target,
                label: label.map(str::to_owned),
            },
        );
        Ok(id)
    }

    /// Removes a node together with everything expanded from it.
    ///
    /// Links touching removed nodes are dropped and bound values pointing at
    /// removed nodes are cleared. The root cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        if self.node(id)?.is_root() {
            return Err(QueryGraphError::InvalidArgument(
                "the root node cannot be removed",
            ));
        }
        self.remove_subtree(id);
        Ok(())
    }

    /// Removes a link and the subtree hanging from its target.
    pub fn remove_link(&mut self, id: LinkId) -> Result<()> {
        let link = self
            .links
            .remove(&id)
            .ok_or(QueryGraphError::UnknownLink(id))?;
        let target_is_root = self
            .nodes
            .get(&link.target)
            .map_or(true, |node| node.is_root());
        if !target_is_root {
            self.remove_subtree(link.target);
        }
        Ok(())
    }

    /// Removes every value node attached below `id`.
    ///
    /// The value currently bound to `id` survives: only its value link is
    /// dropped, it stays reachable through `value` and its parent.
    pub fn remove_value_nodes(&mut self, id: NodeId) -> Result<usize> {
        let bound = self.node(id)?.value;
        let values: Vec<(LinkId, NodeId)> = self
            .links
            .values()
            .filter(|l| l.source == id && l.link_type == LinkType::Value)
            .map(|l| (l.id, l.target))
            .collect();
        for (link, value) in &values {
            if Some(*value) == bound {
                self.links.remove(link);
            } else {
                self.remove_subtree(*value);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.value_expanded = false;
        }
        Ok(values.len())
    }

    /// Binds a value node to `node`.
    ///
    /// The value must have been listed for `node`. A previously bound value
    /// that no longer hangs from any link is dropped.
    pub fn bind_value(&mut self, node: NodeId, value: NodeId) -> Result<()> {
        self.node(node)?;
        let candidate = self.node(value)?;
        if candidate.node_type != NodeType::Value {
            return Err(QueryGraphError::InvalidArgument(
                "only value nodes can be bound",
            ));
        }
        if candidate.parent != Some(node) {
            return Err(QueryGraphError::InvalidArgument(
                "value was listed for another node",
            ));
        }
        let previous = self.node_mut(node)?.value.replace(value);
        if let Some(previous) = previous.filter(|p| *p != value) {
            self.drop_detached_value(previous);
        }
        Ok(())
    }

    /// Unbinds the value of `node`. Immutable nodes keep theirs.
    ///
    /// Returns true when a value was removed.
    pub fn clear_value(&mut self, node: NodeId) -> Result<bool> {
        let node = self.node_mut(node)?;
        if node.immutable {
            return Ok(false);
        }
        match node.value.take() {
            Some(previous) => {
                self.drop_detached_value(previous);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Pins or unpins the constraint of `node`.
    pub fn set_immutable(&mut self, node: NodeId, immutable: bool) -> Result<()> {
        self.node_mut(node)?.immutable = immutable;
        Ok(())
    }

    /// Builds the whole graph from a schema. The graph must be empty.
    pub fn add_schema(&mut self, schema: &GraphSchema) -> Result<NodeId> {
        let root = self.add_root_node(&schema.label)?;
        self.apply_schema_node(root, schema)?;
        Ok(root)
    }

    fn apply_schema_node(&mut self, id: NodeId, schema: &NodeSchema) -> Result<()> {
        if let Some(attributes) = &schema.value {
            let value = self.add_value_node(id, attributes.clone())?;
            self.bind_value(id, value)?;
        }
        self.set_immutable(id, schema.immutable)?;
        for rel in &schema.rel {
            let child = self.add_relationship(id, &rel.label, &rel.node.label, rel.node.group)?;
            self.apply_schema_node(child, &rel.node)?;
        }
        Ok(())
    }

    /// Returns the root node.
    pub fn root(&self) -> Result<&Node> {
        self.nodes
            .values()
            .next()
            .filter(|n| n.is_root())
            .ok_or(QueryGraphError::MissingRoot)
    }

    /// Returns the identifier of the root node.
    pub fn root_id(&self) -> Result<NodeId> {
        self.root().map(|n| n.id)
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(QueryGraphError::UnknownNode(id))
    }

    /// Looks up a node for caller-side state updates (count, data, ...).
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or(QueryGraphError::UnknownNode(id))
    }

    /// Looks up a link.
    pub fn link(&self, id: LinkId) -> Result<&Link> {
        self.links.get(&id).ok_or(QueryGraphError::UnknownLink(id))
    }

    /// Finds a node by its query variable name.
    pub fn find_by_internal_label(&self, internal_label: &str) -> Option<&Node> {
        self.nodes
            .values()
            .find(|n| n.node_type != NodeType::Value && n.internal_label == internal_label)
    }

    /// Returns the value node bound to `node`, if any.
    pub fn bound_value(&self, node: &Node) -> Option<&Node> {
        node.value.and_then(|id| self.nodes.get(&id))
    }

    /// Nodes in creation order, root first.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Links in creation order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Nodes that receive a count: everything except value and group nodes.
    pub fn counted_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| !matches!(n.node_type, NodeType::Value | NodeType::Group))
            .map(|n| n.id)
            .collect()
    }

    /// Targets of the links leaving `id`, filtered by link type.
    pub fn children(&self, id: NodeId, link_type: LinkType) -> Vec<NodeId> {
        self.links
            .values()
            .filter(|l| l.source == id && l.link_type == link_type)
            .map(|l| l.target)
            .collect()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Returns true when the graph holds no node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push_root(&mut self, label: &str) -> NodeId {
        let id = NodeId(self.next_id());
        let internal_label = self.labels.generate(label);
        debug!(label, %internal_label, "graph.root.add");
        self.nodes.insert(
            id,
            Node::new(id, NodeType::Root, label.to_owned(), internal_label, None),
        );
        id
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn drop_detached_value(&mut self, value: NodeId) {
        if !self.links.values().any(|l| l.target == value) {
            self.remove_subtree(value);
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let mut removed = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let is_root = self.nodes.get(&current).map_or(true, Node::is_root);
            if is_root || !removed.insert(current) {
                continue;
            }
            stack.extend(
                self.links
                    .values()
                    .filter(|l| l.source == current)
                    .map(|l| l.target),
            );
            stack.extend(
                self.nodes
                    .values()
                    .filter(|n| n.parent == Some(current))
                    .map(|n| n.id),
            );
        }
        self.links
            .retain(|_, l| !removed.contains(&l.source) && !removed.contains(&l.target));
        for node in &removed {
            self.nodes.remove(node);
        }
        for node in self.nodes.values_mut() {
            if node.value.map_or(false, |v| removed.contains(&v)) {
                node.value = None;
            }
        }
        trace!(start = %id, removed = removed.len(), "graph.subtree.remove");
    }
}
