#![forbid(unsafe_code)]

//! Request/response bookkeeping around the query graph.
//!
//! A [`QuerySession`] owns the graph and hands out ready-to-post transport
//! requests. Responses are folded back into node state by the matching
//! `complete_*` call. Every `begin`/`complete` pair is synchronous on the
//! session; only the transport call in between may be slow.
//!
//! At most one value listing is in flight at a time. The busy flag is set by
//! [`QuerySession::begin_value_request`] and cleared by the matching
//! completion whatever its outcome. Each listing also carries a correlation
//! token so a late response for an abandoned request is rejected instead of
//! overwriting newer state. Count batches are stamped with the graph
//! generation, which every reset bumps, so a batch built for a discarded
//! graph is never folded into its successor.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::graph::{GraphSchema, LinkType, NodeType, QueryGraph, RelationshipInfo};
use crate::provider::{LabelMetadata, ProviderRegistry};
use crate::query::{QueryBuilder, QueryOptions};
use crate::transport::{
    StatementRequest, TransactionRequest, TransactionResponse, Transport, TransportError,
    GRAPH_CONTENTS,
};
use crate::types::{LinkId, NodeId, QueryGraphError, Result};
use crate::value::{PropertyValue, Row};

/// Count statements for every counted node, matched by position.
#[derive(Clone, Debug)]
pub struct CountBatch {
    /// Graph generation the batch was built for.
    pub generation: u64,
    /// Counted nodes, in statement order.
    pub nodes: Vec<NodeId>,
    /// One statement per node.
    pub request: TransactionRequest,
}

/// Value listing of one node.
#[derive(Clone, Debug)]
pub struct ValueRequest {
    /// Listed node.
    pub node: NodeId,
    /// Correlation token.
    pub token: u64,
    /// Single-statement request.
    pub request: TransactionRequest,
}

/// Relationship discovery for one node.
#[derive(Clone, Debug)]
pub struct RelationRequest {
    /// Expanded node.
    pub node: NodeId,
    /// Single-statement request.
    pub request: TransactionRequest,
}

/// Result retrieval, optionally with the graph form of the matches.
#[derive(Clone, Debug)]
pub struct ResultRequest {
    /// Row statement, then the graph statement when requested.
    pub request: TransactionRequest,
    /// The graph statement is present.
    pub with_graph: bool,
}

/// One row of the result query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRecord {
    /// Position in the response.
    pub index: usize,
    /// Label of the root node.
    pub label: String,
    /// Returned attributes keyed by alias.
    pub attributes: Row,
}

/// Distinct nodes and relationships of a graph-form result.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GraphResult {
    /// Nodes, first occurrence of each id.
    pub nodes: Vec<serde_json::Value>,
    /// Relationships, first occurrence of each id.
    pub edges: Vec<serde_json::Value>,
}

/// Query graph plus the state of the requests issued for it.
pub struct QuerySession<M = ProviderRegistry> {
    graph: QueryGraph,
    metadata: M,
    options: QueryOptions,
    value_waiting: bool,
    pending_value: Option<u64>,
    next_token: u64,
    generation: u64,
}

impl<M: LabelMetadata> QuerySession<M> {
    /// Creates a session with an empty graph.
    pub fn new(metadata: M, options: QueryOptions) -> Self {
        Self {
            graph: QueryGraph::new(),
            metadata,
            options,
            value_waiting: false,
            pending_value: None,
            next_token: 0,
            generation: 0,
        }
    }

    /// Resets the graph to a single root of `label`.
    pub fn start(&mut self, label: &str) -> NodeId {
        self.abandon_requests();
        let root = self.graph.reset(label);
        info!(label, "session.start");
        root
    }

    /// Replaces the graph with one built from `schema`.
    pub fn load_schema(&mut self, schema: &GraphSchema) -> Result<NodeId> {
        self.abandon_requests();
        self.graph.clear();
        let root = self.graph.add_schema(schema)?;
        info!(
            label = %schema.label,
            nodes = self.graph.node_count(),
            "session.schema.load"
        );
        Ok(root)
    }

    fn abandon_requests(&mut self) {
        if let Some(token) = self.pending_value.take() {
            debug!(token, "session.value.abandon");
        }
        self.value_waiting = false;
        self.generation += 1;
    }

    /// The query graph.
    pub fn graph(&self) -> &QueryGraph {
        &self.graph
    }

    /// Mutable access for caller-driven edits.
    pub fn graph_mut(&mut self) -> &mut QueryGraph {
        &mut self.graph
    }

    /// Label metadata.
    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Builder options.
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Builder over the current graph.
    pub fn builder(&self) -> QueryBuilder<'_, M> {
        QueryBuilder::new(&self.graph, &self.metadata, &self.options)
    }

    /// A value listing is in flight.
    pub fn is_waiting(&self) -> bool {
        self.value_waiting
    }

    // ---- counts ----

    /// Count statements for every non-value, non-group node.
    pub fn begin_count_refresh(&self) -> Result<CountBatch> {
        let queries = self.builder().count_queries()?;
        let (nodes, statements): (Vec<NodeId>, Vec<StatementRequest>) = queries
            .into_iter()
            .map(|(id, query)| (id, StatementRequest::rows(query.into_statement())))
            .unzip();
        info!(nodes = nodes.len(), "session.count.request");
        Ok(CountBatch {
            generation: self.generation,
            nodes,
            request: TransactionRequest { statements },
        })
    }

    /// Folds count results back into the nodes by position.
    ///
    /// A failed call or an empty result list resets every count to 0.
    /// Nodes removed since the batch was built are skipped. A batch built
    /// before the last `start`/`load_schema` is rejected untouched.
    pub fn complete_count_refresh(
        &mut self,
        batch: &CountBatch,
        outcome: std::result::Result<TransactionResponse, TransportError>,
    ) -> Result<()> {
        if batch.generation != self.generation {
            warn!(
                generation = batch.generation,
                current = self.generation,
                "session.count.stale"
            );
            return Err(QueryGraphError::StaleResponse {
                token: batch.generation,
            });
        }
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, nodes = batch.nodes.len(), "session.count.failed");
                self.reset_counts(&batch.nodes);
                return Ok(());
            }
        };
        if !response.errors.is_empty() {
            error!(errors = ?response.errors, "session.count.server_error");
        }
        if response.results.is_empty() {
            self.reset_counts(&batch.nodes);
            return Ok(());
        }
        for (idx, id) in batch.nodes.iter().enumerate() {
            let count = response
                .results
                .get(idx)
                .and_then(|result| result.data.first())
                .and_then(|entry| entry.row.first())
                .and_then(PropertyValue::as_i64)
                .map_or(0, |c| c.max(0) as u64);
            if let Ok(node) = self.graph.node_mut(*id) {
                node.count = count;
            }
        }
        debug!(nodes = batch.nodes.len(), "session.count.folded");
        Ok(())
    }

    fn reset_counts(&mut self, nodes: &[NodeId]) {
        for id in nodes {
            if let Ok(node) = self.graph.node_mut(*id) {
                node.count = 0;
            }
        }
    }

    /// Count of the root node, the number of results.
    pub fn result_count(&self) -> Result<u64> {
        Ok(self.graph.root()?.count)
    }

    // ---- values ----

    /// Starts listing the values of `node`.
    ///
    /// Returns `None` while another listing is in flight or when the node is
    /// immutable. Expanded listings are collapsed first.
    pub fn begin_value_request(&mut self, node: NodeId) -> Result<Option<ValueRequest>> {
        let target = self.graph.node(node)?;
        if !matches!(target.node_type, NodeType::Root | NodeType::Choose) {
            return Err(QueryGraphError::InvalidArgument(
                "only root and choose nodes list values",
            ));
        }
        if self.value_waiting || target.immutable {
            debug!(
                node = %node,
                waiting = self.value_waiting,
                immutable = target.immutable,
                "session.value.skip"
            );
            return Ok(None);
        }
        self.collapse_all()?;
        let query = self.builder().node_value_query(node)?;

        self.next_token += 1;
        let token = self.next_token;
        self.value_waiting = true;
        self.pending_value = Some(token);
        info!(node = %node, token, "session.value.request");
        Ok(Some(ValueRequest {
            node,
            token,
            request: TransactionRequest::single(StatementRequest::rows(query.into_statement())),
        }))
    }

    /// Stores the listed rows and shows their first page as value nodes.
    ///
    /// Clears the busy flag unless the response is stale. Returns the created
    /// value nodes.
    pub fn complete_value_request(
        &mut self,
        request: &ValueRequest,
        outcome: std::result::Result<TransactionResponse, TransportError>,
    ) -> Result<Vec<NodeId>> {
        if self.pending_value != Some(request.token) {
            warn!(token = request.token, "session.value.stale");
            return Err(QueryGraphError::StaleResponse {
                token: request.token,
            });
        }
        self.pending_value = None;
        self.value_waiting = false;

        let response = outcome.map_err(|err| {
            warn!(node = %request.node, error = %err, "session.value.failed");
            QueryGraphError::Transport(err.to_string())
        })?;
        if !response.errors.is_empty() {
            error!(errors = ?response.errors, "session.value.server_error");
        }
        let rows = response
            .results
            .first()
            .map(|result| result.rows())
            .unwrap_or_default();
        debug!(node = %request.node, rows = rows.len(), "session.value.received");

        let node = self.graph.node_mut(request.node)?;
        node.data = rows;
        node.page = 1;
        self.show_page(request.node)
    }

    fn show_page(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        self.graph.remove_value_nodes(node)?;
        let page_size = self.options.value_page_size.max(1);
        let owner = self.graph.node(node)?;
        let start = owner.page.saturating_sub(1) * page_size;
        let rows: Vec<Row> = owner
            .data
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();
        let created = rows
            .into_iter()
            .map(|row| self.graph.add_value_node(node, row))
            .collect::<Result<Vec<_>>>()?;
        self.graph.node_mut(node)?.value_expanded = true;
        Ok(created)
    }

    /// Shows the next page of loaded values, wrapping to the first.
    pub fn next_page(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        let page_size = self.options.value_page_size.max(1);
        let owner = self.graph.node_mut(node)?;
        owner.page = if owner.page * page_size < owner.data.len() {
            owner.page + 1
        } else {
            1
        };
        self.show_page(node)
    }

    /// Binds a listed value to its owner and collapses the listing.
    pub fn select_value(&mut self, value: NodeId) -> Result<NodeId> {
        let node = self.graph.node(value)?;
        let parent = match (node.node_type, node.parent) {
            (NodeType::Value, Some(parent)) => parent,
            _ => {
                return Err(QueryGraphError::InvalidArgument(
                    "only listed value nodes can be selected",
                ))
            }
        };
        if self.graph.node(parent)?.immutable {
            return Err(QueryGraphError::InvalidArgument(
                "immutable nodes keep their value",
            ));
        }
        self.graph.bind_value(parent, value)?;
        self.collapse_node(parent)?;
        info!(node = %parent, value = %value, "session.value.select");
        Ok(parent)
    }

    /// Removes the value bound to `node`. Returns true when one was removed.
    pub fn clear_selection(&mut self, node: NodeId) -> Result<bool> {
        self.graph.node(node)?;
        self.collapse_all()?;
        let cleared = self.graph.clear_value(node)?;
        if cleared {
            info!(node = %node, "session.value.clear");
        }
        Ok(cleared)
    }

    /// Removes the value nodes listed below `node`.
    pub fn collapse_node(&mut self, node: NodeId) -> Result<usize> {
        if !self.graph.node(node)?.value_expanded {
            debug!(node = %node, "session.collapse.not_expanded");
            return Ok(0);
        }
        self.graph.remove_value_nodes(node)
    }

    fn collapse_all(&mut self) -> Result<()> {
        let expanded: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|n| matches!(n.node_type, NodeType::Root | NodeType::Choose) && n.value_expanded)
            .map(|n| n.id)
            .collect();
        for id in expanded {
            self.collapse_node(id)?;
        }
        Ok(())
    }

    // ---- relationships ----

    /// Relationship discovery for `node`.
    pub fn relation_request(&self, node: NodeId) -> Result<RelationRequest> {
        let query = self.builder().node_relation_query(node)?;
        info!(node = %node, "session.relation.request");
        Ok(RelationRequest {
            node,
            request: TransactionRequest::single(StatementRequest::rows(query.into_statement())),
        })
    }

    /// Stores the discovered relationships kept by the relation filter.
    ///
    /// A failed call leaves the node's relationships untouched.
    pub fn complete_relation_request(
        &mut self,
        request: &RelationRequest,
        outcome: std::result::Result<TransactionResponse, TransportError>,
    ) -> Result<Vec<RelationshipInfo>> {
        let response = outcome.map_err(|err| {
            warn!(node = %request.node, error = %err, "session.relation.failed");
            QueryGraphError::Transport(err.to_string())
        })?;
        if !response.errors.is_empty() {
            error!(errors = ?response.errors, "session.relation.server_error");
        }
        let relationships: Vec<RelationshipInfo> = response
            .results
            .first()
            .map(|result| result.rows())
            .unwrap_or_default()
            .iter()
            .filter_map(relationship_from_row)
            .filter(|info| self.metadata.accept_relation(info))
            .collect();
        debug!(
            node = %request.node,
            relationships = relationships.len(),
            "session.relation.received"
        );
        self.graph.node_mut(request.node)?.relationships = relationships.clone();
        Ok(relationships)
    }

    /// Adds the child reached through one discovered relationship.
    ///
    /// The relationship is taken out of the node's list.
    pub fn expand_relationship(&mut self, node: NodeId, relationship: &RelationshipInfo) -> Result<NodeId> {
        let owner = self.graph.node_mut(node)?;
        let idx = owner
            .relationships
            .iter()
            .position(|r| r == relationship)
            .ok_or(QueryGraphError::InvalidArgument(
                "relationship was not discovered for this node",
            ))?;
        owner.relationships.remove(idx);
        let is_group = self.metadata.is_group(&relationship.label);
        self.graph.add_relationship(
            node,
            &relationship.relationship,
            &relationship.label,
            is_group,
        )
    }

    /// Adds a child for every discovered relationship of `node`.
    pub fn expand_relationships(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        let relationships = std::mem::take(&mut self.graph.node_mut(node)?.relationships);
        let mut children = Vec::with_capacity(relationships.len());
        for relationship in relationships {
            let is_group = self.metadata.is_group(&relationship.label);
            children.push(self.graph.add_relationship(
                node,
                &relationship.relationship,
                &relationship.label,
                is_group,
            )?);
        }
        info!(node = %node, children = children.len(), "session.relation.expand");
        Ok(children)
    }

    /// Removes every relation child of `node` with its subtree.
    ///
    /// Refused while the node's values are listed.
    pub fn collapse_relationships(&mut self, node: NodeId) -> Result<usize> {
        if self.graph.node(node)?.value_expanded {
            debug!(node = %node, "session.relation.collapse_refused");
            return Ok(0);
        }
        self.collapse_all()?;
        let links: Vec<LinkId> = self
            .graph
            .links()
            .filter(|l| l.source == node && l.link_type == LinkType::Relation)
            .map(|l| l.id)
            .collect();
        for link in &links {
            self.graph.remove_link(*link)?;
        }
        info!(node = %node, removed = links.len(), "session.relation.collapse");
        Ok(links.len())
    }

    // ---- results ----

    /// Result statement, plus the graph-form statement when `with_graph`.
    pub fn result_request(&self, with_graph: bool) -> Result<ResultRequest> {
        let builder = self.builder();
        let mut request =
            TransactionRequest::single(StatementRequest::rows(builder.result_query()?.into_statement()));
        if with_graph {
            request.statements.push(StatementRequest::with_contents(
                builder.graph_result_query()?.into_statement(),
                &[GRAPH_CONTENTS],
            ));
        }
        info!(with_graph, "session.result.request");
        Ok(ResultRequest {
            request,
            with_graph,
        })
    }

    /// Result rows of the first statement.
    pub fn parse_results(&self, response: &TransactionResponse) -> Result<Vec<ResultRecord>> {
        let label = self.graph.root()?.label.clone();
        if !response.errors.is_empty() {
            error!(errors = ?response.errors, "session.result.server_error");
        }
        Ok(response
            .results
            .first()
            .map(|result| result.rows())
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, attributes)| ResultRecord {
                index,
                label: label.clone(),
                attributes,
            })
            .collect())
    }

    // ---- transport drivers ----

    /// Refreshes every count through `transport`.
    pub fn run_count_refresh(&mut self, transport: &impl Transport) -> Result<()> {
        let batch = self.begin_count_refresh()?;
        let outcome = transport.post(&batch.request);
        self.complete_count_refresh(&batch, outcome)
    }

    /// Lists the values of `node` through `transport`.
    ///
    /// Returns the created value nodes, empty when the request was refused.
    pub fn run_value_request(&mut self, node: NodeId, transport: &impl Transport) -> Result<Vec<NodeId>> {
        let Some(request) = self.begin_value_request(node)? else {
            return Ok(Vec::new());
        };
        let outcome = transport.post(&request.request);
        self.complete_value_request(&request, outcome)
    }

    /// Discovers the relationships of `node` through `transport`.
    pub fn run_relation_request(
        &mut self,
        node: NodeId,
        transport: &impl Transport,
    ) -> Result<Vec<RelationshipInfo>> {
        let request = self.relation_request(node)?;
        let outcome = transport.post(&request.request);
        self.complete_relation_request(&request, outcome)
    }

    /// Expands every relationship of `node` when its label asks for it.
    ///
    /// Returns the added children, empty for labels that do not auto expand.
    pub fn run_auto_expand(&mut self, node: NodeId, transport: &impl Transport) -> Result<Vec<NodeId>> {
        let label = self.graph.node(node)?.label.clone();
        if !self.metadata.auto_expand_relations(&label) {
            return Ok(Vec::new());
        }
        self.run_relation_request(node, transport)?;
        self.expand_relationships(node)
    }

    /// Fetches result rows through `transport`.
    pub fn run_result_request(&self, transport: &impl Transport) -> Result<Vec<ResultRecord>> {
        let request = self.result_request(false)?;
        let response = transport
            .post(&request.request)
            .map_err(|err| QueryGraphError::Transport(err.to_string()))?;
        self.parse_results(&response)
    }
}

/// Distinct nodes and relationships of the graph statement of a result
/// response (the second statement).
pub fn parse_graph_results(response: &TransactionResponse) -> GraphResult {
    let mut result = GraphResult::default();
    let mut seen_nodes = HashSet::new();
    let mut seen_edges = HashSet::new();
    let entries = response.results.get(1).map(|r| r.data.as_slice()).unwrap_or(&[]);
    for graph in entries.iter().filter_map(|entry| entry.graph.as_ref()) {
        collect_by_id(graph.get("nodes"), &mut seen_nodes, &mut result.nodes);
        collect_by_id(graph.get("relationships"), &mut seen_edges, &mut result.edges);
    }
    result
}

fn collect_by_id(
    items: Option<&serde_json::Value>,
    seen: &mut HashSet<String>,
    into: &mut Vec<serde_json::Value>,
) {
    let Some(items) = items.and_then(serde_json::Value::as_array) else {
        return;
    };
    for item in items {
        let Some(id) = item.get("id") else { continue };
        let key = match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if seen.insert(key) {
            into.push(item.clone());
        }
    }
}

fn relationship_from_row(row: &Row) -> Option<RelationshipInfo> {
    Some(RelationshipInfo {
        relationship: row.get("relationship")?.as_str()?.to_owned(),
        label: row.get("label")?.as_str()?.to_owned(),
        count: row
            .get("count")
            .and_then(PropertyValue::as_i64)
            .map_or(0, |c| c.max(0) as u64),
    })
}
