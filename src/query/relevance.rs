//! Selection of the links a statement has to match.

use std::collections::HashSet;

use tracing::trace;

use crate::graph::{Link, QueryGraph};
use crate::types::{LinkId, NodeId, QueryGraphError, Result};

/// Links needed to reach every bound node plus `target`.
///
/// Links ending at a bound node or at `target` are kept directly; from each of
/// them the walk climbs through the remaining links toward `root`, keeping
/// every connective link it crosses. Branches that carry neither a value nor
/// the target are left out. A walk that runs out of links before reaching the
/// root keeps what it collected.
///
/// Only relation links take part; value links never describe the pattern.
/// The selection is returned in creation order, so the root-most link comes
/// first along any path.
pub fn relevant_links(graph: &QueryGraph, root: NodeId, target: NodeId) -> Vec<LinkId> {
    let (filtered, mut remainder): (Vec<&Link>, Vec<&Link>) = graph
        .links()
        .filter(|l| l.is_relation())
        .partition(|l| {
            l.target == target || graph.node(l.target).map_or(false, |n| n.is_bound())
        });

    let mut selected: HashSet<LinkId> = filtered.iter().map(|l| l.id).collect();
    for link in &filtered {
        let mut source = link.source;
        // The last candidate wins when several links end at the same node.
        while let Some(pos) = remainder.iter().rposition(|l| l.target == source) {
            let connective = remainder.remove(pos);
            selected.insert(connective.id);
            if connective.source == root {
                break;
            }
            source = connective.source;
        }
    }

    let links: Vec<LinkId> = graph
        .links()
        .filter(|l| selected.contains(&l.id))
        .map(|l| l.id)
        .collect();
    trace!(root = %root, target = %target, links = links.len(), "query.relevance.select");
    links
}

/// Straight path of relation links from `node` up to the root.
///
/// The path starts with the link entering `node`. A node visited twice is
/// reported as [`QueryGraphError::CyclicGraph`]; a node with no incoming link
/// short of the root as [`QueryGraphError::DetachedNode`].
pub fn links_to_root(graph: &QueryGraph, node: NodeId) -> Result<Vec<LinkId>> {
    graph.node(node)?;
    let root = graph.root_id()?;
    let mut path = Vec::new();
    let mut visited = HashSet::new();
    let mut current = node;
    while current != root {
        if !visited.insert(current) {
            return Err(QueryGraphError::CyclicGraph { node: current });
        }
        let link = graph
            .links()
            .find(|l| l.is_relation() && l.target == current)
            .ok_or(QueryGraphError::DetachedNode { node: current })?;
        path.push(link.id);
        current = link.source;
    }
    Ok(path)
}
