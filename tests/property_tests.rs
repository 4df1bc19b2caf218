use proptest::prelude::*;
use sombra_pattern::{
    graph::InternalLabels, NodeId, PropertyValue, ProviderRegistry, QueryBuilder, QueryGraph,
    QueryOptions, Row,
};
use std::collections::HashSet;

const LABELS: &[&str] = &["Person", "person ", "PERSON", "Movie", "Genre", "Re view", ""];

#[derive(Debug, Clone)]
struct Expansion {
    parent: usize,
    label: usize,
    bound: Option<i64>,
}

fn arb_expansion() -> impl Strategy<Value = Expansion> {
    (any::<usize>(), 0..LABELS.len(), prop::option::of(0i64..1_000)).prop_map(
        |(parent, label, bound)| Expansion {
            parent,
            label,
            bound,
        },
    )
}

fn build_graph(expansions: &[Expansion]) -> (QueryGraph, Vec<NodeId>) {
    let mut graph = QueryGraph::with_root("Person");
    let mut nodes = vec![graph.root_id().unwrap()];
    for expansion in expansions {
        let parent = nodes[expansion.parent % nodes.len()];
        let child = graph
            .add_relationship(parent, "RELATED_TO", LABELS[expansion.label], false)
            .unwrap();
        if let Some(id) = expansion.bound {
            let mut attributes = Row::new();
            attributes.insert("NEO4JID".to_owned(), PropertyValue::Int(id));
            let value = graph.add_value_node(child, attributes).unwrap();
            graph.bind_value(child, value).unwrap();
        }
        nodes.push(child);
    }
    (graph, nodes)
}

proptest! {
    #[test]
    fn prop_internal_labels_are_unique(labels in prop::collection::vec(0..LABELS.len(), 1..64)) {
        let mut generator = InternalLabels::new();
        let mut seen = HashSet::new();
        for idx in labels {
            let name = generator.generate(LABELS[idx]);
            prop_assert!(!name.is_empty());
            prop_assert!(!name.contains(' '));
            prop_assert!(seen.insert(name));
        }
    }

    #[test]
    fn prop_unbound_graphs_have_no_predicates(
        expansions in prop::collection::vec(
            arb_expansion().prop_map(|e| Expansion { bound: None, ..e }),
            0..24,
        )
    ) {
        let (graph, nodes) = build_graph(&expansions);
        let registry = ProviderRegistry::default();
        let options = QueryOptions::default();
        let builder = QueryBuilder::new(&graph, &registry, &options);
        prop_assert!(builder.result_query().unwrap().where_elements.is_empty());
        for node in nodes {
            prop_assert!(builder.node_count_query(node).unwrap().where_elements.is_empty());
            prop_assert!(builder.node_value_query(node).unwrap().where_elements.is_empty());
        }
    }

    #[test]
    fn prop_builders_are_idempotent(expansions in prop::collection::vec(arb_expansion(), 0..24)) {
        let (graph, nodes) = build_graph(&expansions);
        let registry = ProviderRegistry::default();
        let options = QueryOptions::default();
        let builder = QueryBuilder::new(&graph, &registry, &options);
        prop_assert_eq!(builder.result_query().unwrap(), builder.result_query().unwrap());
        prop_assert_eq!(
            builder.graph_result_query().unwrap(),
            builder.graph_result_query().unwrap()
        );
        for node in nodes {
            prop_assert_eq!(
                builder.node_value_query(node).unwrap(),
                builder.node_value_query(node).unwrap()
            );
            prop_assert_eq!(
                builder.node_relation_query(node).unwrap(),
                builder.node_relation_query(node).unwrap()
            );
        }
    }

    #[test]
    fn prop_value_listing_excludes_own_constraint(
        expansions in prop::collection::vec(arb_expansion(), 1..24),
        pick in any::<usize>(),
    ) {
        let (graph, nodes) = build_graph(&expansions);
        let node = nodes[pick % nodes.len()];
        let internal_label = graph.node(node).unwrap().internal_label.clone();
        let registry = ProviderRegistry::default();
        let options = QueryOptions::default();
        let query = QueryBuilder::new(&graph, &registry, &options)
            .node_value_query(node)
            .unwrap();
        let own = format!("ID({internal_label}) =");
        prop_assert!(!query.where_elements.iter().any(|w| w.starts_with(&own)));
    }

    #[test]
    fn prop_removal_leaves_no_dangling_references(
        expansions in prop::collection::vec(arb_expansion(), 1..24),
        pick in any::<usize>(),
    ) {
        let (mut graph, nodes) = build_graph(&expansions);
        let victim = nodes[1 + pick % (nodes.len() - 1)];
        graph.remove_node(victim).unwrap();
        prop_assert!(graph.node(victim).is_err());
        for link in graph.links() {
            prop_assert!(graph.node(link.source).is_ok());
            prop_assert!(graph.node(link.target).is_ok());
        }
        for node in graph.nodes() {
            if let Some(value) = node.value {
                prop_assert!(graph.node(value).is_ok());
            }
            if let Some(parent) = node.parent {
                prop_assert!(graph.node(parent).is_ok());
            }
        }
    }
}
