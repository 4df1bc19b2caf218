#![allow(missing_docs)]

use sombra_pattern::{
    query::relevant_links, Attribute, LabelMetadata, LabelProvider, NodeId, PropertyValue,
    ProviderRegistry, QueryBuilder, QueryGraph, QueryOptions, Row,
};

fn row(pairs: &[(&str, PropertyValue)]) -> Row {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.clone()))
        .collect()
}

fn bind(graph: &mut QueryGraph, node: NodeId, attributes: Row) -> NodeId {
    let value = graph.add_value_node(node, attributes).expect("value node");
    graph.bind_value(node, value).expect("bind value");
    value
}

fn crm_registry() -> ProviderRegistry {
    ProviderRegistry::builder()
        .with_provider(
            "Account",
            LabelProvider::new()
                .with_constraint_attribute("name")
                .with_return_attributes(["name", "industry"])
                .with_children(["Contact"]),
        )
        .with_provider(
            "Contact",
            LabelProvider::new()
                .with_parent("Account")
                .with_return_attributes(["born"]),
        )
        .build()
}

#[test]
fn unbound_graph_has_no_predicates() {
    let mut graph = QueryGraph::with_root("Account");
    let root = graph.root_id().expect("root");
    let contact = graph
        .add_relationship(root, "OWNS", "Contact", false)
        .expect("contact");
    graph
        .add_relationship(contact, "WORKS_AT", "Company", false)
        .expect("company");

    let registry = ProviderRegistry::default();
    let options = QueryOptions::default();
    let builder = QueryBuilder::new(&graph, &registry, &options);

    let mut structures = vec![
        builder.result_query().expect("result"),
        builder.graph_result_query().expect("graph"),
    ];
    for node in graph.counted_nodes() {
        structures.push(builder.node_count_query(node).expect("count"));
        structures.push(builder.node_value_query(node).expect("values"));
        structures.push(builder.node_relation_query(node).expect("relations"));
    }
    for structure in structures {
        assert!(
            structure.where_elements.is_empty(),
            "unexpected predicates in {}",
            structure.statement
        );
        assert!(structure.parameters.is_empty());
    }
}

#[test]
fn root_only_graph_matches_single_pattern() {
    let graph = QueryGraph::with_root("Account");
    let registry = ProviderRegistry::default();
    let options = QueryOptions::default();
    let query = QueryBuilder::new(&graph, &registry, &options)
        .result_query()
        .expect("result");
    assert_eq!(query.match_elements, vec!["(account:`Account`)"]);
    assert_eq!(
        query.statement,
        "MATCH (account:`Account`) RETURN DISTINCT ID(account) AS NEO4JID LIMIT 100"
    );
}

#[test]
fn relevant_links_follow_the_bound_chain() {
    let mut graph = QueryGraph::with_root("Root");
    let root = graph.root_id().expect("root");
    let a = graph.add_relationship(root, "TO_A", "A", false).expect("a");
    let sibling = graph
        .add_relationship(a, "TO_SIBLING", "Sibling", false)
        .expect("sibling");
    let b = graph.add_relationship(a, "TO_B", "B", false).expect("b");
    let c = graph.add_relationship(b, "TO_C", "C", false).expect("c");
    bind(&mut graph, c, row(&[("NEO4JID", PropertyValue::Int(3))]));

    let labels: Vec<String> = relevant_links(&graph, root, root)
        .into_iter()
        .map(|id| {
            let link = graph.link(id).expect("link");
            format!(
                "{}->{}",
                graph.node(link.source).expect("source").label,
                graph.node(link.target).expect("target").label
            )
        })
        .collect();
    assert_eq!(labels, vec!["Root->A", "A->B", "B->C"]);
    assert!(!labels.iter().any(|l| l.contains(&graph.node(sibling).unwrap().label)));
}

#[test]
fn value_listing_never_constrains_its_own_node() {
    let mut graph = QueryGraph::with_root("Account");
    let root = graph.root_id().expect("root");
    let contact = graph
        .add_relationship(root, "OWNS", "Contact", false)
        .expect("contact");
    bind(&mut graph, contact, row(&[("name", "Ada".into())]));
    bind(&mut graph, root, row(&[("name", "Acme".into())]));

    let registry = crm_registry();
    let options = QueryOptions::default();
    let builder = QueryBuilder::new(&graph, &registry, &options);

    let contact_values = builder.node_value_query(contact).expect("contact values");
    assert_eq!(
        contact_values.match_elements,
        vec![
            "(account:`Account`{`name`:{`account_name`}})",
            "(account:`Account`)-[r0:`OWNS`]->(contact:`Contact`)",
        ]
    );
    assert!(!contact_values.parameters.contains_key("contact_name"));

    let root_values = builder.node_value_query(root).expect("root values");
    assert!(!root_values.parameters.contains_key("account_name"));
    assert_eq!(
        root_values.parameters.get("contact_name"),
        Some(&PropertyValue::from("Ada"))
    );
}

#[test]
fn relation_discovery_from_an_unbound_choose_node() {
    let mut graph = QueryGraph::with_root("Account");
    let root = graph.root_id().expect("root");
    let contact = graph
        .add_relationship(root, "OWNS", "Contact", false)
        .expect("contact");

    let registry = ProviderRegistry::default();
    let options = QueryOptions::default();
    let query = QueryBuilder::new(&graph, &registry, &options)
        .node_relation_query(contact)
        .expect("relations");

    assert_eq!(
        query.match_elements,
        vec![
            "(account:`Account`)",
            "(account:`Account`)-[r0:`OWNS`]->(contact:`Contact`)",
            "(contact:`Contact`)-[r]->(x)",
        ]
    );
    assert_eq!(
        query.return_elements,
        vec![
            "type(r) AS relationship",
            "last(labels(x)) AS label",
            "count(r) AS count",
        ]
    );
    assert_eq!(query.end_elements, vec!["ORDER BY count(r) DESC"]);
    assert!(!query.distinct);
}

#[test]
fn relation_discovery_ignores_bound_values() {
    let mut graph = QueryGraph::with_root("Account");
    let root = graph.root_id().expect("root");
    let contact = graph
        .add_relationship(root, "OWNS", "Contact", false)
        .expect("contact");
    bind(&mut graph, root, row(&[("name", "Acme".into())]));

    let registry = crm_registry();
    let options = QueryOptions {
        use_relation_direction: false,
        ..QueryOptions::default()
    };
    let query = QueryBuilder::new(&graph, &registry, &options)
        .node_relation_query(contact)
        .expect("relations");
    assert_eq!(
        query.statement,
        "MATCH (account:`Account`), (account:`Account`)-[r0:`OWNS`]-(contact:`Contact`), \
         (contact:`Contact`)-[r]-(x) \
         RETURN type(r) AS relationship, last(labels(x)) AS label, count(r) AS count \
         ORDER BY count(r) DESC"
    );
    assert!(query.parameters.is_empty());
}

#[test]
fn internal_id_constraint_adds_no_parameter() {
    let mut graph = QueryGraph::with_root("Account");
    let root = graph.root_id().expect("root");
    bind(&mut graph, root, row(&[("NEO4JID", PropertyValue::Int(42))]));

    let registry = ProviderRegistry::default();
    let options = QueryOptions::default();
    let query = QueryBuilder::new(&graph, &registry, &options)
        .result_query()
        .expect("result");
    assert_eq!(query.match_elements, vec!["(account:`Account`)"]);
    assert_eq!(query.where_elements, vec!["ID(account) = 42"]);
    assert!(query.parameters.is_empty());
}

#[test]
fn inherited_return_attributes_are_merged() {
    let registry = crm_registry();
    let attributes = registry.return_attributes("Contact");
    assert_eq!(
        attributes,
        vec![
            Attribute::property("born"),
            Attribute::property("name"),
            Attribute::property("industry"),
        ]
    );
    assert_eq!(
        registry.constraint_attribute("Contact"),
        Attribute::property("name")
    );
}

#[test]
fn count_queries_skip_value_and_group_nodes() {
    let mut graph = QueryGraph::with_root("Account");
    let root = graph.root_id().expect("root");
    let group = graph
        .add_relationship(root, "HAS", "Segment", true)
        .expect("group");
    let contact = graph
        .add_relationship(root, "OWNS", "Contact", false)
        .expect("contact");
    graph
        .add_value_node(contact, row(&[("NEO4JID", PropertyValue::Int(5))]))
        .expect("candidate");

    let registry = ProviderRegistry::default();
    let options = QueryOptions::default();
    let counted: Vec<NodeId> = QueryBuilder::new(&graph, &registry, &options)
        .count_queries()
        .expect("counts")
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(counted, vec![root, contact]);
    assert!(!counted.contains(&group));
}

#[test]
fn builders_are_deterministic() {
    let mut graph = QueryGraph::with_root("Account");
    let root = graph.root_id().expect("root");
    let contact = graph
        .add_relationship(root, "OWNS", "Contact", false)
        .expect("contact");
    bind(&mut graph, contact, row(&[("name", "Ada".into())]));

    let registry = crm_registry();
    let options = QueryOptions::default();
    let builder = QueryBuilder::new(&graph, &registry, &options);
    let first = builder.result_query().expect("first");
    let second = builder.result_query().expect("second");
    assert_eq!(first.statement, second.statement);
    assert_eq!(first.parameters, second.parameters);
    assert_eq!(
        first.statement,
        "MATCH (account:`Account`), \
         (account:`Account`)-[r0:`OWNS`]->(contact:`Contact`{`name`:{`contact_name`}}) \
         RETURN DISTINCT account.name AS name, COLLECT(DISTINCT account.industry) AS industry \
         LIMIT 100"
    );
}
