#![allow(missing_docs)]

use std::cell::RefCell;
use std::collections::VecDeque;

use sombra_pattern::{
    graph::{NodeType, RelationshipInfo},
    transport::{
        DataEntry, StatementResult, TransactionRequest, TransactionResponse, Transport,
        TransportError,
    },
    LabelProvider, PropertyValue, ProviderRegistry, QueryGraphError, QueryOptions, QuerySession,
};

/// Replays canned responses in order and records every request.
#[derive(Default)]
struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<TransactionResponse, TransportError>>>,
    requests: RefCell<Vec<TransactionRequest>>,
}

impl ScriptedTransport {
    fn push(&self, outcome: Result<TransactionResponse, TransportError>) -> &Self {
        self.responses.borrow_mut().push_back(outcome);
        self
    }

    fn sent(&self) -> Vec<TransactionRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn post(&self, request: &TransactionRequest) -> Result<TransactionResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted response".into())))
    }
}

fn result(columns: &[&str], rows: Vec<Vec<PropertyValue>>) -> StatementResult {
    StatementResult {
        columns: columns.iter().map(|c| (*c).to_owned()).collect(),
        data: rows
            .into_iter()
            .map(|row| DataEntry { row, graph: None })
            .collect(),
    }
}

fn response(results: Vec<StatementResult>) -> TransactionResponse {
    TransactionResponse {
        results,
        errors: Vec::new(),
    }
}

fn registry() -> ProviderRegistry {
    ProviderRegistry::builder()
        .with_provider(
            "Account",
            LabelProvider::new()
                .with_constraint_attribute("name")
                .with_return_attributes(["name"]),
        )
        .with_relation_filter(|info: &RelationshipInfo| info.relationship != "AUDITED_BY")
        .build()
}

fn session(options: QueryOptions) -> QuerySession {
    let mut session = QuerySession::new(registry(), options);
    session.start("Account");
    session
}

#[test]
fn value_listing_pages_and_selection() {
    let mut session = session(QueryOptions {
        value_page_size: 2,
        ..QueryOptions::default()
    });
    let root = session.graph().root_id().expect("root");
    let transport = ScriptedTransport::default();
    transport.push(Ok(response(vec![result(
        &["name", "count"],
        vec![
            vec!["Acme".into(), PropertyValue::Int(4)],
            vec!["Globex".into(), PropertyValue::Int(2)],
            vec!["Initech".into(), PropertyValue::Int(1)],
        ],
    )])));

    let first_page = session
        .run_value_request(root, &transport)
        .expect("value listing");
    assert_eq!(first_page.len(), 2);
    assert!(!session.is_waiting());
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].statements[0]
        .statement
        .starts_with("MATCH (account:`Account`) RETURN DISTINCT account.name AS name"));

    let second_page = session.next_page(root).expect("next page");
    assert_eq!(second_page.len(), 1);
    let value = second_page[0];
    assert_eq!(
        session.graph().node(value).expect("value").attribute("name"),
        Some(&PropertyValue::from("Initech"))
    );

    let wrapped = session.next_page(root).expect("wrap");
    assert_eq!(wrapped.len(), 2);

    let selected = wrapped[1];
    assert_eq!(session.select_value(selected).expect("select"), root);
    let root_node = session.graph().node(root).expect("root node");
    assert_eq!(root_node.value, Some(selected));
    let remaining_values = session
        .graph()
        .nodes()
        .filter(|n| n.node_type == NodeType::Value)
        .count();
    assert_eq!(remaining_values, 1);

    let statement = session
        .builder()
        .result_query()
        .expect("result")
        .into_statement();
    assert_eq!(
        statement.parameters.get("account_name"),
        Some(&PropertyValue::from("Globex"))
    );
}

#[test]
fn failed_value_listing_releases_busy_flag() {
    let mut session = session(QueryOptions::default());
    let root = session.graph().root_id().expect("root");
    let transport = ScriptedTransport::default();
    transport.push(Err(TransportError::Request("connection refused".into())));

    let err = session.run_value_request(root, &transport).unwrap_err();
    assert!(matches!(err, QueryGraphError::Transport(_)));
    assert!(!session.is_waiting());
    assert!(session
        .begin_value_request(root)
        .expect("begin again")
        .is_some());
}

#[test]
fn second_listing_is_refused_while_waiting() {
    let mut session = session(QueryOptions::default());
    let root = session.graph().root_id().expect("root");
    let first = session.begin_value_request(root).expect("first");
    assert!(first.is_some());
    assert!(session.begin_value_request(root).expect("second").is_none());
}

#[test]
fn abandoned_listing_response_is_stale() {
    let mut session = session(QueryOptions::default());
    let root = session.graph().root_id().expect("root");
    let request = session
        .begin_value_request(root)
        .expect("begin")
        .expect("issued");
    session.start("Account");
    let root = session.graph().root_id().expect("new root");

    let err = session
        .complete_value_request(&request, Ok(response(Vec::new())))
        .unwrap_err();
    assert!(matches!(err, QueryGraphError::StaleResponse { .. }));
    assert!(session.graph().node(root).expect("root").data.is_empty());
}

#[test]
fn count_refresh_matches_results_by_position() {
    let mut session = session(QueryOptions::default());
    let root = session.graph().root_id().expect("root");
    let contact = session
        .graph_mut()
        .add_relationship(root, "OWNS", "Contact", false)
        .expect("contact");
    let transport = ScriptedTransport::default();
    transport.push(Ok(response(vec![
        result(&["count"], vec![vec![PropertyValue::Int(12)]]),
        result(&["count"], vec![vec![PropertyValue::Int(30)]]),
    ])));

    session.run_count_refresh(&transport).expect("refresh");
    assert_eq!(transport.sent()[0].statements.len(), 2);
    assert_eq!(session.result_count().expect("count"), 12);
    assert_eq!(session.graph().node(contact).expect("contact").count, 30);

    transport.push(Err(TransportError::Server {
        code: "Neo.TransientError.General.DatabaseUnavailable".into(),
        message: "unavailable".into(),
    }));
    session.run_count_refresh(&transport).expect("refresh");
    assert_eq!(session.result_count().expect("count"), 0);
    assert_eq!(session.graph().node(contact).expect("contact").count, 0);
}

#[test]
fn discovered_relationships_are_filtered_and_expanded() {
    let mut session = session(QueryOptions::default());
    let root = session.graph().root_id().expect("root");
    let transport = ScriptedTransport::default();
    transport.push(Ok(response(vec![result(
        &["relationship", "label", "count"],
        vec![
            vec!["OWNS".into(), "Contact".into(), PropertyValue::Int(8)],
            vec!["AUDITED_BY".into(), "Auditor".into(), PropertyValue::Int(1)],
        ],
    )])));

    let relationships = session
        .run_relation_request(root, &transport)
        .expect("relations");
    assert_eq!(
        relationships,
        vec![RelationshipInfo {
            relationship: "OWNS".into(),
            label: "Contact".into(),
            count: 8,
        }]
    );

    let children = session.expand_relationships(root).expect("expand");
    assert_eq!(children.len(), 1);
    let contact = session.graph().node(children[0]).expect("contact");
    assert_eq!(contact.internal_label, "contact");
    assert_eq!(contact.node_type, NodeType::Choose);

    assert_eq!(session.collapse_relationships(root).expect("collapse"), 1);
    assert_eq!(session.graph().node_count(), 1);
}

#[test]
fn result_rows_carry_root_label() {
    let session = session(QueryOptions::default());
    let transport = ScriptedTransport::default();
    transport.push(Ok(response(vec![result(
        &["name"],
        vec![vec!["Acme".into()], vec!["Globex".into()]],
    )])));

    let records = session.run_result_request(&transport).expect("results");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].index, 1);
    assert_eq!(records[1].label, "Account");
    assert_eq!(
        records[0].attributes.get("name"),
        Some(&PropertyValue::from("Acme"))
    );
}

#[test]
fn auto_expanding_labels_add_children() {
    let registry = ProviderRegistry::builder()
        .with_provider(
            "Account",
            LabelProvider {
                auto_expand_relations: Some(true),
                ..LabelProvider::new()
            },
        )
        .build();
    let mut session = QuerySession::new(registry, QueryOptions::default());
    let root = session.start("Account");
    let contact = session
        .graph_mut()
        .add_relationship(root, "OWNS", "Contact", false)
        .expect("contact");
    let transport = ScriptedTransport::default();
    transport.push(Ok(response(vec![result(
        &["relationship", "label", "count"],
        vec![vec!["LOCATED_IN".into(), "City".into(), PropertyValue::Int(2)]],
    )])));

    let children = session
        .run_auto_expand(root, &transport)
        .expect("auto expand");
    assert_eq!(children.len(), 1);
    assert_eq!(
        session.graph().node(children[0]).expect("city").label,
        "City"
    );

    assert!(session
        .run_auto_expand(contact, &transport)
        .expect("contact")
        .is_empty());
    assert_eq!(transport.sent().len(), 1);
}
