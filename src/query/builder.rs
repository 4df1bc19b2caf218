//! The statement shapes built from the query graph.

use tracing::debug;

use super::ast::{CypherQuery, EdgeDirection, EndElement, MatchElement, NodePattern, Operand};
use super::ast::{Predicate, Projection, RelPattern, Var};
use super::elements::{QueryCompiler, QueryElements};
use super::relevance::{links_to_root, relevant_links};
use super::{QueryOptions, QueryStructure};
use crate::graph::{Node, QueryGraph};
use crate::provider::{Attribute, LabelMetadata};
use crate::types::{NodeId, Result};

/// Variable of the single node matched by taxonomy counts.
const TAXONOMY_VAR: &str = "n";
/// Variables of the relationship and far end in relation discovery.
const DISCOVERY_REL_VAR: &str = "r";
const DISCOVERY_END_VAR: &str = "x";
const COUNT_ALIAS: &str = "count";

/// Builds statements from a graph, its label metadata and shared options.
///
/// Every builder is a pure function of its inputs: calling one twice on an
/// unmodified graph yields identical output. Each result has already been
/// passed through the matching filter hook of the label metadata.
pub struct QueryBuilder<'a, M: ?Sized> {
    graph: &'a QueryGraph,
    metadata: &'a M,
    options: &'a QueryOptions,
}

impl<'a, M: LabelMetadata + ?Sized> QueryBuilder<'a, M> {
    /// Creates a builder.
    pub fn new(graph: &'a QueryGraph, metadata: &'a M, options: &'a QueryOptions) -> Self {
        Self {
            graph,
            metadata,
            options,
        }
    }

    fn compiler(&self) -> QueryCompiler<'a, M> {
        QueryCompiler::new(
            self.graph,
            self.metadata,
            EdgeDirection::from_directed(self.options.use_relation_direction),
        )
    }

    fn base(elements: QueryElements, distinct: bool) -> CypherQuery {
        CypherQuery {
            matches: elements.match_elements,
            predicates: elements.where_elements,
            distinct,
            projections: Vec::new(),
            end: Vec::new(),
            parameters: elements.parameters,
        }
    }

    fn root_elements(&self) -> Result<(&'a Node, QueryElements)> {
        let root = self.graph.root()?;
        let links = relevant_links(self.graph, root.id, root.id);
        let elements = self.compiler().compile(root.id, root.id, &links, true)?;
        Ok((root, elements))
    }

    /// Rows of the root nodes matching the whole pattern.
    ///
    /// The constraint attribute is projected as is; other attributes are
    /// collected since they may fan out over several matches.
    pub fn result_query(&self) -> Result<QueryStructure> {
        let (root, elements) = self.root_elements()?;
        let mut query = Self::base(elements, true);
        query.projections = self.attribute_projections(root);
        if let Some(key) = self.metadata.result_order_by(&root.label) {
            query.end.push(EndElement::OrderBy {
                key,
                ascending: self.metadata.is_result_order_ascending(&root.label),
            });
        }
        query.end.push(EndElement::Limit(self.options.results_page_size));
        Ok(self.finish("result", root, query, M::filter_result_query))
    }

    /// Root variable plus every relationship variable, for graph rendering of
    /// results.
    pub fn graph_result_query(&self) -> Result<QueryStructure> {
        let (root, elements) = self.root_elements()?;
        let relations = elements.relation_elements.clone();
        let mut query = Self::base(elements, true);
        query.projections.push(Projection::Variable(Var::new(
            root.internal_label.as_str(),
        )));
        query
            .projections
            .extend(relations.into_iter().map(Projection::Variable));
        if let Some(key) = self.metadata.result_order_by(&root.label) {
            query.end.push(EndElement::OrderBy {
                key,
                ascending: self.metadata.is_result_order_ascending(&root.label),
            });
        }
        query.end.push(EndElement::Limit(self.options.results_page_size));
        Ok(self.finish("graph_result", root, query, M::filter_result_query))
    }

    /// Number of distinct values of `node` consistent with the pattern.
    pub fn node_count_query(&self, node: NodeId) -> Result<QueryStructure> {
        let root = self.graph.root()?;
        let counted = self.graph.node(node)?;
        let links = relevant_links(self.graph, root.id, counted.id);
        let elements = self.compiler().compile(root.id, counted.id, &links, true)?;
        let mut query = Self::base(elements, false);
        query.projections.push(Projection::CountDistinct {
            operand: self.constraint_operand(counted),
            alias: COUNT_ALIAS.to_owned(),
        });
        Ok(self.finish("node_count", counted, query, M::filter_node_count_query))
    }

    /// Candidate values of `node`, each with the number of matching roots.
    ///
    /// The node's own value never constrains its listing.
    pub fn node_value_query(&self, node: NodeId) -> Result<QueryStructure> {
        let root = self.graph.root()?;
        let target = self.graph.node(node)?;
        let links = relevant_links(self.graph, root.id, target.id);
        let elements = self.compiler().compile_elements(
            root.id,
            target.id,
            &links,
            true,
            target.id == root.id,
        )?;
        let mut query = Self::base(elements, true);
        query.projections = self.attribute_projections(target);
        query.projections.push(Projection::CountDistinct {
            operand: self.constraint_operand(root),
            alias: COUNT_ALIAS.to_owned(),
        });
        if let Some(key) = self.metadata.value_order_by(&target.label) {
            query.end.push(EndElement::OrderBy {
                key,
                ascending: self.metadata.is_value_order_ascending(&target.label),
            });
        }
        query.end.push(EndElement::Limit(self.options.value_query_limit));
        Ok(self.finish("node_value", target, query, M::filter_node_value_query))
    }

    /// Relationship types leaving `node`, with the far-end label and count.
    ///
    /// Matches the straight path from the root down to `node` without value
    /// constraints.
    pub fn node_relation_query(&self, node: NodeId) -> Result<QueryStructure> {
        let root = self.graph.root()?;
        let target = self.graph.node(node)?;
        let links = links_to_root(self.graph, target.id)?;
        let elements = self.compiler().compile(root.id, target.id, &links, false)?;
        let mut query = Self::base(elements, false);
        query.matches.push(MatchElement::Path {
            source: NodePattern::labeled(target.internal_label.as_str(), target.label.as_str()),
            rel: RelPattern {
                var: Var::new(DISCOVERY_REL_VAR),
                rel_type: None,
                direction: EdgeDirection::from_directed(self.options.use_relation_direction),
            },
            target: NodePattern::anonymous(DISCOVERY_END_VAR),
        });
        let label_fn = if self.options.use_parent_relation {
            "head"
        } else {
            "last"
        };
        query.projections = vec![
            Projection::Expr {
                expr: format!("type({DISCOVERY_REL_VAR})"),
                alias: "relationship".to_owned(),
            },
            Projection::Expr {
                expr: format!("{label_fn}(labels({DISCOVERY_END_VAR}))"),
                alias: "label".to_owned(),
            },
            Projection::Expr {
                expr: format!("count({DISCOVERY_REL_VAR})"),
                alias: COUNT_ALIAS.to_owned(),
            },
        ];
        query.end.push(EndElement::OrderBy {
            key: format!("count({DISCOVERY_REL_VAR})"),
            ascending: false,
        });
        Ok(self.finish("node_relation", target, query, M::filter_node_relation_query))
    }

    /// One count statement per counted node, in graph order.
    ///
    /// Responses must be matched back to the returned ids by position.
    pub fn count_queries(&self) -> Result<Vec<(NodeId, QueryStructure)>> {
        self.graph
            .counted_nodes()
            .into_iter()
            .map(|id| Ok((id, self.node_count_query(id)?)))
            .collect()
    }

    /// Number of distinct nodes of `label`, independent of the graph.
    pub fn taxonomy_count_query(&self, label: &str) -> QueryStructure {
        taxonomy_count_query(self.metadata, label)
    }

    fn constraint_operand(&self, node: &Node) -> Operand {
        operand(
            &node.internal_label,
            &self.metadata.constraint_attribute(&node.label),
        )
    }

    fn attribute_projections(&self, node: &Node) -> Vec<Projection> {
        let constraint = self.metadata.constraint_attribute(&node.label);
        self.metadata
            .return_attributes(&node.label)
            .into_iter()
            .map(|attribute| {
                let alias = attribute.name().to_owned();
                let operand = operand(&node.internal_label, &attribute);
                if attribute == constraint {
                    Projection::Field { operand, alias }
                } else {
                    Projection::Collect { operand, alias }
                }
            })
            .collect()
    }

    fn finish(
        &self,
        kind: &'static str,
        node: &Node,
        query: CypherQuery,
        filter: fn(&M, &Node, QueryStructure) -> QueryStructure,
    ) -> QueryStructure {
        let structure = filter(self.metadata, node, query.into_structure());
        debug!(
            kind,
            label = %node.label,
            node = %node.id,
            parameters = structure.parameters.len(),
            statement = %structure.statement,
            "query.builder.generate"
        );
        structure
    }
}

fn operand(var: &str, attribute: &Attribute) -> Operand {
    match attribute {
        Attribute::InternalId => Operand::Identity(Var::new(var)),
        Attribute::Property(name) => Operand::Property {
            var: Var::new(var),
            attribute: name.clone(),
        },
    }
}

/// Counts the distinct nodes of `label` under its predefined constraints.
pub fn taxonomy_count_query<M: LabelMetadata + ?Sized>(metadata: &M, label: &str) -> QueryStructure {
    let predicates = metadata
        .predefined_constraints(label)
        .into_iter()
        .map(|template| Predicate::Raw(template.replace("$identifier", TAXONOMY_VAR)))
        .collect();
    let query = CypherQuery {
        matches: vec![MatchElement::Node(NodePattern::labeled(TAXONOMY_VAR, label))],
        predicates,
        distinct: false,
        projections: vec![Projection::CountDistinct {
            operand: operand(TAXONOMY_VAR, &metadata.constraint_attribute(label)),
            alias: COUNT_ALIAS.to_owned(),
        }],
        end: Vec::new(),
        parameters: Default::default(),
    };
    let structure = query.into_structure();
    debug!(label, statement = %structure.statement, "query.builder.taxonomy");
    structure
}
