use tracing::trace;

use super::ast::{EdgeDirection, MatchElement, NodePattern, Predicate, RelPattern, Var};
use super::Parameters;
use crate::graph::{Node, QueryGraph};
use crate::provider::{Attribute, LabelMetadata};
use crate::types::{LinkId, NodeId, Result};
use crate::value::PropertyValue;

const IDENTIFIER_PLACEHOLDER: &str = "$identifier";

/// Match and where fragments compiled from a set of links.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryElements {
    /// Root pattern first, then one element per link.
    pub match_elements: Vec<MatchElement>,
    /// Predicates in emission order.
    pub where_elements: Vec<Predicate>,
    /// Relationship variables `r0`, `r1`, ...
    pub relation_elements: Vec<Var>,
    /// Parameters named `{internal_label}_{attribute}`.
    pub parameters: Parameters,
}

/// Turns graph nodes and links into [`QueryElements`].
pub struct QueryCompiler<'a, M: ?Sized> {
    graph: &'a QueryGraph,
    metadata: &'a M,
    direction: EdgeDirection,
}

impl<'a, M: LabelMetadata + ?Sized> QueryCompiler<'a, M> {
    /// Creates a compiler over `graph`.
    pub fn new(graph: &'a QueryGraph, metadata: &'a M, direction: EdgeDirection) -> Self {
        Self {
            graph,
            metadata,
            direction,
        }
    }

    /// Compiles the root pattern followed by one pattern per link.
    ///
    /// Bound nodes are constrained to their value when `constraint_needed` is
    /// set or the root is immutable. The target of a link equal to `selected`
    /// is never constrained.
    pub fn compile(
        &self,
        root: NodeId,
        selected: NodeId,
        links: &[LinkId],
        constraint_needed: bool,
    ) -> Result<QueryElements> {
        self.compile_elements(root, selected, links, constraint_needed, false)
    }

    /// Same as [`compile`](Self::compile); `exclude_root` also leaves the
    /// root's own value out, for listings of the root's values.
    pub(crate) fn compile_elements(
        &self,
        root: NodeId,
        selected: NodeId,
        links: &[LinkId],
        constraint_needed: bool,
        exclude_root: bool,
    ) -> Result<QueryElements> {
        let root = self.graph.node(root)?;
        let apply = constraint_needed || root.immutable;
        let mut elements = QueryElements::default();

        self.push_predefined(root, &mut elements);
        let root_pattern = self.node_pattern(root, apply && !exclude_root, &mut elements);
        elements.match_elements.push(MatchElement::Node(root_pattern));

        for (idx, link_id) in links.iter().enumerate() {
            let link = self.graph.link(*link_id)?;
            let source = self.graph.node(link.source)?;
            let target = self.graph.node(link.target)?;
            let rel = Var(format!("r{idx}"));
            elements.relation_elements.push(rel.clone());

            self.push_predefined(target, &mut elements);
            let target_pattern =
                self.node_pattern(target, apply && target.id != selected, &mut elements);
            elements.match_elements.push(MatchElement::Path {
                source: NodePattern::labeled(source.internal_label.as_str(), source.label.as_str()),
                rel: RelPattern {
                    var: rel,
                    rel_type: link.label.clone(),
                    direction: self.direction,
                },
                target: target_pattern,
            });
        }

        trace!(
            root = %root.id,
            selected = %selected,
            matches = elements.match_elements.len(),
            predicates = elements.where_elements.len(),
            "query.elements.compile"
        );
        Ok(elements)
    }

    fn push_predefined(&self, node: &Node, elements: &mut QueryElements) {
        elements.where_elements.extend(
            self.metadata
                .predefined_constraints(&node.label)
                .into_iter()
                .map(|template| {
                    Predicate::Raw(template.replace(IDENTIFIER_PLACEHOLDER, &node.internal_label))
                }),
        );
    }

    fn node_pattern(&self, node: &Node, constrain: bool, elements: &mut QueryElements) -> NodePattern {
        let pattern = NodePattern::labeled(node.internal_label.as_str(), node.label.as_str());
        let value = match self.graph.bound_value(node) {
            Some(value) if constrain => value,
            _ => return pattern,
        };
        match self.metadata.constraint_attribute(&node.label) {
            Attribute::InternalId => {
                elements.where_elements.push(Predicate::InternalId {
                    var: Var::new(node.internal_label.as_str()),
                    id: value.internal_id,
                });
                pattern
            }
            Attribute::Property(attribute) => {
                let parameter = format!("{}_{}", node.internal_label, attribute);
                let bound = value
                    .attribute(&attribute)
                    .cloned()
                    .unwrap_or(PropertyValue::Null);
                elements.parameters.insert(parameter.clone(), bound);
                pattern.constrained(attribute, parameter)
            }
        }
    }
}
