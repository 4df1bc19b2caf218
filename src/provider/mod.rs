#![forbid(unsafe_code)]

//! Per-label metadata consumed by the query compiler.
//!
//! A [`LabelProvider`] declares how nodes of one label are constrained,
//! returned and ordered. Declarations are partial: anything a provider leaves
//! out is inherited from its parent label and finally from the default
//! provider. The [`ProviderRegistry`] resolves those chains once per label and
//! serves the result through the read-only [`LabelMetadata`] contract.

mod registry;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use registry::{ProviderRegistry, ProviderRegistryBuilder, ResolvedProvider};

use crate::graph::{Node, RelationshipInfo};
use crate::query::QueryStructure;
use crate::value::INTERNAL_ID_COLUMN;

/// Attribute of a node used as constraint, projection or ordering key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Attribute {
    /// The database identity of the node (`ID(n)`), returned as `NEO4JID`.
    InternalId,
    /// A named property.
    Property(String),
}

impl Attribute {
    /// Convenience constructor for a named property.
    pub fn property(name: impl Into<String>) -> Self {
        Attribute::Property(name.into())
    }

    /// Name used as the `RETURN` alias and in parameter names.
    pub fn name(&self) -> &str {
        match self {
            Attribute::InternalId => INTERNAL_ID_COLUMN,
            Attribute::Property(name) => name,
        }
    }

    /// Returns true for the internal-identity sentinel.
    pub fn is_internal_id(&self) -> bool {
        matches!(self, Attribute::InternalId)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        if value == INTERNAL_ID_COLUMN {
            Attribute::InternalId
        } else {
            Attribute::Property(value)
        }
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::from(value.to_owned())
    }
}

impl From<Attribute> for String {
    fn from(value: Attribute) -> Self {
        value.name().to_owned()
    }
}

/// Hook rewriting a generated query before it is returned to the caller.
pub type QueryFilter = Arc<dyn Fn(&Node, QueryStructure) -> QueryStructure + Send + Sync>;

/// Predicate deciding whether a discovered relationship is kept.
pub type RelationFilter = Arc<dyn Fn(&RelationshipInfo) -> bool + Send + Sync>;

/// The four query filter hooks of a provider.
#[derive(Clone, Default)]
pub struct QueryFilters {
    /// Applied to the result query, with the root node.
    pub result: Option<QueryFilter>,
    /// Applied to value-listing queries, with the listed node.
    pub node_value: Option<QueryFilter>,
    /// Applied to count queries, with the counted node.
    pub node_count: Option<QueryFilter>,
    /// Applied to relationship-discovery queries, with the expanded node.
    pub node_relation: Option<QueryFilter>,
}

impl QueryFilters {
    fn merged_over(&self, fallback: &QueryFilters) -> QueryFilters {
        QueryFilters {
            result: self.result.clone().or_else(|| fallback.result.clone()),
            node_value: self
                .node_value
                .clone()
                .or_else(|| fallback.node_value.clone()),
            node_count: self
                .node_count
                .clone()
                .or_else(|| fallback.node_count.clone()),
            node_relation: self
                .node_relation
                .clone()
                .or_else(|| fallback.node_relation.clone()),
        }
    }
}

impl fmt::Debug for QueryFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryFilters")
            .field("result", &self.result.is_some())
            .field("node_value", &self.node_value.is_some())
            .field("node_count", &self.node_count.is_some())
            .field("node_relation", &self.node_relation.is_some())
            .finish()
    }
}

/// Partial metadata declared for one label.
///
/// Unset fields are inherited from `parent`, then from the default provider.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelProvider {
    /// Label this provider inherits from.
    pub parent: Option<String>,
    /// Labels that inherit from this provider unless declared otherwise.
    pub children: Vec<String>,
    /// Attributes returned for nodes of this label.
    pub return_attributes: Option<Vec<Attribute>>,
    /// Attribute used to constrain nodes of this label to a chosen value.
    pub constraint_attribute: Option<Attribute>,
    /// Predicates added to every query, with `$identifier` standing for the
    /// node variable.
    pub predefined_constraints: Option<Vec<String>>,
    /// Ordering key of value-listing queries. An empty string disables it.
    pub value_order_by: Option<String>,
    /// Value ordering direction.
    pub value_order_ascending: Option<bool>,
    /// Ordering key of result queries. An empty string disables it.
    pub result_order_by: Option<String>,
    /// Result ordering direction.
    pub result_order_ascending: Option<bool>,
    /// Label may be used as query root and listed in the taxonomy.
    pub searchable: Option<bool>,
    /// Relationships are loaded as soon as a node of this label is shown.
    pub auto_expand_relations: Option<bool>,
    /// Nodes of this label are created as group nodes.
    pub group: Option<bool>,
    /// Query filter hooks.
    #[serde(skip)]
    pub filters: QueryFilters,
}

impl LabelProvider {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in default provider: everything keyed on the internal id.
    pub fn builtin_default() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            return_attributes: Some(vec![Attribute::InternalId]),
            constraint_attribute: Some(Attribute::InternalId),
            predefined_constraints: Some(Vec::new()),
            value_order_by: Some("count".to_owned()),
            value_order_ascending: Some(false),
            result_order_by: Some(String::new()),
            result_order_ascending: Some(true),
            searchable: Some(true),
            auto_expand_relations: Some(false),
            group: Some(false),
            filters: QueryFilters::default(),
        }
    }

    /// Sets the parent label.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declares child labels.
    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the returned attributes.
    pub fn with_return_attributes<I, A>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        self.return_attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the constraint attribute.
    pub fn with_constraint_attribute(mut self, attribute: impl Into<Attribute>) -> Self {
        self.constraint_attribute = Some(attribute.into());
        self
    }

    /// Sets the predefined constraint templates.
    pub fn with_predefined_constraints<I, S>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predefined_constraints = Some(constraints.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the value ordering.
    pub fn with_value_order(mut self, attribute: impl Into<String>, ascending: bool) -> Self {
        self.value_order_by = Some(attribute.into());
        self.value_order_ascending = Some(ascending);
        self
    }

    /// Sets the result ordering.
    pub fn with_result_order(mut self, attribute: impl Into<String>, ascending: bool) -> Self {
        self.result_order_by = Some(attribute.into());
        self.result_order_ascending = Some(ascending);
        self
    }

    /// Marks nodes of this label as group nodes.
    pub fn with_group(mut self, group: bool) -> Self {
        self.group = Some(group);
        self
    }

    /// Sets the searchable flag.
    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = Some(searchable);
        self
    }

    /// Installs the query filter hooks.
    pub fn with_filters(mut self, filters: QueryFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Copies every field set in `self`, keeping `base` for the rest.
    pub(crate) fn overlay(&self, base: &LabelProvider) -> LabelProvider {
        LabelProvider {
            parent: self.parent.clone().or_else(|| base.parent.clone()),
            children: if self.children.is_empty() {
                base.children.clone()
            } else {
                self.children.clone()
            },
            return_attributes: self
                .return_attributes
                .clone()
                .or_else(|| base.return_attributes.clone()),
            constraint_attribute: self
                .constraint_attribute
                .clone()
                .or_else(|| base.constraint_attribute.clone()),
            predefined_constraints: self
                .predefined_constraints
                .clone()
                .or_else(|| base.predefined_constraints.clone()),
            value_order_by: self
                .value_order_by
                .clone()
                .or_else(|| base.value_order_by.clone()),
            value_order_ascending: self.value_order_ascending.or(base.value_order_ascending),
            result_order_by: self
                .result_order_by
                .clone()
                .or_else(|| base.result_order_by.clone()),
            result_order_ascending: self.result_order_ascending.or(base.result_order_ascending),
            searchable: self.searchable.or(base.searchable),
            auto_expand_relations: self.auto_expand_relations.or(base.auto_expand_relations),
            group: self.group.or(base.group),
            filters: self.filters.merged_over(&base.filters),
        }
    }
}

/// Read-only view of label metadata used by the query compiler.
pub trait LabelMetadata {
    /// Attribute used to constrain nodes of `label`.
    fn constraint_attribute(&self, label: &str) -> Attribute;
    /// Predicate templates applied to every node of `label`.
    fn predefined_constraints(&self, label: &str) -> Vec<String>;
    /// Deduplicated attributes returned for `label`, never empty.
    fn return_attributes(&self, label: &str) -> Vec<Attribute>;
    /// Ordering key of value-listing queries.
    fn value_order_by(&self, label: &str) -> Option<String>;
    /// Value ordering direction.
    fn is_value_order_ascending(&self, label: &str) -> bool;
    /// Ordering key of result queries.
    fn result_order_by(&self, label: &str) -> Option<String>;
    /// Result ordering direction.
    fn is_result_order_ascending(&self, label: &str) -> bool;
    /// Nodes of `label` are created as group nodes.
    fn is_group(&self, label: &str) -> bool;
    /// Relationships of `label` nodes are expanded as soon as they appear.
    fn auto_expand_relations(&self, _label: &str) -> bool {
        false
    }
    /// Rewrites a result query; `root` is the root node.
    fn filter_result_query(&self, root: &Node, query: QueryStructure) -> QueryStructure;
    /// Rewrites a value-listing query for `node`.
    fn filter_node_value_query(&self, node: &Node, query: QueryStructure) -> QueryStructure;
    /// Rewrites a count query for `node`.
    fn filter_node_count_query(&self, node: &Node, query: QueryStructure) -> QueryStructure;
    /// Rewrites a relationship-discovery query for `node`.
    fn filter_node_relation_query(&self, node: &Node, query: QueryStructure) -> QueryStructure;
    /// Decides whether a discovered relationship is kept.
    fn accept_relation(&self, _relation: &RelationshipInfo) -> bool {
        true
    }
}
