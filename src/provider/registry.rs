use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{Attribute, LabelMetadata, LabelProvider, QueryFilters, RelationFilter};
use crate::graph::{Node, RelationshipInfo};
use crate::query::QueryStructure;

/// Fully resolved metadata of one label.
#[derive(Clone, Debug)]
pub struct ResolvedProvider {
    /// Label the record was resolved for.
    pub label: String,
    /// Parent label, when the label inherits from one.
    pub parent: Option<String>,
    /// Attribute used to constrain nodes to a chosen value.
    pub constraint_attribute: Attribute,
    /// Deduplicated returned attributes, never empty.
    pub return_attributes: Vec<Attribute>,
    /// Predicate templates with `$identifier` placeholders.
    pub predefined_constraints: Vec<String>,
    /// Ordering key of value-listing queries.
    pub value_order_by: Option<String>,
    /// Value ordering direction.
    pub value_order_ascending: bool,
    /// Ordering key of result queries.
    pub result_order_by: Option<String>,
    /// Result ordering direction.
    pub result_order_ascending: bool,
    /// Label may be used as query root.
    pub searchable: bool,
    /// Relationships are loaded eagerly.
    pub auto_expand_relations: bool,
    /// Nodes are created as group nodes.
    pub group: bool,
    /// Query filter hooks.
    pub filters: QueryFilters,
}

/// Collects provider declarations before freezing them into a registry.
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: HashMap<String, LabelProvider>,
    default: Option<LabelProvider>,
    relation_filter: Option<RelationFilter>,
}

impl ProviderRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the provider of `label`, replacing any earlier declaration.
    pub fn with_provider(mut self, label: impl Into<String>, provider: LabelProvider) -> Self {
        self.providers.insert(label.into(), provider);
        self
    }

    /// Overrides fields of the built-in default provider.
    pub fn with_default(mut self, overrides: LabelProvider) -> Self {
        self.default = Some(overrides);
        self
    }

    /// Installs a predicate applied to discovered relationships.
    pub fn with_relation_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&RelationshipInfo) -> bool + Send + Sync + 'static,
    {
        self.relation_filter = Some(Arc::new(filter));
        self
    }

    /// Freezes the declarations.
    ///
    /// Labels listed as `children` get a record inheriting from the declaring
    /// label; an already registered child without parent is attached to it.
    pub fn build(self) -> ProviderRegistry {
        let builtin = LabelProvider::builtin_default();
        let default = match self.default {
            Some(overrides) => overrides.overlay(&builtin),
            None => builtin,
        };

        let mut providers = self.providers;
        let mut declared: Vec<(String, Vec<String>)> = providers
            .iter()
            .filter(|(_, p)| !p.children.is_empty())
            .map(|(label, p)| (label.clone(), p.children.clone()))
            .collect();
        declared.sort();

        for (parent, children) in declared {
            for child in children {
                if child == parent {
                    continue;
                }
                match providers.get_mut(&child) {
                    Some(existing) => {
                        if existing.parent.is_none() {
                            existing.parent = Some(parent.clone());
                        }
                    }
                    None => {
                        debug!(%child, %parent, "provider.children.inherit");
                        providers.insert(child, LabelProvider::new().with_parent(parent.clone()));
                    }
                }
            }
        }

        for (label, provider) in &providers {
            if let Some(parent) = &provider.parent {
                if !providers.contains_key(parent) {
                    warn!(%label, %parent, "provider.parent.unknown");
                }
            }
        }

        ProviderRegistry {
            providers,
            default,
            relation_filter: self.relation_filter,
            resolved: Mutex::new(HashMap::new()),
        }
    }
}

/// Immutable label-to-metadata mapping with memoized resolution.
pub struct ProviderRegistry {
    providers: HashMap<String, LabelProvider>,
    default: LabelProvider,
    relation_filter: Option<RelationFilter>,
    resolved: Mutex<HashMap<String, Arc<ResolvedProvider>>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        ProviderRegistryBuilder::new().build()
    }
}

impl ProviderRegistry {
    /// Starts a builder.
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::new()
    }

    /// Registered labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Returns true when `label` has its own (possibly inherited) record.
    pub fn is_registered(&self, label: &str) -> bool {
        self.providers.contains_key(label)
    }

    /// Resolves the metadata of `label`.
    pub fn resolve(&self, label: &str) -> Arc<ResolvedProvider> {
        if let Some(hit) = self.resolved.lock().get(label) {
            return Arc::clone(hit);
        }
        let resolved = Arc::new(self.resolve_uncached(label));
        self.resolved
            .lock()
            .insert(label.to_owned(), Arc::clone(&resolved));
        resolved
    }

    fn resolve_uncached(&self, label: &str) -> ResolvedProvider {
        let chain = self.chain(label);
        if chain.is_empty() {
            debug!(label, "provider.resolve.default");
        } else {
            trace!(label, depth = chain.len(), "provider.resolve.chain");
        }

        let mut merged = LabelProvider::new();
        for provider in &chain {
            merged = merged.overlay(provider);
        }
        let merged = merged.overlay(&self.default);

        let constraint_attribute = merged
            .constraint_attribute
            .clone()
            .unwrap_or(Attribute::InternalId);

        let mut return_attributes: Vec<Attribute> = Vec::new();
        let mut push = |attribute: &Attribute| {
            if !return_attributes.contains(attribute) {
                return_attributes.push(attribute.clone());
            }
        };
        for provider in &chain {
            for attribute in provider.return_attributes.iter().flatten() {
                push(attribute);
            }
        }
        // Unregistered labels take the default as is, internal id included.
        for attribute in self.default.return_attributes.iter().flatten() {
            if chain.is_empty() || !attribute.is_internal_id() {
                push(attribute);
            }
        }
        push(&constraint_attribute);
        if return_attributes.is_empty() {
            return_attributes.push(Attribute::InternalId);
        }

        ResolvedProvider {
            label: label.to_owned(),
            parent: chain.first().and_then(|p| p.parent.clone()),
            constraint_attribute,
            return_attributes,
            predefined_constraints: merged.predefined_constraints.unwrap_or_default(),
            value_order_by: merged.value_order_by.filter(|s| !s.is_empty()),
            value_order_ascending: merged.value_order_ascending.unwrap_or(false),
            result_order_by: merged.result_order_by.filter(|s| !s.is_empty()),
            result_order_ascending: merged.result_order_ascending.unwrap_or(true),
            searchable: merged.searchable.unwrap_or(true),
            auto_expand_relations: merged.auto_expand_relations.unwrap_or(false),
            group: merged.group.unwrap_or(false),
            filters: merged.filters,
        }
    }

    /// Declared providers from `label` up its parent chain.
    fn chain(&self, label: &str) -> Vec<&LabelProvider> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(label);
        while let Some(current) = next {
            if !visited.insert(current) {
                warn!(label, at = current, "provider.parent.cycle");
                break;
            }
            match self.providers.get(current) {
                Some(provider) => {
                    chain.push(provider);
                    next = provider.parent.as_deref();
                }
                None => break,
            }
        }
        chain
    }
}

fn apply(filter: &Option<super::QueryFilter>, node: &Node, query: QueryStructure) -> QueryStructure {
    match filter {
        Some(filter) => filter(node, query),
        None => query,
    }
}

impl LabelMetadata for ProviderRegistry {
    fn constraint_attribute(&self, label: &str) -> Attribute {
        self.resolve(label).constraint_attribute.clone()
    }

    fn predefined_constraints(&self, label: &str) -> Vec<String> {
        self.resolve(label).predefined_constraints.clone()
    }

    fn return_attributes(&self, label: &str) -> Vec<Attribute> {
        self.resolve(label).return_attributes.clone()
    }

    fn value_order_by(&self, label: &str) -> Option<String> {
        self.resolve(label).value_order_by.clone()
    }

    fn is_value_order_ascending(&self, label: &str) -> bool {
        self.resolve(label).value_order_ascending
    }

    fn result_order_by(&self, label: &str) -> Option<String> {
        self.resolve(label).result_order_by.clone()
    }

    fn is_result_order_ascending(&self, label: &str) -> bool {
        self.resolve(label).result_order_ascending
    }

    fn is_group(&self, label: &str) -> bool {
        self.resolve(label).group
    }

    fn auto_expand_relations(&self, label: &str) -> bool {
        self.resolve(label).auto_expand_relations
    }

    fn filter_result_query(&self, root: &Node, query: QueryStructure) -> QueryStructure {
        apply(&self.resolve(&root.label).filters.result, root, query)
    }

    fn filter_node_value_query(&self, node: &Node, query: QueryStructure) -> QueryStructure {
        apply(&self.resolve(&node.label).filters.node_value, node, query)
    }

    fn filter_node_count_query(&self, node: &Node, query: QueryStructure) -> QueryStructure {
        apply(&self.resolve(&node.label).filters.node_count, node, query)
    }

    fn filter_node_relation_query(&self, node: &Node, query: QueryStructure) -> QueryStructure {
        apply(&self.resolve(&node.label).filters.node_relation, node, query)
    }

    fn accept_relation(&self, relation: &RelationshipInfo) -> bool {
        self.relation_filter
            .as_ref()
            .map_or(true, |filter| filter(relation))
    }
}
