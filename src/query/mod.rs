#![forbid(unsafe_code)]

//! Compilation of the query graph into parameterized Cypher statements.
//!
//! Data flows one way: the relevance selector picks the links a statement
//! must match, the element compiler turns them into match and where fragments
//! plus parameters, and the builders add the return, ordering and limit tail
//! of each statement shape.

/// Structured statement fragments.
pub mod ast;

/// Statement builders.
pub mod builder;

/// Match/where compilation of a link set.
pub mod elements;

/// Builder options and their defaults.
pub mod options;

/// Link selection.
pub mod relevance;

mod render;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use builder::{taxonomy_count_query, QueryBuilder};
pub use elements::{QueryCompiler, QueryElements};
pub use options::QueryOptions;
pub use relevance::{links_to_root, relevant_links};

use crate::value::PropertyValue;

/// Parameter bindings of one statement, ordered by name.
pub type Parameters = BTreeMap<String, PropertyValue>;

/// Rendered statement together with the fragments it was assembled from.
///
/// This is what filter hooks receive and return. A hook that edits the
/// fragments calls [`QueryStructure::rebuild`] to regenerate `statement`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStructure {
    /// Full statement text.
    pub statement: String,
    /// `MATCH` elements.
    pub match_elements: Vec<String>,
    /// `WHERE` predicates.
    pub where_elements: Vec<String>,
    /// `RETURN` elements.
    pub return_elements: Vec<String>,
    /// Ordering and limit clauses.
    pub end_elements: Vec<String>,
    /// Parameter bindings.
    pub parameters: Parameters,
    /// `RETURN DISTINCT` instead of `RETURN`.
    pub distinct: bool,
}

impl QueryStructure {
    /// Regenerates `statement` from the fragments.
    pub fn rebuild(&mut self) {
        self.statement = render::assemble(
            &self.match_elements,
            &self.where_elements,
            &self.return_elements,
            &self.end_elements,
            self.distinct,
        );
    }

    /// Drops the fragments, keeping what is sent to the database.
    pub fn into_statement(self) -> Statement {
        Statement {
            statement: self.statement,
            parameters: self.parameters,
        }
    }
}

/// A statement and its parameters, as posted to the database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement text.
    pub statement: String,
    /// Parameter bindings.
    pub parameters: Parameters,
}

impl From<QueryStructure> for Statement {
    fn from(value: QueryStructure) -> Self {
        value.into_statement()
    }
}
