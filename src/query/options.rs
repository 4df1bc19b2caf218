use serde::{Deserialize, Serialize};

/// Rows returned by a result query.
pub const RESULTS_PAGE_SIZE: usize = 100;
/// Rows returned by a value-listing query.
pub const VALUE_QUERY_LIMIT: usize = 100;
/// Value nodes shown per page of a listing.
pub const VALUE_PAGE_SIZE: usize = 10;

/// Knobs shared by every query builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryOptions {
    /// `LIMIT` of result queries.
    pub results_page_size: usize,
    /// `LIMIT` of value-listing queries.
    pub value_query_limit: usize,
    /// Value nodes created per listing page.
    pub value_page_size: usize,
    /// Render relationships as `->` rather than `-`.
    pub use_relation_direction: bool,
    /// Report the first label of discovered far ends instead of the last.
    pub use_parent_relation: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            results_page_size: RESULTS_PAGE_SIZE,
            value_query_limit: VALUE_QUERY_LIMIT,
            value_page_size: VALUE_PAGE_SIZE,
            use_relation_direction: true,
            use_parent_relation: false,
        }
    }
}
