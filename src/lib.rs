//! Compiler from a visual graph pattern to parameterized Cypher statements.
//!
//! The [`graph`] module holds the query under construction, the [`provider`]
//! module the per-label metadata, and the [`query`] module turns both into
//! statements. [`session`] tracks the requests issued for a graph and folds
//! their responses back into it; executing them is left to a
//! [`transport::Transport`] supplied by the caller.

#![warn(missing_docs)]

pub mod config;
pub mod graph;
pub mod provider;
pub mod query;
pub mod session;
pub mod transport;
pub mod types;
pub mod value;

pub use config::{ConfigError, PatternConfig};
pub use graph::{GraphSchema, Link, LinkType, Node, NodeType, QueryGraph};
pub use provider::{Attribute, LabelMetadata, LabelProvider, ProviderRegistry};
pub use query::{QueryBuilder, QueryOptions, QueryStructure, Statement};
pub use session::QuerySession;
pub use types::{LinkId, NodeId, QueryGraphError, Result};
pub use value::{PropertyValue, Row};
