//! Structured fragments of a generated statement.
//!
//! Builders assemble these values; turning them into text is left to the
//! `Display` impls in the render module so structure can be inspected and
//! tested without string matching.

use crate::query::Parameters;

/// Query variable bound to a node or relationship.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(pub String);

impl Var {
    /// Creates a variable from any string-like name.
    pub fn new(name: impl Into<String>) -> Self {
        Var(name.into())
    }

    /// Variable name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Direction selector for relationship patterns.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EdgeDirection {
    /// `-[..]->`
    #[default]
    Out,
    /// `-[..]-`
    Both,
}

impl EdgeDirection {
    /// Picks the direction matching the `use_relation_direction` option.
    pub fn from_directed(directed: bool) -> Self {
        if directed {
            EdgeDirection::Out
        } else {
            EdgeDirection::Both
        }
    }
}

/// Inline property constraint `{`attr`:{`param`}}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyConstraint {
    /// Constrained property.
    pub attribute: String,
    /// Name of the parameter holding the value.
    pub parameter: String,
}

/// Node pattern `(var:`Label`)`, optionally constrained.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodePattern {
    /// Node variable.
    pub var: Var,
    /// Node label, omitted for anonymous far ends.
    pub label: Option<String>,
    /// Inline constraint.
    pub constraint: Option<PropertyConstraint>,
}

impl NodePattern {
    /// Labeled, unconstrained pattern.
    pub fn labeled(var: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            var: Var::new(var),
            label: Some(label.into()),
            constraint: None,
        }
    }

    /// Pattern with a variable only, such as `(x)`.
    pub fn anonymous(var: impl Into<String>) -> Self {
        Self {
            var: Var::new(var),
            label: None,
            constraint: None,
        }
    }

    /// Adds an inline property constraint.
    pub fn constrained(mut self, attribute: impl Into<String>, parameter: impl Into<String>) -> Self {
        self.constraint = Some(PropertyConstraint {
            attribute: attribute.into(),
            parameter: parameter.into(),
        });
        self
    }
}

/// Relationship pattern `-[var:`TYPE`]->`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelPattern {
    /// Relationship variable.
    pub var: Var,
    /// Relationship type, omitted to match any type.
    pub rel_type: Option<String>,
    /// Arrow shape.
    pub direction: EdgeDirection,
}

/// One comma-separated element of the `MATCH` clause.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MatchElement {
    /// A single node.
    Node(NodePattern),
    /// `source-[rel]->target`.
    Path {
        /// Source node.
        source: NodePattern,
        /// Relationship.
        rel: RelPattern,
        /// Target node.
        target: NodePattern,
    },
}

/// One `AND`-joined predicate of the `WHERE` clause.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `ID(var) = id`; a value without identity renders as `null`.
    InternalId {
        /// Constrained node.
        var: Var,
        /// Database identity of the bound value.
        id: Option<i64>,
    },
    /// Predefined constraint with its placeholder already substituted.
    Raw(String),
}

/// Value a projection reads.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    /// `var.attribute`
    Property {
        /// Node variable.
        var: Var,
        /// Property name.
        attribute: String,
    },
    /// `ID(var)`
    Identity(Var),
}

/// One element of the `RETURN` clause.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Projection {
    /// `operand AS alias`
    Field {
        /// Projected value.
        operand: Operand,
        /// Column name.
        alias: String,
    },
    /// `COLLECT(DISTINCT operand) AS alias`
    Collect {
        /// Collected value.
        operand: Operand,
        /// Column name.
        alias: String,
    },
    /// `count(DISTINCT operand) AS alias`
    CountDistinct {
        /// Counted value.
        operand: Operand,
        /// Column name.
        alias: String,
    },
    /// A bare variable.
    Variable(Var),
    /// `expr AS alias` for expressions with no structured form.
    Expr {
        /// Expression text.
        expr: String,
        /// Column name.
        alias: String,
    },
}

/// Clause following `RETURN`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EndElement {
    /// `ORDER BY key ASC|DESC`
    OrderBy {
        /// Ordering expression.
        key: String,
        /// Direction.
        ascending: bool,
    },
    /// `LIMIT n`
    Limit(usize),
}

/// A whole statement before serialization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CypherQuery {
    /// `MATCH` elements.
    pub matches: Vec<MatchElement>,
    /// `WHERE` predicates.
    pub predicates: Vec<Predicate>,
    /// `RETURN DISTINCT` instead of `RETURN`.
    pub distinct: bool,
    /// `RETURN` elements.
    pub projections: Vec<Projection>,
    /// Ordering and limit.
    pub end: Vec<EndElement>,
    /// Parameter bindings.
    pub parameters: Parameters,
}
