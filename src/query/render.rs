use std::fmt;

use super::ast::{
    CypherQuery, EdgeDirection, EndElement, MatchElement, NodePattern, Operand, Predicate,
    Projection, RelPattern, Var,
};
use super::QueryStructure;

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.var)?;
        if let Some(label) = &self.label {
            write!(f, ":`{label}`")?;
        }
        if let Some(c) = &self.constraint {
            write!(f, "{{`{}`:{{`{}`}}}}", c.attribute, c.parameter)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for RelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-[{}", self.var)?;
        if let Some(rel_type) = &self.rel_type {
            write!(f, ":`{rel_type}`")?;
        }
        match self.direction {
            EdgeDirection::Out => f.write_str("]->"),
            EdgeDirection::Both => f.write_str("]-"),
        }
    }
}

impl fmt::Display for MatchElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchElement::Node(node) => node.fmt(f),
            MatchElement::Path {
                source,
                rel,
                target,
            } => write!(f, "{source}{rel}{target}"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::InternalId { var, id: Some(id) } => write!(f, "ID({var}) = {id}"),
            Predicate::InternalId { var, id: None } => write!(f, "ID({var}) = null"),
            Predicate::Raw(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Property { var, attribute } => write!(f, "{var}.{attribute}"),
            Operand::Identity(var) => write!(f, "ID({var})"),
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Field { operand, alias } => write!(f, "{operand} AS {alias}"),
            Projection::Collect { operand, alias } => {
                write!(f, "COLLECT(DISTINCT {operand}) AS {alias}")
            }
            Projection::CountDistinct { operand, alias } => {
                write!(f, "count(DISTINCT {operand}) AS {alias}")
            }
            Projection::Variable(var) => var.fmt(f),
            Projection::Expr { expr, alias } => write!(f, "{expr} AS {alias}"),
        }
    }
}

impl fmt::Display for EndElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndElement::OrderBy { key, ascending } => {
                let order = if *ascending { "ASC" } else { "DESC" };
                write!(f, "ORDER BY {key} {order}")
            }
            EndElement::Limit(limit) => write!(f, "LIMIT {limit}"),
        }
    }
}

fn strings<T: ToString>(items: &[T]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Joins already rendered clause elements into one statement.
///
/// `MATCH a, b[ WHERE p AND q] RETURN[ DISTINCT] x, y[ end]`
pub(crate) fn assemble(
    match_elements: &[String],
    where_elements: &[String],
    return_elements: &[String],
    end_elements: &[String],
    distinct: bool,
) -> String {
    let mut statement = format!("MATCH {}", match_elements.join(", "));
    if !where_elements.is_empty() {
        statement.push_str(" WHERE ");
        statement.push_str(&where_elements.join(" AND "));
    }
    statement.push_str(if distinct {
        " RETURN DISTINCT "
    } else {
        " RETURN "
    });
    statement.push_str(&return_elements.join(", "));
    if !end_elements.is_empty() {
        statement.push(' ');
        statement.push_str(&end_elements.join(" "));
    }
    statement
}

impl CypherQuery {
    /// Serializes every fragment and the full statement.
    pub fn into_structure(self) -> QueryStructure {
        let match_elements = strings(&self.matches);
        let where_elements = strings(&self.predicates);
        let return_elements = strings(&self.projections);
        let end_elements = strings(&self.end);
        let statement = assemble(
            &match_elements,
            &where_elements,
            &return_elements,
            &end_elements,
            self.distinct,
        );
        QueryStructure {
            statement,
            match_elements,
            where_elements,
            return_elements,
            end_elements,
            parameters: self.parameters,
            distinct: self.distinct,
        }
    }
}

impl fmt::Display for CypherQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&assemble(
            &strings(&self.matches),
            &strings(&self.predicates),
            &strings(&self.projections),
            &strings(&self.end),
            self.distinct,
        ))
    }
}
