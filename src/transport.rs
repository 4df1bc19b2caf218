//! Wire payloads of the transactional endpoint and the executor seam.
//!
//! The crate never talks to a database itself. Callers plug an executor in
//! through [`Transport`]; the session only builds requests and folds
//! responses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::{Parameters, Statement};
use crate::value::{PropertyValue, Row};

/// Requested result formats of a statement.
pub const ROW_CONTENTS: &str = "row";
/// Graph result format, used by graph-result statements.
pub const GRAPH_CONTENTS: &str = "graph";

/// One statement of a transactional request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRequest {
    /// Statement text.
    pub statement: String,
    /// Parameter bindings.
    #[serde(default)]
    pub parameters: Parameters,
    /// Result formats requested for this statement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result_data_contents: Vec<String>,
}

impl StatementRequest {
    /// Requests plain rows.
    pub fn rows(statement: Statement) -> Self {
        Self::with_contents(statement, &[ROW_CONTENTS])
    }

    /// Requests the given result formats.
    pub fn with_contents(statement: Statement, contents: &[&str]) -> Self {
        Self {
            statement: statement.statement,
            parameters: statement.parameters,
            result_data_contents: contents.iter().map(|c| (*c).to_owned()).collect(),
        }
    }
}

/// `{"statements": [...]}`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Statements executed in order.
    pub statements: Vec<StatementRequest>,
}

impl TransactionRequest {
    /// Wraps a single statement.
    pub fn single(statement: StatementRequest) -> Self {
        Self {
            statements: vec![statement],
        }
    }
}

/// One data entry of a statement result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    /// Values in column order.
    #[serde(default)]
    pub row: Vec<PropertyValue>,
    /// Graph form of the row, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<serde_json::Value>,
}

/// Result of one statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    /// Column names, the `RETURN` aliases.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Data entries.
    #[serde(default)]
    pub data: Vec<DataEntry>,
}

impl StatementResult {
    /// Rows keyed by column name. Missing trailing values read as null.
    pub fn rows(&self) -> Vec<Row> {
        self.data
            .iter()
            .map(|entry| {
                self.columns
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| {
                        let value = entry.row.get(idx).cloned().unwrap_or(PropertyValue::Null);
                        (column.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Error reported by the database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Status code.
    #[serde(default)]
    pub code: String,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

/// `{"results": [...], "errors": [...]}`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// One result per statement, in request order.
    #[serde(default)]
    pub results: Vec<StatementResult>,
    /// Errors raised while executing the statements.
    #[serde(default)]
    pub errors: Vec<ServerError>,
}

impl TransactionResponse {
    /// Turns a response carrying server errors into a [`TransportError`].
    pub fn into_result(self) -> Result<Self, TransportError> {
        match self.errors.first() {
            Some(err) => Err(TransportError::Server {
                code: err.code.clone(),
                message: err.message.clone(),
            }),
            None => Ok(self),
        }
    }
}

/// Failure of a transport call.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),
    /// The database rejected a statement.
    #[error("{code}: {message}")]
    Server {
        /// Status code.
        code: String,
        /// Message.
        message: String,
    },
    /// The response does not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(value: serde_json::Error) -> Self {
        TransportError::Malformed(value.to_string())
    }
}

/// Executes transactional requests.
pub trait Transport {
    /// Posts `request` and returns the decoded response.
    fn post(&self, request: &TransactionRequest) -> Result<TransactionResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, request: &TransactionRequest) -> Result<TransactionResponse, TransportError> {
        (**self).post(request)
    }
}
