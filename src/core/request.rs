//! Request model: what the transport hands to the runner

use super::engine::ExecutionContext;
use super::error::HttpQueryError;
use super::options::OptionsSource;
use anyhow::{Result, anyhow};
use axum::http::Method;
use graphql_parser::query::{Document, parse_query};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A parsed GraphQL document that owns all its text
pub type ParsedDocument = Document<'static, String>;

/// Query of an operation: source text or an already parsed document
#[derive(Debug, Clone)]
pub enum QueryInput {
    /// GraphQL source text
    Text(String),

    /// Preparsed document
    Document(Arc<ParsedDocument>),
}

impl QueryInput {
    /// Parse the query, reusing the document when it is already parsed
    pub fn parse(&self) -> Result<Arc<ParsedDocument>> {
        match self {
            QueryInput::Text(text) => parse_document(text).map(Arc::new),
            QueryInput::Document(document) => Ok(document.clone()),
        }
    }

    /// Whether the query still needs parsing
    pub fn is_text(&self) -> bool {
        matches!(self, QueryInput::Text(_))
    }
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput::Text(text.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        QueryInput::Text(text)
    }
}

impl<'de> Deserialize<'de> for QueryInput {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(QueryInput::Text)
    }
}

/// Parse GraphQL source text into an owned document
pub fn parse_document(text: &str) -> Result<ParsedDocument> {
    let document =
        parse_query::<String>(text).map_err(|e| anyhow!("Syntax Error: {}", e))?;
    Ok(document.into_static())
}

/// Variables as sent by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VariablesInput {
    /// JSON-encoded object (GET query parameters, some POST clients)
    Encoded(String),

    /// Already decoded object
    Map(Map<String, Value>),
}

impl VariablesInput {
    /// Decode into a variables map
    ///
    /// An encoded `null` means no variables. Anything that does not decode
    /// to an object is rejected with a 400.
    pub fn normalize(self) -> std::result::Result<Option<Map<String, Value>>, HttpQueryError> {
        match self {
            VariablesInput::Map(map) => Ok(Some(map)),
            VariablesInput::Encoded(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(Value::Null) => Ok(None),
                _ => Err(HttpQueryError::invalid_variables()),
            },
        }
    }
}

/// One GraphQL operation as received from the transport
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    #[serde(default)]
    pub query: Option<QueryInput>,

    #[serde(default)]
    pub operation_name: Option<String>,

    #[serde(default)]
    pub variables: Option<VariablesInput>,

    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
}

impl RawOperation {
    /// Build an operation from query text
    pub fn new(query: impl Into<QueryInput>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn with_variables(mut self, variables: VariablesInput) -> Self {
        self.variables = Some(variables);
        self
    }

    /// True when no GraphQL parameter was supplied at all
    pub fn is_empty(&self) -> bool {
        self.query.is_none()
            && self.operation_name.is_none()
            && self.variables.is_none()
            && self.extensions.is_none()
    }
}

/// Body of a request: one operation or a batch
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequestPayload {
    Batch(Vec<RawOperation>),
    Single(RawOperation),
}

impl RequestPayload {
    /// Split into operations plus the batch flag
    pub fn into_operations(self) -> (Vec<RawOperation>, bool) {
        match self {
            RequestPayload::Batch(operations) => (operations, true),
            RequestPayload::Single(operation) => (vec![operation], false),
        }
    }

    /// Whether the payload carries nothing to run
    ///
    /// A batch is empty when it has no entries; a single operation when it
    /// has no parameters at all.
    pub fn is_empty(&self) -> bool {
        match self {
            RequestPayload::Batch(operations) => operations.is_empty(),
            RequestPayload::Single(operation) => operation.is_empty(),
        }
    }
}

impl From<RawOperation> for RequestPayload {
    fn from(operation: RawOperation) -> Self {
        RequestPayload::Single(operation)
    }
}

impl From<Vec<RawOperation>> for RequestPayload {
    fn from(operations: Vec<RawOperation>) -> Self {
        RequestPayload::Batch(operations)
    }
}

/// Everything the runner needs for one HTTP request
///
/// `A` is the transport-specific argument type handed to an options
/// factory; `C` is the execution context type.
pub struct HttpQueryRequest<A, C: ExecutionContext> {
    pub method: Method,
    pub query: Option<RequestPayload>,
    pub options: OptionsSource<A, C>,
}
