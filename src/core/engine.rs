//! Execution engine contract
//!
//! The engine is the black box that validates and executes one operation
//! against a schema. The runner only prepares its parameters and interprets
//! its outcome.

use super::options::{FieldResolver, LogFunction, ResponseFormatter, ValidationRule};
use super::request::QueryInput;
use super::response::ExecutionResult;
use super::ErrorFormatter;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Context value threaded through execution
///
/// Cloned once per operation of a batch, so siblings never observe each
/// other's changes.
pub trait ExecutionContext: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> ExecutionContext for T {}

/// Parameters handed to the engine for one operation
pub struct ExecutionParams<C> {
    pub query: QueryInput,
    pub variables: Option<Map<String, Value>>,
    pub context: C,
    pub root_value: Value,
    pub operation_name: Option<String>,
    pub log_function: Option<LogFunction>,
    pub validation_rules: Vec<ValidationRule>,
    pub format_error: Arc<dyn ErrorFormatter>,
    pub format_response: Option<ResponseFormatter>,
    pub field_resolver: Option<FieldResolver>,
    pub debug: bool,
    pub tracing: bool,
    pub cache_control: bool,
}

/// Executes a single GraphQL operation
///
/// An `Err` is an engine-local failure: the runner formats it into the
/// operation's `errors`. Returning an [`HttpQueryError`](super::HttpQueryError)
/// wrapped in `anyhow` aborts the whole request instead.
#[async_trait]
pub trait ExecutionEngine<C: ExecutionContext>: Send + Sync {
    async fn execute(&self, params: ExecutionParams<C>) -> Result<ExecutionResult>;
}
