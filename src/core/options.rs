//! Per-request execution configuration
//!
//! [`QueryOptions`] is the fully resolved configuration of a request.
//! [`OptionsSource`] is where it comes from: a static value, or a factory
//! invoked with the transport arguments of the request. Either way it is
//! resolved once per request, never per operation.

use super::engine::{ExecutionContext, ExecutionEngine, ExecutionParams};
use super::error::HttpQueryError;
use super::request::ParsedDocument;
use super::response::{ExecutionResult, FormattedError};
use crate::config::ExecutionSettings;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Rewrites the parameters right before the engine is invoked
pub type ParamsFormatter<C> = Arc<dyn Fn(ExecutionParams<C>) -> ExecutionParams<C> + Send + Sync>;

/// Rewrites a result produced by the engine
pub type ResponseFormatter = Arc<dyn Fn(ExecutionResult) -> ExecutionResult + Send + Sync>;

/// Resolves `field` on a parent value with the given arguments
pub type FieldResolver = Arc<dyn Fn(&Value, &str, &Map<String, Value>) -> Value + Send + Sync>;

/// Extra document check run before execution
pub type ValidationRule = Arc<dyn Fn(&ParsedDocument) -> Vec<anyhow::Error> + Send + Sync>;

/// Receives GraphQL lifecycle events
pub type LogFunction = Arc<dyn Fn(&LogMessage) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    Request,
    Parse,
    Validation,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStep {
    Start,
    End,
    Status,
}

/// Lifecycle event passed to a [`LogFunction`]
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub action: LogAction,
    pub step: LogStep,
    pub key: Option<String>,
    pub data: Option<Value>,
}

impl LogMessage {
    pub fn new(action: LogAction, step: LogStep) -> Self {
        Self {
            action,
            step,
            key: None,
            data: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Maps an internal failure into its wire representation
pub trait ErrorFormatter: Send + Sync {
    fn format_error(&self, error: &anyhow::Error) -> FormattedError;
}

impl<F> ErrorFormatter for F
where
    F: Fn(&anyhow::Error) -> FormattedError + Send + Sync,
{
    fn format_error(&self, error: &anyhow::Error) -> FormattedError {
        self(error)
    }
}

/// Formatter used when none is configured
///
/// Outside debug mode only the message leaves the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorFormatter {
    pub debug: bool,
}

impl ErrorFormatter for DefaultErrorFormatter {
    fn format_error(&self, error: &anyhow::Error) -> FormattedError {
        let mut formatted = FormattedError::new(error.to_string());
        if self.debug {
            let stacktrace: Vec<String> = error.chain().map(|cause| cause.to_string()).collect();
            let mut extensions = Map::new();
            extensions.insert("exception".to_string(), json!({ "stacktrace": stacktrace }));
            formatted.extensions = Some(extensions);
        }
        formatted
    }
}

/// Resolved execution configuration of one request
pub struct QueryOptions<C: ExecutionContext> {
    /// Schema-bound executor
    pub engine: Arc<dyn ExecutionEngine<C>>,

    /// Context shared by the operations of the request
    pub context: C,

    pub root_value: Value,
    pub format_error: Option<Arc<dyn ErrorFormatter>>,
    pub format_params: Option<ParamsFormatter<C>>,
    pub format_response: Option<ResponseFormatter>,
    pub field_resolver: Option<FieldResolver>,
    pub validation_rules: Vec<ValidationRule>,
    pub log_function: Option<LogFunction>,
    pub debug: bool,
    pub tracing: bool,
    pub cache_control: bool,
}

impl<C: ExecutionContext> Clone for QueryOptions<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            context: self.context.clone(),
            root_value: self.root_value.clone(),
            format_error: self.format_error.clone(),
            format_params: self.format_params.clone(),
            format_response: self.format_response.clone(),
            field_resolver: self.field_resolver.clone(),
            validation_rules: self.validation_rules.clone(),
            log_function: self.log_function.clone(),
            debug: self.debug,
            tracing: self.tracing,
            cache_control: self.cache_control,
        }
    }
}

impl<C: ExecutionContext> QueryOptions<C> {
    /// Options with every hook unset
    pub fn new(engine: Arc<dyn ExecutionEngine<C>>, context: C) -> Self {
        Self {
            engine,
            context,
            root_value: Value::Null,
            format_error: None,
            format_params: None,
            format_response: None,
            field_resolver: None,
            validation_rules: Vec::new(),
            log_function: None,
            debug: false,
            tracing: false,
            cache_control: false,
        }
    }

    pub fn with_root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }

    pub fn with_error_formatter(mut self, formatter: impl ErrorFormatter + 'static) -> Self {
        self.format_error = Some(Arc::new(formatter));
        self
    }

    pub fn with_params_formatter(
        mut self,
        formatter: impl Fn(ExecutionParams<C>) -> ExecutionParams<C> + Send + Sync + 'static,
    ) -> Self {
        self.format_params = Some(Arc::new(formatter));
        self
    }

    pub fn with_response_formatter(
        mut self,
        formatter: impl Fn(ExecutionResult) -> ExecutionResult + Send + Sync + 'static,
    ) -> Self {
        self.format_response = Some(Arc::new(formatter));
        self
    }

    pub fn with_field_resolver(
        mut self,
        resolver: impl Fn(&Value, &str, &Map<String, Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.field_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_validation_rule(
        mut self,
        rule: impl Fn(&ParsedDocument) -> Vec<anyhow::Error> + Send + Sync + 'static,
    ) -> Self {
        self.validation_rules.push(Arc::new(rule));
        self
    }

    pub fn with_log_function(mut self, log: impl Fn(&LogMessage) + Send + Sync + 'static) -> Self {
        self.log_function = Some(Arc::new(log));
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Copy the flags of a loaded configuration
    pub fn apply_settings(&mut self, settings: &ExecutionSettings) {
        self.debug = settings.debug;
        self.tracing = settings.tracing;
        self.cache_control = settings.cache_control;
    }

    /// The formatter every error of this request goes through
    pub fn error_formatter(&self) -> Arc<dyn ErrorFormatter> {
        match &self.format_error {
            Some(formatter) => formatter.clone(),
            None => Arc::new(DefaultErrorFormatter { debug: self.debug }),
        }
    }
}

/// Builds [`QueryOptions`] from the transport arguments of a request
#[async_trait]
pub trait OptionsFactory<A, C: ExecutionContext>: Send + Sync {
    async fn create(&self, args: &A) -> Result<QueryOptions<C>>;
}

/// Where the options of a request come from
pub enum OptionsSource<A, C: ExecutionContext> {
    Static(QueryOptions<C>),
    Factory(Arc<dyn OptionsFactory<A, C>>),
}

impl<A, C: ExecutionContext> Clone for OptionsSource<A, C> {
    fn clone(&self) -> Self {
        match self {
            OptionsSource::Static(options) => OptionsSource::Static(options.clone()),
            OptionsSource::Factory(factory) => OptionsSource::Factory(factory.clone()),
        }
    }
}

impl<A, C: ExecutionContext> From<QueryOptions<C>> for OptionsSource<A, C> {
    fn from(options: QueryOptions<C>) -> Self {
        OptionsSource::Static(options)
    }
}

impl<A: Sync, C: ExecutionContext> OptionsSource<A, C> {
    pub fn factory(factory: impl OptionsFactory<A, C> + 'static) -> Self {
        OptionsSource::Factory(Arc::new(factory))
    }

    /// Resolve the options for one request
    ///
    /// A factory failure becomes a 500 carrying the factory's message.
    pub async fn resolve(&self, args: &A) -> Result<QueryOptions<C>, HttpQueryError> {
        match self {
            OptionsSource::Static(options) => Ok(options.clone()),
            OptionsSource::Factory(factory) => factory
                .create(args)
                .await
                .map_err(|e| HttpQueryError::internal(e.to_string())),
        }
    }
}
