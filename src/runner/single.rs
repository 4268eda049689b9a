//! Execution of one operation of a request

use crate::core::{
    ErrorFormatter, ExecutionContext, ExecutionFailure, ExecutionParams, ExecutionResult,
    HttpQueryError, LogAction, LogMessage, LogStep, OperationKind, QueryInput, QueryOptions,
    RawOperation, classify,
};
use anyhow::anyhow;
use std::sync::Arc;

/// Give every operation its own context
///
/// Batched operations get a clone of the base context each, all made before
/// any of them runs. A lone operation runs against the base context itself.
pub(crate) fn establish_contexts<C: ExecutionContext>(
    base: C,
    count: usize,
    is_batch: bool,
) -> Vec<C> {
    if !is_batch {
        return vec![base];
    }
    (0..count).map(|_| base.clone()).collect()
}

/// Execute one operation
///
/// Only an [`HttpQueryError`] escapes: it aborts the whole request. Every
/// other failure is formatted into the `errors` of the returned result.
pub(crate) async fn execute_operation<C: ExecutionContext>(
    operation: RawOperation,
    is_get_request: bool,
    context: C,
    options: &QueryOptions<C>,
    formatter: &Arc<dyn ErrorFormatter>,
) -> Result<ExecutionResult, HttpQueryError> {
    let log = options.log_function.clone();
    if let Some(log) = &log {
        let mut message = LogMessage::new(LogAction::Request, LogStep::Start);
        if let Some(QueryInput::Text(text)) = &operation.query {
            message = message.with_key("query").with_data(text.clone().into());
        }
        log(&message);
    }

    let result = match try_execute(operation, is_get_request, context, options, formatter).await {
        Ok(result) => result,
        Err(ExecutionFailure::Http(err)) => return Err(err),
        Err(ExecutionFailure::Engine(err)) => {
            tracing::debug!(error = %err, "operation failed before producing a result");
            ExecutionResult::from_errors(vec![formatter.format_error(&err)])
        }
    };

    if let Some(log) = &log {
        log(&LogMessage::new(LogAction::Request, LogStep::End));
    }

    Ok(result)
}

async fn try_execute<C: ExecutionContext>(
    operation: RawOperation,
    is_get_request: bool,
    context: C,
    options: &QueryOptions<C>,
    formatter: &Arc<dyn ErrorFormatter>,
) -> Result<ExecutionResult, ExecutionFailure> {
    let RawOperation {
        query,
        operation_name,
        variables,
        ..
    } = operation;

    let mut query = query.ok_or_else(|| anyhow!("Must provide query string."))?;

    if is_get_request {
        let document = query.parse()?;
        let kind = classify(&document, operation_name.as_deref()).map_err(HttpQueryError::from)?;
        if kind != OperationKind::Query {
            return Err(HttpQueryError::get_non_query().into());
        }
        query = QueryInput::Document(document);
    }

    let variables = match variables {
        Some(variables) => variables.normalize()?,
        None => None,
    };

    let mut params = ExecutionParams {
        query,
        variables,
        context,
        root_value: options.root_value.clone(),
        operation_name,
        log_function: options.log_function.clone(),
        validation_rules: options.validation_rules.clone(),
        format_error: formatter.clone(),
        format_response: options.format_response.clone(),
        field_resolver: options.field_resolver.clone(),
        debug: options.debug,
        tracing: options.tracing,
        cache_control: options.cache_control,
    };

    if let Some(format_params) = &options.format_params {
        params = format_params(params);
    }

    Ok(options.engine.execute(params).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionEngine, VariablesInput};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes its variables back and counts invocations
    struct EchoEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExecutionEngine<()> for EchoEngine {
        async fn execute(&self, params: ExecutionParams<()>) -> anyhow::Result<ExecutionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExecutionResult::from_data(json!({
                "variables": params.variables.map(Value::Object),
                "operationName": params.operation_name,
            })))
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl ExecutionEngine<()> for FailingEngine {
        async fn execute(&self, _params: ExecutionParams<()>) -> anyhow::Result<ExecutionResult> {
            Err(anyhow!("engine exploded"))
        }
    }

    fn echo_options() -> (Arc<EchoEngine>, QueryOptions<()>) {
        let engine = Arc::new(EchoEngine {
            calls: AtomicUsize::new(0),
        });
        (engine.clone(), QueryOptions::new(engine, ()))
    }

    async fn run(
        operation: RawOperation,
        is_get: bool,
        options: &QueryOptions<()>,
    ) -> Result<ExecutionResult, HttpQueryError> {
        let formatter = options.error_formatter();
        execute_operation(operation, is_get, (), options, &formatter).await
    }

    #[test]
    fn test_contexts_cloned_per_batched_operation() {
        assert_eq!(establish_contexts(7u8, 3, true), vec![7, 7, 7]);
        assert_eq!(establish_contexts(7u8, 1, false), vec![7]);
    }

    #[tokio::test]
    async fn test_encoded_variables_reach_engine() {
        let (_, options) = echo_options();
        let operation = RawOperation::new("{ a }")
            .with_variables(VariablesInput::Encoded(r#"{"x": 1}"#.into()));

        let result = run(operation, false, &options).await.unwrap();
        assert_eq!(result.data.unwrap()["variables"], json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_malformed_variables_abort_with_400() {
        let (engine, options) = echo_options();
        let operation =
            RawOperation::new("{ a }").with_variables(VariablesInput::Encoded("{oops".into()));

        let err = run(operation, false, &options).await.unwrap_err();
        assert_eq!(err.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_mutation_is_rejected_without_reaching_engine() {
        let (engine, options) = echo_options();
        let err = run(RawOperation::new("mutation { a }"), true, &options)
            .await
            .unwrap_err();

        assert_eq!(err.status_code, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.headers.get("allow").unwrap(), "POST");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_subscription_is_rejected() {
        let (_, options) = echo_options();
        let err = run(RawOperation::new("subscription { a }"), true, &options)
            .await
            .unwrap_err();
        assert_eq!(err.status_code, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_post_mutation_reaches_engine() {
        let (engine, options) = echo_options();
        let result = run(RawOperation::new("mutation { a }"), false, &options).await;
        assert!(result.is_ok());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_parse_error_stays_in_result() {
        let (_, options) = echo_options();
        let result = run(RawOperation::new("{ broken"), true, &options).await.unwrap();
        let errors = result.errors.unwrap();
        assert!(errors[0].message.starts_with("Syntax Error"));
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_operation_name_is_500() {
        let (_, options) = echo_options();
        let operation = RawOperation::new("query A { a }").with_operation_name("B");
        let err = run(operation, true, &options).await.unwrap_err();
        assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_query_becomes_result_error() {
        let (_, options) = echo_options();
        let result = run(RawOperation::default(), false, &options).await.unwrap();
        assert_eq!(result.errors.unwrap()[0].message, "Must provide query string.");
    }

    #[tokio::test]
    async fn test_engine_failure_goes_through_formatter() {
        let options = QueryOptions::new(Arc::new(FailingEngine), ()).with_error_formatter(
            |error: &anyhow::Error| crate::core::FormattedError::new(format!("formatted: {error}")),
        );
        let result = run(RawOperation::new("{ a }"), false, &options).await.unwrap();
        assert_eq!(result.errors.unwrap()[0].message, "formatted: engine exploded");
    }

    #[tokio::test]
    async fn test_params_formatter_rewrites_before_invocation() {
        let (_, options) = echo_options();
        let options = options.with_params_formatter(|mut params| {
            params.operation_name = Some("Rewritten".into());
            params
        });
        let result = run(RawOperation::new("{ a }"), false, &options).await.unwrap();
        assert_eq!(result.data.unwrap()["operationName"], json!("Rewritten"));
    }

    #[tokio::test]
    async fn test_log_function_sees_request_start_and_end() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (_, options) = echo_options();
        let options = options.with_log_function(move |message| {
            sink.lock().unwrap().push((message.action, message.step));
        });

        run(RawOperation::new("{ a }"), false, &options).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (LogAction::Request, LogStep::Start),
                (LogAction::Request, LogStep::End)
            ]
        );
    }
}
