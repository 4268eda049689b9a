//! Batch orchestration
//!
//! Turns a transport-level request into one or many operations, decides
//! which of them must run serially, runs them, and puts the results back in
//! the order the client sent the operations.

use super::single::{establish_contexts, execute_operation};
use crate::core::{
    ErrorFormatter, ExecutionContext, ExecutionResult, HttpQueryError, HttpQueryRequest,
    OperationKind, QueryInput, QueryOptions, RawOperation, RequestPayload, classify,
};
use axum::http::Method;
use futures::future::try_join_all;
use std::sync::Arc;

/// Run an HTTP GraphQL request and serialize its response body
///
/// `args` are the transport arguments handed to an options factory. The
/// returned string is a single result for a plain request and a JSON array
/// of results for a batch. Any [`HttpQueryError`] aborts the whole request.
///
/// # Example
///
/// ```rust,ignore
/// let request = HttpQueryRequest {
///     method: Method::POST,
///     query: Some(RawOperation::new("{ hello }").into()),
///     options: OptionsSource::Static(options),
/// };
/// let body = run_http_query((), request).await?;
/// ```
pub async fn run_http_query<A, C>(
    args: A,
    request: HttpQueryRequest<A, C>,
) -> Result<String, HttpQueryError>
where
    A: Sync,
    C: ExecutionContext,
{
    let HttpQueryRequest {
        method,
        query,
        options,
    } = request;

    let options = options.resolve(&args).await?;
    let payload = validate_method(&method, query)?;
    let is_get_request = method == Method::GET;

    let (operations, is_batch) = payload.into_operations();
    let mut state = BatchState::new(operations, is_batch);
    if is_get_request {
        state.partition_by_kind();
    }

    tracing::debug!(
        method = %method,
        is_batch,
        operations = state.len(),
        serial = state.serial.len(),
        parallel = state.parallel.len(),
        "running GraphQL request"
    );

    let formatter = options.error_formatter();
    let results = state
        .execute(is_get_request, &options, &formatter)
        .await
        .inspect_err(|err| {
            tracing::warn!(status = %err.status_code, error = %err, "GraphQL request aborted");
        })?;

    render(results, is_batch)
}

/// Check the method and that it came with something to run
fn validate_method(
    method: &Method,
    payload: Option<RequestPayload>,
) -> Result<RequestPayload, HttpQueryError> {
    if *method == Method::POST {
        match payload {
            Some(RequestPayload::Batch(operations)) if operations.is_empty() => {
                Err(HttpQueryError::post_body_missing())
            }
            Some(payload) => Ok(payload),
            None => Err(HttpQueryError::post_body_missing()),
        }
    } else if *method == Method::GET {
        match payload {
            Some(payload) if !payload.is_empty() => Ok(payload),
            _ => Err(HttpQueryError::get_query_missing()),
        }
    } else {
        Err(HttpQueryError::unsupported_method())
    }
}

/// Serialize the results of a request
///
/// A lone operation that produced errors and no data becomes a 400 whose
/// body is the serialized result. A batch always succeeds.
fn render(mut results: Vec<ExecutionResult>, is_batch: bool) -> Result<String, HttpQueryError> {
    if is_batch {
        return serde_json::to_string(&results).map_err(serialization_failed);
    }

    let result = results
        .pop()
        .ok_or_else(|| HttpQueryError::internal("no result produced"))?;
    let body = serde_json::to_string(&result).map_err(serialization_failed)?;

    if result.is_failure() {
        return Err(HttpQueryError::graphql_response(body));
    }
    Ok(body)
}

fn serialization_failed(err: serde_json::Error) -> HttpQueryError {
    HttpQueryError::internal(format!("failed to serialize response: {}", err))
}

/// Transient state of one request
///
/// Every index in `0..operations.len()` is in exactly one of `serial` and
/// `parallel`. Both lists are in ascending order; `parallel[ordinal]` is the
/// original index of the `ordinal`-th concurrently run operation.
pub(crate) struct BatchState {
    operations: Vec<RawOperation>,
    is_batch: bool,
    serial: Vec<usize>,
    parallel: Vec<usize>,
}

impl BatchState {
    /// Every operation starts out in the parallel group
    pub(crate) fn new(operations: Vec<RawOperation>, is_batch: bool) -> Self {
        let parallel = (0..operations.len()).collect();
        Self {
            operations,
            is_batch,
            serial: Vec::new(),
            parallel,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.operations.len()
    }

    /// Parse text queries and move mutations to the serial group
    ///
    /// Queries that fail to parse or classify stay parallel; the executor
    /// reports the failure for them.
    pub(crate) fn partition_by_kind(&mut self) {
        let mut serial = Vec::new();
        let mut parallel = Vec::new();

        for (index, operation) in self.operations.iter_mut().enumerate() {
            let kind = operation.query.as_mut().and_then(|query| {
                let document = query.parse().ok()?;
                if query.is_text() {
                    *query = QueryInput::Document(document.clone());
                }
                classify(&document, operation.operation_name.as_deref()).ok()
            });

            match kind {
                Some(OperationKind::Mutation) => serial.push(index),
                Some(OperationKind::Query) | Some(OperationKind::Subscription) | None => {
                    parallel.push(index)
                }
            }
        }

        self.serial = serial;
        self.parallel = parallel;
    }

    /// Run the serial group in order, then the parallel group concurrently
    pub(crate) async fn execute<C: ExecutionContext>(
        self,
        is_get_request: bool,
        options: &QueryOptions<C>,
        formatter: &Arc<dyn ErrorFormatter>,
    ) -> Result<Vec<ExecutionResult>, HttpQueryError> {
        let BatchState {
            operations,
            is_batch,
            serial,
            parallel,
        } = self;

        let contexts = establish_contexts(options.context.clone(), operations.len(), is_batch);
        let mut pending: Vec<Option<(RawOperation, C)>> =
            operations.into_iter().zip(contexts).map(Some).collect();
        let mut results: Vec<Option<ExecutionResult>> = (0..pending.len()).map(|_| None).collect();

        for &index in &serial {
            let (operation, context) = take_pending(&mut pending, index)?;
            let result =
                execute_operation(operation, is_get_request, context, options, formatter).await?;
            results[index] = Some(result);
        }

        let mut jobs = Vec::with_capacity(parallel.len());
        for &index in &parallel {
            let (operation, context) = take_pending(&mut pending, index)?;
            jobs.push(execute_operation(
                operation,
                is_get_request,
                context,
                options,
                formatter,
            ));
        }

        for (ordinal, result) in try_join_all(jobs).await?.into_iter().enumerate() {
            results[parallel[ordinal]] = Some(result);
        }

        results
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.ok_or_else(|| {
                    HttpQueryError::internal(format!("operation {} produced no result", index))
                })
            })
            .collect()
    }
}

fn take_pending<T>(pending: &mut [Option<T>], index: usize) -> Result<T, HttpQueryError> {
    pending
        .get_mut(index)
        .and_then(Option::take)
        .ok_or_else(|| HttpQueryError::internal(format!("operation {} scheduled twice", index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionEngine, ExecutionParams};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records the order in which operations start and finish
    #[derive(Default)]
    struct RecordingEngine {
        started: Mutex<Vec<String>>,
        finished: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExecutionEngine<()> for RecordingEngine {
        async fn execute(&self, params: ExecutionParams<()>) -> anyhow::Result<ExecutionResult> {
            let name = params.operation_name.unwrap_or_default();
            self.started.lock().unwrap().push(name.clone());

            // Serial operations are slow, parallel ones fast
            let delay = if name.starts_with("serial") { 30 } else { 1 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.finished.lock().unwrap().push(name.clone());
            Ok(ExecutionResult::from_data(json!({ "name": name })))
        }
    }

    fn named(name: &str) -> RawOperation {
        RawOperation::new("{ a }").with_operation_name(name)
    }

    #[test]
    fn test_new_state_is_all_parallel() {
        let state = BatchState::new(vec![named("a"), named("b")], true);
        assert!(state.serial.is_empty());
        assert_eq!(state.parallel, vec![0, 1]);
    }

    #[test]
    fn test_partition_routes_mutations_to_serial() {
        let mut state = BatchState::new(
            vec![
                RawOperation::new("{ a }"),
                RawOperation::new("mutation { b }"),
                RawOperation::new("subscription { c }"),
                RawOperation::new("mutation { d }"),
                RawOperation::new("{ broken"),
            ],
            true,
        );
        state.partition_by_kind();

        assert_eq!(state.serial, vec![1, 3]);
        assert_eq!(state.parallel, vec![0, 2, 4]);
        assert!(matches!(
            state.operations[0].query,
            Some(QueryInput::Document(_))
        ));
        assert!(matches!(state.operations[4].query, Some(QueryInput::Text(_))));
    }

    #[tokio::test]
    async fn test_serial_group_runs_in_order_before_parallel() {
        let engine = Arc::new(RecordingEngine::default());
        let options = QueryOptions::new(engine.clone(), ());
        let formatter = options.error_formatter();

        let mut state = BatchState::new(
            vec![
                named("parallel-0"),
                named("serial-1"),
                named("parallel-2"),
                named("serial-3"),
            ],
            true,
        );
        state.serial = vec![1, 3];
        state.parallel = vec![0, 2];

        let results = state.execute(false, &options, &formatter).await.unwrap();

        let started = engine.started.lock().unwrap().clone();
        assert_eq!(&started[..2], &["serial-1".to_string(), "serial-3".to_string()]);

        let finished = engine.finished.lock().unwrap().clone();
        assert_eq!(&finished[..2], &["serial-1".to_string(), "serial-3".to_string()]);

        let names: Vec<_> = results
            .iter()
            .map(|r| r.data.as_ref().unwrap()["name"].clone())
            .collect();
        assert_eq!(
            names,
            vec![
                json!("parallel-0"),
                json!("serial-1"),
                json!("parallel-2"),
                json!("serial-3")
            ]
        );
    }

    #[tokio::test]
    async fn test_parallel_results_land_at_original_index() {
        let engine = Arc::new(RecordingEngine::default());
        let options = QueryOptions::new(engine, ());
        let formatter = options.error_formatter();

        let mut state = BatchState::new(
            vec![named("serial-0"), named("p-1"), named("p-2")],
            true,
        );
        state.serial = vec![0];
        state.parallel = vec![1, 2];

        let results = state.execute(false, &options, &formatter).await.unwrap();
        assert_eq!(results[1].data.as_ref().unwrap()["name"], json!("p-1"));
        assert_eq!(results[2].data.as_ref().unwrap()["name"], json!("p-2"));
    }

    #[test]
    fn test_validate_method() {
        let single = || Some(RequestPayload::Single(RawOperation::new("{ a }")));

        assert!(validate_method(&Method::GET, single()).is_ok());
        assert!(validate_method(&Method::POST, single()).is_ok());

        let err = validate_method(&Method::GET, None).unwrap_err();
        assert_eq!(err.message, "GET query missing.");

        let err =
            validate_method(&Method::GET, Some(RawOperation::default().into())).unwrap_err();
        assert_eq!(err.status_code, axum::http::StatusCode::BAD_REQUEST);

        let err = validate_method(&Method::POST, None).unwrap_err();
        assert_eq!(err.message, "POST body missing.");

        let err = validate_method(&Method::POST, Some(RequestPayload::Batch(vec![]))).unwrap_err();
        assert_eq!(err.message, "POST body missing.");

        let err = validate_method(&Method::PUT, single()).unwrap_err();
        assert_eq!(err.status_code, axum::http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_render_single_failure_is_typed_error() {
        let failed = ExecutionResult::from_errors(vec![crate::core::FormattedError::new("nope")]);

        let err = render(vec![failed.clone()], false).unwrap_err();
        assert!(err.is_graphql_error);
        assert_eq!(err.message, r#"{"errors":[{"message":"nope"}]}"#);

        let body = render(vec![failed.clone(), failed], true).unwrap();
        assert_eq!(
            body,
            r#"[{"errors":[{"message":"nope"}]},{"errors":[{"message":"nope"}]}]"#
        );
    }
}
