//! GraphQL-over-HTTP exposure
//!
//! Mounts one route answering every method. GET reads the operation from
//! the URL query parameters, POST from the JSON body; the runner decides
//! what is acceptable and renders errors with their own status and headers.

mod transport;

pub use transport::{HttpRequestInfo, extract_payload};

use crate::core::{ExecutionContext, HttpQueryRequest, OptionsSource};
use crate::runner::run_http_query;
use axum::{
    Router,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, Method, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::any,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// GraphQL API exposure implementation
pub struct GraphQLExposure;

impl GraphQLExposure {
    /// Build the GraphQL router
    ///
    /// # Arguments
    ///
    /// * `options` - Where each request's execution options come from
    /// * `path` - Route serving GraphQL (e.g., "/graphql")
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let options = QueryOptions::new(Arc::new(engine), ());
    /// let app = GraphQLExposure::build_router(options.into(), "/graphql");
    /// ```
    pub fn build_router<C: ExecutionContext>(
        options: OptionsSource<HttpRequestInfo, C>,
        path: &str,
    ) -> Router {
        Router::new()
            .route(path, any(graphql_handler::<C>))
            .layer(Extension(options))
            .layer(TraceLayer::new_for_http())
    }
}

/// Handler for GraphQL requests of any method
async fn graphql_handler<C: ExecutionContext>(
    Extension(options): Extension<OptionsSource<HttpRequestInfo, C>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    tracing::debug!(%request_id, %method, path = uri.path(), "GraphQL request received");

    let query = match extract_payload(&method, &uri, &body) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };

    let info = HttpRequestInfo {
        method: method.clone(),
        uri,
        headers,
        request_id,
    };
    let request = HttpQueryRequest {
        method,
        query,
        options,
    };

    match run_http_query(info, request).await {
        Ok(body) => ([(CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            tracing::debug!(%request_id, status = %err.status_code, "GraphQL request rejected");
            err.into_response()
        }
    }
}
