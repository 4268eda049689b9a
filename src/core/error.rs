//! Typed error handling for the GraphQL HTTP runner
//!
//! Two disjoint classes of failure exist while running a request:
//!
//! - [`HttpQueryError`]: transport-fatal. It aborts the whole request (every
//!   operation of a batch) and carries everything needed to render an HTTP
//!   response: status code, message/payload and headers.
//! - Engine-local failures: plain [`anyhow::Error`] values raised while
//!   parsing, validating or executing one operation. They are formatted and
//!   embedded in that operation's `errors`, never aborting siblings.
//!
//! [`ExecutionFailure`] tags the two so callers match on the variant instead
//! of inspecting error names.
//!
//! # Example
//!
//! ```rust,ignore
//! match run_http_query(args, request).await {
//!     Ok(body) => respond(200, body),
//!     Err(err) => respond(err.status_code, err.message),
//! }
//! ```

use axum::http::header::{ALLOW, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Error that short-circuits a whole HTTP request
///
/// `message` is either a fixed human-readable string or, when
/// `is_graphql_error` is set, a serialized GraphQL response body.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpQueryError {
    /// HTTP status code to answer with
    pub status_code: StatusCode,

    /// Response body
    pub message: String,

    /// True when `message` is a JSON-encoded GraphQL result
    pub is_graphql_error: bool,

    /// Extra response headers (empty when none)
    pub headers: HeaderMap,
}

impl HttpQueryError {
    /// Create an error with a plain message and no headers
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            is_graphql_error: false,
            headers: HeaderMap::new(),
        }
    }

    /// Add a response header
    pub fn with_header(mut self, name: axum::http::HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    /// 400 with a plain message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 500 with a plain message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 405 advertising the allowed methods
    pub fn method_not_allowed(message: impl Into<String>, allow: &'static str) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message).with_header(ALLOW, allow)
    }

    /// 400 whose body is a serialized GraphQL result
    pub fn graphql_response(body: String) -> Self {
        Self {
            status_code: StatusCode::BAD_REQUEST,
            message: body,
            is_graphql_error: true,
            headers: HeaderMap::new(),
        }
        .with_header(CONTENT_TYPE, "application/json")
    }

    /// POST request without a body
    pub fn post_body_missing() -> Self {
        Self::internal("POST body missing.")
    }

    /// GET request without any query parameter
    pub fn get_query_missing() -> Self {
        Self::bad_request("GET query missing.")
    }

    /// Any method other than GET or POST
    pub fn unsupported_method() -> Self {
        Self::method_not_allowed("GraphQL only supports GET and POST requests.", "GET, POST")
    }

    /// A mutation or subscription sent over GET
    pub fn get_non_query() -> Self {
        Self::method_not_allowed("GET supports only query operation", "POST")
    }

    /// `variables` sent as a string that is not a JSON object
    pub fn invalid_variables() -> Self {
        Self::bad_request("Variables are invalid JSON.")
    }
}

impl IntoResponse for HttpQueryError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code, self.message).into_response();
        for (name, value) in self.headers.iter() {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        response
    }
}

/// Errors raised while picking the operation of a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The document contains no operation definition
    #[error("Document contains no operation")]
    NoOperation,

    /// Several operations and no name to pick one
    #[error("Must provide operation name if query contains multiple operations.")]
    OperationNameRequired,

    /// No operation carries the requested name
    #[error("Unknown operation named \"{0}\".")]
    UnknownOperation(String),

    /// More than one operation carries the requested name
    #[error("There can be only one operation named \"{0}\".")]
    AmbiguousOperation(String),
}

impl From<ClassifyError> for HttpQueryError {
    fn from(err: ClassifyError) -> Self {
        HttpQueryError::internal(err.to_string())
    }
}

/// Errors raised while loading server configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid YAML for [`crate::config::ServerConfig`]
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The GraphQL route is not an absolute path
    #[error("GraphQL path must start with '/': {0}")]
    InvalidPath(String),
}

/// Outcome of a failed operation, tagged by how it must be handled
#[derive(Debug)]
pub enum ExecutionFailure {
    /// Aborts the whole request
    Http(HttpQueryError),

    /// Stays local to the operation and ends up in its `errors`
    Engine(anyhow::Error),
}

impl From<HttpQueryError> for ExecutionFailure {
    fn from(err: HttpQueryError) -> Self {
        ExecutionFailure::Http(err)
    }
}

impl From<anyhow::Error> for ExecutionFailure {
    /// Engines and resolvers may abort a request by returning an
    /// `HttpQueryError` wrapped in `anyhow`; it is recovered by type.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<HttpQueryError>() {
            Ok(http) => ExecutionFailure::Http(http),
            Err(other) => ExecutionFailure::Engine(other),
        }
    }
}
