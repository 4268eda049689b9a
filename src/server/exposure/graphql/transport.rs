//! Decoding of GraphQL payloads from HTTP requests

use crate::core::{HttpQueryError, QueryInput, RawOperation, RequestPayload, VariablesInput};
use axum::extract::Query;
use axum::http::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Transport arguments of one HTTP request
///
/// Handed to options factories so they can build per-request context
/// (e.g., from an `Authorization` header).
#[derive(Debug, Clone)]
pub struct HttpRequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,

    /// Identifier attached to the request's log events
    pub request_id: Uuid,
}

/// Extract the GraphQL payload of a request
///
/// Returns `None` when the request carries nothing (empty or `null` POST
/// body, or a method that has no payload); the runner decides how to reject it.
pub fn extract_payload(
    method: &Method,
    uri: &Uri,
    body: &[u8],
) -> Result<Option<RequestPayload>, HttpQueryError> {
    if *method == Method::GET {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri)
            .map_err(|e| HttpQueryError::bad_request(e.to_string()))?;
        return Ok(Some(RequestPayload::Single(operation_from_params(params)?)));
    }

    if *method == Method::POST {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        // A JSON `null` body carries no payload either
        return serde_json::from_slice::<Option<RequestPayload>>(body)
            .map_err(|_| HttpQueryError::bad_request("POST body sent invalid JSON."));
    }

    Ok(None)
}

fn operation_from_params(
    mut params: HashMap<String, String>,
) -> Result<RawOperation, HttpQueryError> {
    let extensions = match params.remove("extensions") {
        Some(text) => Some(
            serde_json::from_str::<Map<String, Value>>(&text)
                .map_err(|_| HttpQueryError::bad_request("Extensions are invalid JSON."))?,
        ),
        None => None,
    };

    Ok(RawOperation {
        query: params.remove("query").map(QueryInput::Text),
        operation_name: params.remove("operationName"),
        variables: params.remove("variables").map(VariablesInput::Encoded),
        extensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_reads_query_parameters() {
        let uri: Uri = "/graphql?query=%7B%20a%20%7D&operationName=A&variables=%7B%7D"
            .parse()
            .unwrap();
        let payload = extract_payload(&Method::GET, &uri, b"").unwrap().unwrap();

        let RequestPayload::Single(operation) = payload else {
            panic!("GET always yields a single operation");
        };
        assert!(matches!(operation.query, Some(QueryInput::Text(ref q)) if q == "{ a }"));
        assert_eq!(operation.operation_name.as_deref(), Some("A"));
        assert!(matches!(operation.variables, Some(VariablesInput::Encoded(_))));
    }

    #[test]
    fn test_get_without_parameters_is_empty() {
        let uri: Uri = "/graphql".parse().unwrap();
        let payload = extract_payload(&Method::GET, &uri, b"").unwrap().unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_post_empty_body_is_missing() {
        let uri: Uri = "/graphql".parse().unwrap();
        assert!(extract_payload(&Method::POST, &uri, b"  ").unwrap().is_none());
    }

    #[test]
    fn test_post_null_body_is_missing() {
        let uri: Uri = "/graphql".parse().unwrap();
        assert!(extract_payload(&Method::POST, &uri, b"null").unwrap().is_none());
        assert!(extract_payload(&Method::POST, &uri, b" null\n").unwrap().is_none());
    }

    #[test]
    fn test_post_invalid_json_is_400() {
        let uri: Uri = "/graphql".parse().unwrap();
        let err = extract_payload(&Method::POST, &uri, b"{nope").unwrap_err();
        assert_eq!(err.message, "POST body sent invalid JSON.");
    }

    #[test]
    fn test_post_batch_body() {
        let uri: Uri = "/graphql".parse().unwrap();
        let payload = extract_payload(&Method::POST, &uri, br#"[{"query":"{ a }"}]"#)
            .unwrap()
            .unwrap();
        assert!(matches!(payload, RequestPayload::Batch(ref ops) if ops.len() == 1));
    }

    #[test]
    fn test_other_methods_carry_no_payload() {
        let uri: Uri = "/graphql".parse().unwrap();
        assert!(extract_payload(&Method::PUT, &uri, b"{}").unwrap().is_none());
    }
}
