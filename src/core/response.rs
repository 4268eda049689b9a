//! Execution results and their wire-safe error representation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source position of an error in the query document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// One segment of a response path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// An error in the shape GraphQL clients expect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl FormattedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.get_or_insert_with(Vec::new).push(location);
        self
    }
}

/// Result of executing one operation
///
/// Produced once per operation and never mutated by the runner afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FormattedError>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ExecutionResult {
    /// Result carrying only data
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    /// Result carrying only errors
    pub fn from_errors(errors: Vec<FormattedError>) -> Self {
        Self {
            errors: Some(errors),
            ..Default::default()
        }
    }

    /// Errors present and no usable data
    ///
    /// A `null` data value counts as no data.
    pub fn is_failure(&self) -> bool {
        self.errors.is_some() && self.data.as_ref().is_none_or(Value::is_null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let result = ExecutionResult::from_data(json!({"hello": "world"}));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"data": {"hello": "world"}})
        );
    }

    #[test]
    fn test_failure_detection() {
        let errors = vec![FormattedError::new("boom")];
        assert!(ExecutionResult::from_errors(errors.clone()).is_failure());

        let null_data = ExecutionResult {
            data: Some(Value::Null),
            errors: Some(errors.clone()),
            extensions: None,
        };
        assert!(null_data.is_failure());

        let partial = ExecutionResult {
            data: Some(json!({"a": null})),
            errors: Some(errors),
            extensions: None,
        };
        assert!(!partial.is_failure());
        assert!(!ExecutionResult::from_data(json!({})).is_failure());
    }

    #[test]
    fn test_error_path_serializes_mixed_segments() {
        let error = FormattedError::new("bad")
            .with_path(vec![PathSegment::Key("items".into()), PathSegment::Index(2)])
            .with_location(Location { line: 1, column: 3 });
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"message": "bad", "locations": [{"line": 1, "column": 3}], "path": ["items", 2]})
        );
    }
}
