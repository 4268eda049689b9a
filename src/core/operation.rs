//! Operation classification
//!
//! Picks the operation a request targets inside a parsed document and
//! reports whether it is a query, a mutation or a subscription.

use super::error::ClassifyError;
use super::request::ParsedDocument;
use graphql_parser::query::{Definition, OperationDefinition};
use std::fmt;

/// Kind of a GraphQL operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn of(operation: &OperationDefinition<'static, String>) -> Self {
        match operation {
            OperationDefinition::SelectionSet(_) | OperationDefinition::Query(_) => {
                OperationKind::Query
            }
            OperationDefinition::Mutation(_) => OperationKind::Mutation,
            OperationDefinition::Subscription(_) => OperationKind::Subscription,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of an operation, `None` for anonymous ones
pub fn operation_name<'d>(operation: &'d OperationDefinition<'static, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(q) => q.name.as_deref(),
        OperationDefinition::Mutation(m) => m.name.as_deref(),
        OperationDefinition::Subscription(s) => s.name.as_deref(),
    }
}

/// Select the operation addressed by `name`
///
/// With a name, exactly one operation must carry it. Without one, the
/// document must contain exactly one operation.
pub fn select_operation<'d>(
    document: &'d ParsedDocument,
    name: Option<&str>,
) -> Result<&'d OperationDefinition<'static, String>, ClassifyError> {
    let operations = document.definitions.iter().filter_map(|def| match def {
        Definition::Operation(op) => Some(op),
        Definition::Fragment(_) => None,
    });

    match name {
        Some(name) => {
            let mut matching = operations.filter(|op| operation_name(op) == Some(name));
            match (matching.next(), matching.next()) {
                (Some(op), None) => Ok(op),
                (None, _) => Err(ClassifyError::UnknownOperation(name.to_string())),
                (Some(_), Some(_)) => Err(ClassifyError::AmbiguousOperation(name.to_string())),
            }
        }
        None => {
            let mut operations = operations;
            match (operations.next(), operations.next()) {
                (Some(op), None) => Ok(op),
                (None, _) => Err(ClassifyError::NoOperation),
                (Some(_), Some(_)) => Err(ClassifyError::OperationNameRequired),
            }
        }
    }
}

/// Kind of the operation addressed by `name`
pub fn classify(
    document: &ParsedDocument,
    name: Option<&str>,
) -> Result<OperationKind, ClassifyError> {
    select_operation(document, name).map(OperationKind::of)
}
