//! Built-in execution engine
//!
//! [`ResolverEngine`] executes operations against root-field resolvers
//! registered on the Query and Mutation types. It lets the runner serve
//! requests without an external executor; anything richer plugs in through
//! [`ExecutionEngine`].
//!
//! - `values`: GraphQL value to JSON conversion and variable coercion
//! - `selection`: fragment expansion, directives and result projection

pub mod selection;
pub mod values;

use crate::core::{
    ErrorFormatter, ExecutionContext, ExecutionEngine, ExecutionParams, ExecutionResult,
    LogAction, LogMessage, LogStep, Location, OperationKind, PathSegment, select_operation,
};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, join_all};
use graphql_parser::query::{Field, OperationDefinition, VariableDefinition};
use indexmap::IndexMap;
use selection::{FieldGroups, Projection, fragments_of, group_fields, sub_selections};
use serde_json::{Map, Value, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use values::{arguments_to_json, coerce_variables};

const NO_VARIABLES: &[VariableDefinition<'static, String>] = &[];

/// Arguments passed to a root-field resolver
pub struct ResolverArgs<C> {
    /// Root value of the request
    pub root: Value,

    /// Field arguments with variables substituted
    pub args: Map<String, Value>,

    pub context: C,
}

/// Resolves one root field
pub type Resolver<C> =
    Arc<dyn Fn(ResolverArgs<C>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Engine resolving root fields through registered closures
///
/// Query fields resolve concurrently, mutation fields one after the other
/// in document order. Sub-selections are projected onto the JSON each
/// resolver returns.
///
/// # Example
///
/// ```rust,ignore
/// let engine = ResolverEngine::<()>::new()
///     .query("hello", |_| async { Ok(json!("world")) })
///     .mutation("ping", |_| async { Ok(json!("pong")) });
/// ```
pub struct ResolverEngine<C> {
    query_fields: IndexMap<String, Resolver<C>>,
    mutation_fields: IndexMap<String, Resolver<C>>,
}

impl<C: ExecutionContext> Default for ResolverEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ExecutionContext> ResolverEngine<C> {
    pub fn new() -> Self {
        Self {
            query_fields: IndexMap::new(),
            mutation_fields: IndexMap::new(),
        }
    }

    /// Register a field on the Query type
    pub fn query<F, Fut>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(ResolverArgs<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.query_fields.insert(name.into(), boxed(resolver));
        self
    }

    /// Register a field on the Mutation type
    pub fn mutation<F, Fut>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(ResolverArgs<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.mutation_fields.insert(name.into(), boxed(resolver));
        self
    }

    /// Query fields in registration order
    pub fn query_fields(&self) -> impl Iterator<Item = &str> {
        self.query_fields.keys().map(String::as_str)
    }

    /// Mutation fields in registration order
    pub fn mutation_fields(&self) -> impl Iterator<Item = &str> {
        self.mutation_fields.keys().map(String::as_str)
    }

    async fn run(&self, params: ExecutionParams<C>) -> ExecutionResult {
        let ExecutionParams {
            query,
            variables,
            context,
            root_value,
            operation_name,
            log_function,
            validation_rules,
            format_error,
            field_resolver,
            tracing,
            ..
        } = params;

        let log = |action: LogAction, step: LogStep| {
            if let Some(log) = &log_function {
                log(&LogMessage::new(action, step));
            }
        };
        let errors_only = |error: anyhow::Error| {
            ExecutionResult::from_errors(vec![format_error.format_error(&error)])
        };

        log(LogAction::Parse, LogStep::Start);
        let document = match query.parse() {
            Ok(document) => document,
            Err(err) => return errors_only(err),
        };
        log(LogAction::Parse, LogStep::End);

        log(LogAction::Validation, LogStep::Start);
        let validation_errors: Vec<_> = validation_rules
            .iter()
            .flat_map(|rule| rule(&document))
            .map(|err| format_error.format_error(&err))
            .collect();
        log(LogAction::Validation, LogStep::End);
        if !validation_errors.is_empty() {
            return ExecutionResult::from_errors(validation_errors);
        }

        let operation = match select_operation(&document, operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(err) => return errors_only(err.into()),
        };
        let (kind, definitions, selection_set) = match operation {
            OperationDefinition::SelectionSet(set) => (OperationKind::Query, NO_VARIABLES, set),
            OperationDefinition::Query(q) => {
                (OperationKind::Query, &q.variable_definitions[..], &q.selection_set)
            }
            OperationDefinition::Mutation(m) => {
                (OperationKind::Mutation, &m.variable_definitions[..], &m.selection_set)
            }
            OperationDefinition::Subscription(_) => {
                return errors_only(anyhow!("Subscriptions are not supported"));
            }
        };

        let variables = match coerce_variables(definitions, variables) {
            Ok(variables) => variables,
            Err(err) => return errors_only(err),
        };

        log(LogAction::Execute, LogStep::Start);
        let started = Instant::now();
        let fragments = fragments_of(&document);
        let groups = group_fields(&[selection_set], &fragments, &variables);
        let root = RootResolution {
            resolvers: match kind {
                OperationKind::Mutation => &self.mutation_fields,
                _ => &self.query_fields,
            },
            type_name: match kind {
                OperationKind::Mutation => "Mutation",
                _ => "Query",
            },
            variables: &variables,
            root_value: &root_value,
            context: &context,
        };

        let outcomes = if kind == OperationKind::Mutation {
            let mut outcomes = Vec::with_capacity(groups.len());
            for fields in groups.values() {
                outcomes.push(root.resolve(fields[0]).await);
            }
            outcomes
        } else {
            join_all(groups.values().map(|fields| root.resolve(fields[0]))).await
        };

        let result = assemble(
            &groups,
            outcomes,
            &Projection {
                fragments: &fragments,
                variables: &variables,
                field_resolver: field_resolver.as_ref(),
            },
            &*format_error,
        );
        log(LogAction::Execute, LogStep::End);

        if tracing {
            return with_tracing(result, started, root.type_name, &groups);
        }
        result
    }
}

#[async_trait]
impl<C: ExecutionContext> ExecutionEngine<C> for ResolverEngine<C> {
    async fn execute(&self, params: ExecutionParams<C>) -> Result<ExecutionResult> {
        let format_response = params.format_response.clone();
        let result = self.run(params).await;
        Ok(match format_response {
            Some(format_response) => format_response(result),
            None => result,
        })
    }
}

fn boxed<C, F, Fut>(resolver: F) -> Resolver<C>
where
    F: Fn(ResolverArgs<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |args| resolver(args).boxed())
}

/// What root fields of one operation resolve against
struct RootResolution<'a, C> {
    resolvers: &'a IndexMap<String, Resolver<C>>,
    type_name: &'static str,
    variables: &'a Map<String, Value>,
    root_value: &'a Value,
    context: &'a C,
}

impl<C: ExecutionContext> RootResolution<'_, C> {
    async fn resolve(&self, field: &Field<'static, String>) -> Result<Value> {
        let Some(resolver) = self.resolvers.get(field.name.as_str()) else {
            if field.name == "__typename" {
                return Ok(json!(self.type_name));
            }
            bail!(
                "Cannot query field \"{}\" on type \"{}\".",
                field.name,
                self.type_name
            );
        };

        resolver(ResolverArgs {
            root: self.root_value.clone(),
            args: arguments_to_json(&field.arguments, self.variables),
            context: self.context.clone(),
        })
        .await
    }
}

/// Build the result of an operation from its root field outcomes
///
/// A failed field is `null` in `data` and contributes an error with its path.
fn assemble(
    groups: &FieldGroups<'_>,
    outcomes: Vec<Result<Value>>,
    projection: &Projection<'_, '_>,
    format_error: &dyn ErrorFormatter,
) -> ExecutionResult {
    let mut data = Map::new();
    let mut errors = Vec::new();

    for ((key, fields), outcome) in groups.iter().zip(outcomes) {
        let key = key.to_string();
        let field = fields[0];
        match outcome {
            Ok(value) => {
                data.insert(key, projection.project(value, &sub_selections(fields)));
            }
            Err(err) => {
                errors.push(
                    format_error
                        .format_error(&err)
                        .with_path(vec![PathSegment::Key(key.clone())])
                        .with_location(Location {
                            line: field.position.line,
                            column: field.position.column,
                        }),
                );
                data.insert(key, Value::Null);
            }
        }
    }

    ExecutionResult {
        data: Some(Value::Object(data)),
        errors: (!errors.is_empty()).then_some(errors),
        extensions: None,
    }
}

/// Attach execution timing to a result
fn with_tracing(
    mut result: ExecutionResult,
    started: Instant,
    parent_type: &str,
    groups: &FieldGroups<'_>,
) -> ExecutionResult {
    let resolvers: Vec<Value> = groups
        .iter()
        .map(|(key, fields)| {
            json!({
                "path": [key],
                "parentType": parent_type,
                "fieldName": fields[0].name,
            })
        })
        .collect();

    result.extensions.get_or_insert_with(Map::new).insert(
        "tracing".to_string(),
        json!({
            "version": 1,
            "duration": started.elapsed().as_nanos() as u64,
            "execution": { "resolvers": resolvers },
        }),
    );
    result
}
