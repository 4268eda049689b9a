//! Conversion of GraphQL input values to JSON

use anyhow::{Result, bail};
use graphql_parser::query::{Type, Value as GqlValue, VariableDefinition};
use serde_json::{Map, Value, json};

/// Convert a GraphQL value to JSON, substituting variables
///
/// Unknown variables resolve to `null`.
pub fn gql_value_to_json(
    value: &GqlValue<'static, String>,
    variables: &Map<String, Value>,
) -> Value {
    match value {
        GqlValue::Null => Value::Null,
        GqlValue::Int(i) => json!(i.as_i64().unwrap_or(0)),
        GqlValue::Float(f) => json!(f),
        GqlValue::String(s) => json!(s),
        GqlValue::Boolean(b) => json!(b),
        GqlValue::Enum(e) => json!(e),
        GqlValue::List(list) => Value::Array(
            list.iter()
                .map(|item| gql_value_to_json(item, variables))
                .collect(),
        ),
        GqlValue::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.clone(), gql_value_to_json(v, variables));
            }
            Value::Object(map)
        }
        GqlValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
    }
}

/// Convert field or directive arguments to a JSON object
pub fn arguments_to_json(
    arguments: &[(String, GqlValue<'static, String>)],
    variables: &Map<String, Value>,
) -> Map<String, Value> {
    arguments
        .iter()
        .map(|(name, value)| (name.clone(), gql_value_to_json(value, variables)))
        .collect()
}

/// Render a type reference the way it is written in a document
pub fn type_to_string(ty: &Type<'static, String>) -> String {
    match ty {
        Type::NamedType(name) => name.clone(),
        Type::ListType(inner) => format!("[{}]", type_to_string(inner)),
        Type::NonNullType(inner) => format!("{}!", type_to_string(inner)),
    }
}

/// Merge provided variables with the defaults declared by the operation
///
/// A non-null variable without a value or a default is an error.
pub fn coerce_variables(
    definitions: &[VariableDefinition<'static, String>],
    provided: Option<Map<String, Value>>,
) -> Result<Map<String, Value>> {
    let mut variables = provided.unwrap_or_default();

    for definition in definitions {
        let present = variables
            .get(&definition.name)
            .is_some_and(|value| !value.is_null());
        if present {
            continue;
        }

        if let Some(default) = &definition.default_value {
            let default = gql_value_to_json(default, &Map::new());
            variables.insert(definition.name.clone(), default);
        } else if matches!(definition.var_type, Type::NonNullType(_)) {
            bail!(
                "Variable \"${}\" of required type \"{}\" was not provided.",
                definition.name,
                type_to_string(&definition.var_type)
            );
        }
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse_document;
    use graphql_parser::query::{Definition, OperationDefinition};

    fn variable_definitions(source: &str) -> Vec<VariableDefinition<'static, String>> {
        let document = parse_document(source).unwrap();
        match document.definitions.into_iter().next() {
            Some(Definition::Operation(OperationDefinition::Query(query))) => {
                query.variable_definitions
            }
            _ => panic!("expected a named query"),
        }
    }

    #[test]
    fn test_defaults_fill_missing_variables() {
        let definitions = variable_definitions("query Q($limit: Int = 10) { a }");
        let variables = coerce_variables(&definitions, None).unwrap();
        assert_eq!(variables.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn test_provided_variables_win_over_defaults() {
        let definitions = variable_definitions("query Q($limit: Int = 10) { a }");
        let mut provided = Map::new();
        provided.insert("limit".into(), json!(3));
        let variables = coerce_variables(&definitions, Some(provided)).unwrap();
        assert_eq!(variables.get("limit"), Some(&json!(3)));
    }

    #[test]
    fn test_missing_required_variable_fails() {
        let definitions = variable_definitions("query Q($id: ID!) { a }");
        let err = coerce_variables(&definitions, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Variable \"$id\" of required type \"ID!\" was not provided."
        );
    }

    #[test]
    fn test_type_rendering() {
        let definitions = variable_definitions("query Q($ids: [ID!]!) { a }");
        assert_eq!(type_to_string(&definitions[0].var_type), "[ID!]!");
    }
}
