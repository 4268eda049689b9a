//! Selection set traversal and result projection

use super::values::{arguments_to_json, gql_value_to_json};
use crate::core::{FieldResolver, ParsedDocument};
use graphql_parser::query::{
    Definition, Directive, Field, FragmentDefinition, Selection, SelectionSet,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Fragment definitions of a document by name
pub type Fragments<'d> = HashMap<&'d str, &'d FragmentDefinition<'static, String>>;

/// Selected fields sharing a response key, in first-occurrence order
pub type FieldGroups<'d> = IndexMap<&'d str, Vec<&'d Field<'static, String>>>;

pub fn fragments_of(document: &ParsedDocument) -> Fragments<'_> {
    document
        .definitions
        .iter()
        .filter_map(|def| match def {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect()
}

/// Flatten a selection set into the fields it selects
///
/// Inline fragments and fragment spreads are expanded; `@skip` and
/// `@include` are honored.
pub fn collect_fields<'d>(
    selection_set: &'d SelectionSet<'static, String>,
    fragments: &Fragments<'d>,
    variables: &Map<String, Value>,
) -> Vec<&'d Field<'static, String>> {
    let mut fields = Vec::new();
    let mut visited = HashSet::new();
    collect_into(selection_set, fragments, variables, &mut fields, &mut visited);
    fields
}

/// Collect the fields of several selection sets and merge them by response key
///
/// Each group is resolved once; its sub-selections are the union of the
/// sub-selections of its fields.
pub fn group_fields<'d>(
    selection_sets: &[&'d SelectionSet<'static, String>],
    fragments: &Fragments<'d>,
    variables: &Map<String, Value>,
) -> FieldGroups<'d> {
    let mut groups: FieldGroups<'d> = IndexMap::new();
    for selection_set in selection_sets {
        for field in collect_fields(selection_set, fragments, variables) {
            groups.entry(response_key(field)).or_default().push(field);
        }
    }
    groups
}

/// Sub-selections of every field of a group
pub fn sub_selections<'d>(
    fields: &[&'d Field<'static, String>],
) -> Vec<&'d SelectionSet<'static, String>> {
    fields.iter().map(|field| &field.selection_set).collect()
}

fn collect_into<'d>(
    selection_set: &'d SelectionSet<'static, String>,
    fragments: &Fragments<'d>,
    variables: &Map<String, Value>,
    fields: &mut Vec<&'d Field<'static, String>>,
    visited: &mut HashSet<&'d str>,
) {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                if should_include(&field.directives, variables) {
                    fields.push(field);
                }
            }
            Selection::InlineFragment(inline) => {
                if should_include(&inline.directives, variables) {
                    collect_into(&inline.selection_set, fragments, variables, fields, visited);
                }
            }
            Selection::FragmentSpread(spread) => {
                if !should_include(&spread.directives, variables)
                    || !visited.insert(spread.fragment_name.as_str())
                {
                    continue;
                }
                if let Some(&fragment) = fragments.get(spread.fragment_name.as_str()) {
                    collect_into(&fragment.selection_set, fragments, variables, fields, visited);
                }
            }
        }
    }
}

fn should_include(
    directives: &[Directive<'static, String>],
    variables: &Map<String, Value>,
) -> bool {
    directives.iter().all(|directive| {
        let condition = directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .map(|(_, value)| gql_value_to_json(value, variables));

        match (directive.name.as_str(), condition) {
            ("skip", Some(Value::Bool(true))) => false,
            ("include", Some(Value::Bool(false))) => false,
            _ => true,
        }
    })
}

/// Key of a field in the response
pub fn response_key<'f>(field: &'f Field<'static, String>) -> &'f str {
    field.alias.as_deref().unwrap_or(field.name.as_str())
}

/// Shapes resolved values to what the query selected
pub struct Projection<'a, 'd> {
    pub fragments: &'a Fragments<'d>,
    pub variables: &'a Map<String, Value>,
    pub field_resolver: Option<&'a FieldResolver>,
}

impl Projection<'_, '_> {
    /// Keep only the selected fields of `value`
    ///
    /// `selection_sets` are the merged sub-selections of one field group.
    /// Lists are projected element by element; scalars are returned as-is.
    pub fn project<'s>(
        &self,
        value: Value,
        selection_sets: &[&'s SelectionSet<'static, String>],
    ) -> Value {
        if selection_sets.iter().all(|set| set.items.is_empty()) {
            return value;
        }

        match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.project(item, selection_sets))
                    .collect(),
            ),
            Value::Object(_) => {
                let mut result = Map::new();
                for (key, fields) in group_fields(selection_sets, self.fragments, self.variables) {
                    let child = self.resolve_field(&value, fields[0]);
                    result.insert(key.to_string(), self.project(child, &sub_selections(&fields)));
                }
                Value::Object(result)
            }
            other => other,
        }
    }

    fn resolve_field(&self, parent: &Value, field: &Field<'static, String>) -> Value {
        let name = field.name.as_str();
        if let Some(resolver) = self.field_resolver {
            let args = arguments_to_json(&field.arguments, self.variables);
            return resolver(parent, name, &args);
        }

        let Some(object) = parent.as_object() else {
            return Value::Null;
        };

        if let Some(value) = object.get(name) {
            return value.clone();
        }

        // Resolvers commonly return snake_case keys for camelCase fields
        object
            .get(&camel_to_snake(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Convert camelCase to snake_case
pub fn camel_to_snake(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(ch.to_lowercase().next().unwrap_or(ch));
        } else {
            result.push(ch);
        }
    }
    result
}
