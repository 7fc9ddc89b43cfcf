//! Variable binding: validating and coercing the caller's raw inputs
//! against the operation's variable definitions, once per execution.

use async_graphql_value::{ConstValue, Variables};

use crate::{
    parser::types::OperationDefinition,
    registry::Registry,
    resolver_utils::{coerce_literal, coerce_variable_input},
    Positioned, ServerResult,
};

/// Build the immutable variable map for `operation` from `inputs`.
///
/// Absent (or null) inputs take the definition's default value, coerced as
/// a literal; everything else goes through input coercion. The first
/// failure aborts, located at the variable's definition.
pub(crate) fn bind_variables(
    registry: &Registry,
    operation: &Positioned<OperationDefinition>,
    inputs: &Variables,
) -> ServerResult<Variables> {
    let mut variables = Variables::default();

    for definition in &operation.node.variable_definitions {
        let name = definition.node.name.node.clone();
        let ty = definition.node.var_type.node.to_string();
        let raw = inputs.get(&name).cloned();

        let value = match (raw, definition.node.default_value()) {
            (None | Some(ConstValue::Null), Some(default)) => {
                coerce_literal(registry, &name, &ty, None, Some(default.clone()))
                    .map(|value| value.unwrap_or(ConstValue::Null))
            }
            (raw, _) => coerce_variable_input(registry, &name, &ty, raw),
        }
        .map_err(|error| error.into_server_error(definition.pos))?;

        variables.insert(name, value);
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use async_graphql_value::value;

    use crate::{
        parser::{parse_query, types::DocumentOperations},
        registry::{MetaField, ObjectType, Registry},
    };

    use super::*;

    fn registry() -> Registry {
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("a", "String")))
    }

    fn operation(query: &str) -> Positioned<OperationDefinition> {
        match parse_query(query).unwrap().operations {
            DocumentOperations::Single(operation) => operation,
            DocumentOperations::Multiple(mut operations) => operations.drain().next().unwrap().1,
        }
    }

    #[test]
    fn binds_and_coerces_inputs() {
        let operation = operation("query($n: Int!) { a }");
        let inputs = Variables::from_json(serde_json::json!({"n": 5}));
        let variables = bind_variables(&registry(), &operation, &inputs).unwrap();
        assert_eq!(variables.get(&async_graphql_value::Name::new("n")), Some(&value!(5)));
    }

    #[test]
    fn string_input_for_int_is_a_coercion_error() {
        let operation = operation("query($n: Int!) { a }");
        let inputs = Variables::from_json(serde_json::json!({"n": "5"}));
        let err = bind_variables(&registry(), &operation, &inputs).unwrap_err();
        assert!(err.message.contains("for n"), "{}", err.message);
        assert!(!err.locations.is_empty());
    }

    #[test]
    fn absent_input_takes_the_default_literal() {
        let operation = operation(r#"query($greeting: String = "hi") { a }"#);
        let variables = bind_variables(&registry(), &operation, &Variables::default()).unwrap();
        assert_eq!(
            variables.get(&async_graphql_value::Name::new("greeting")),
            Some(&value!("hi"))
        );
    }

    #[test]
    fn explicit_null_takes_the_default_too() {
        let operation = operation("query($limit: Int = 10) { a }");
        let inputs = Variables::from_json(serde_json::json!({"limit": null}));
        let variables = bind_variables(&registry(), &operation, &inputs).unwrap();
        assert_eq!(
            variables.get(&async_graphql_value::Name::new("limit")),
            Some(&value!(10))
        );
    }

    #[test]
    fn missing_non_null_input_fails() {
        let operation = operation("query($n: Int!) { a }");
        let err = bind_variables(&registry(), &operation, &Variables::default()).unwrap_err();
        assert_eq!(err.message, "Unexpected null value for n");
    }
}
