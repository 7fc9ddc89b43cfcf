//! End-to-end execution scenarios: response shaping, directives, fragments,
//! abstract types, error propagation.

use async_graphql_value::{value, ConstValue, Variables};
use graphql_executor::{
    registry::{
        EnumType, InterfaceType, MetaField, MetaInputValue, ObjectType, Registry, UnionType,
    },
    Error, QueryPathSegment, Request, Response, Schema,
};

fn schema(registry: Registry) -> Schema {
    Schema::new(registry).unwrap()
}

fn assert_data(response: &Response, expected: ConstValue) {
    assert!(
        response.errors.is_empty(),
        "unexpected errors: {:?}",
        response.errors
    );
    assert_eq!(response.data, expected);
}

#[tokio::test]
async fn skip_directive_removes_the_key() {
    let schema = schema(Registry::new("Query").register(
        ObjectType::new("Query")
            .field(MetaField::new("a", "String"))
            .field(MetaField::new("b", "String")),
    ));
    let response = schema
        .execute(
            Request::new("{ a b @skip(if: true) }")
                .root_value(value!({"a": "alpha", "b": "beta"})),
        )
        .await;
    assert_data(&response, value!({"a": "alpha"}));
}

#[tokio::test]
async fn include_directive_with_false_condition_removes_the_key() {
    let schema = schema(Registry::new("Query").register(
        ObjectType::new("Query")
            .field(MetaField::new("a", "String"))
            .field(MetaField::new("b", "String")),
    ));
    let response = schema
        .execute(
            Request::new("query($want: Boolean!) { a @include(if: $want) b }")
                .variables(Variables::from_json(serde_json::json!({"want": false})))
                .root_value(value!({"a": "alpha", "b": "beta"})),
        )
        .await;
    assert_data(&response, value!({"b": "beta"}));
}

#[tokio::test]
async fn aliases_produce_distinct_keys_in_order() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("a", "String"))),
    );
    let response = schema
        .execute(Request::new("{ x: a y: a }").root_value(value!({"a": "ok"})))
        .await;
    assert!(response.errors.is_empty());
    let ConstValue::Object(map) = &response.data else {
        panic!("expected an object, got {:?}", response.data);
    };
    let keys: Vec<_> = map.keys().map(|key| key.as_str()).collect();
    assert_eq!(keys, ["x", "y"]);
    for value in map.values() {
        assert_eq!(*value, value!("ok"));
    }
}

#[tokio::test]
async fn non_null_violation_nulls_the_nearest_nullable_ancestor() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("parent", "Parent")))
            .register(ObjectType::new("Parent").field(MetaField::new("child", "String!"))),
    );
    let response = schema
        .execute(
            Request::new("{ parent { child } }").root_value(value!({"parent": {"child": null}})),
        )
        .await;

    assert_eq!(response.data, value!({"parent": null}));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Cannot return null for non-null type. Field: child, Type: String!."
    );
    assert_eq!(
        response.errors[0].path,
        vec![
            QueryPathSegment::Field("parent".into()),
            QueryPathSegment::Field("child".into()),
        ]
    );
}

#[tokio::test]
async fn non_null_violation_at_the_root_nulls_data() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("required", "String!"))),
    );
    let response = schema
        .execute(Request::new("{ required }").root_value(value!({"required": null})))
        .await;
    assert_eq!(response.data, ConstValue::Null);
    assert_eq!(response.errors.len(), 1);
}

#[tokio::test]
async fn union_fragments_select_per_element() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("pets", "[Pet]")))
            .register(
                UnionType::new("Pet")
                    .possible_type("Cat")
                    .possible_type("Dog"),
            )
            .register(ObjectType::new("Cat").field(MetaField::new("meows", "Boolean")))
            .register(ObjectType::new("Dog").field(MetaField::new("barks", "Boolean"))),
    );
    let response = schema
        .execute(
            Request::new("{ pets { ... on Cat { meows } ... on Dog { barks } } }").root_value(
                value!({
                    "pets": [
                        {"__typename": "Cat", "meows": true},
                        {"__typename": "Dog", "barks": false},
                    ],
                }),
            ),
        )
        .await;
    assert_data(
        &response,
        value!({"pets": [{"meows": true}, {"barks": false}]}),
    );
}

#[tokio::test]
async fn union_resolving_outside_the_possible_set_is_an_error() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("pets", "[Pet]")))
            .register(UnionType::new("Pet").possible_type("Cat"))
            .register(ObjectType::new("Cat").field(MetaField::new("meows", "Boolean"))),
    );
    let response = schema
        .execute(
            Request::new("{ pets { ... on Cat { meows } } }")
                .root_value(value!({"pets": [{"__typename": "Query"}]})),
        )
        .await;
    assert_eq!(response.data, value!({"pets": [null]}));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        r#"Abstract type "Pet" resolved to "Query", which is not a possible type."#
    );
}

#[tokio::test]
async fn interface_fragments_see_the_concrete_type() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("named", "Named")))
            .register(InterfaceType::new("Named").field(MetaField::new("name", "String")))
            .register(
                ObjectType::new("Cat")
                    .implement("Named")
                    .field(MetaField::new("name", "String"))
                    .field(MetaField::new("meows", "Boolean")),
            ),
    );
    let response = schema
        .execute(
            Request::new("{ named { name ... on Cat { meows } } }").root_value(
                value!({"named": {"__typename": "Cat", "name": "Whiskers", "meows": true}}),
            ),
        )
        .await;
    assert_data(
        &response,
        value!({"named": {"name": "Whiskers", "meows": true}}),
    );
}

#[tokio::test]
async fn installed_type_resolver_overrides_typename() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("pet", "Pet")))
            .register(
                UnionType::new("Pet")
                    .possible_type("Cat")
                    .possible_type("Dog")
                    .resolve_type(|value| match value {
                        ConstValue::Object(object) => {
                            let key = async_graphql_value::Name::new("meows");
                            Some(if object.contains_key(&key) { "Cat" } else { "Dog" }.to_string())
                        }
                        _ => None,
                    }),
            )
            .register(ObjectType::new("Cat").field(MetaField::new("meows", "Boolean")))
            .register(ObjectType::new("Dog").field(MetaField::new("barks", "Boolean"))),
    );
    let response = schema
        .execute(
            Request::new("{ pet { ... on Cat { meows } ... on Dog { barks } } }")
                .root_value(value!({"pet": {"meows": true}})),
        )
        .await;
    assert_data(&response, value!({"pet": {"meows": true}}));
}

#[tokio::test]
async fn variable_coercion_feeds_arguments() {
    let registry = Registry::new("Query").register(
        ObjectType::new("Query").field(
            MetaField::new("double", "Int")
                .argument(MetaInputValue::new("x", "Int!"))
                .resolve(|ctx| match ctx.arg("x") {
                    Some(ConstValue::Number(n)) => {
                        let x = n.as_i64().unwrap_or_default();
                        Ok(value!(x * 2))
                    }
                    _ => Err(Error::new("missing argument x")),
                }),
        ),
    );
    let schema = schema(registry);

    let response = schema
        .execute(
            Request::new("query($n: Int!) { double(x: $n) }")
                .variables(Variables::from_json(serde_json::json!({"n": 5}))),
        )
        .await;
    assert_data(&response, value!({"double": 10}));
}

#[tokio::test]
async fn string_input_for_an_int_variable_fails_with_its_path() {
    let schema = schema(
        Registry::new("Query").register(
            ObjectType::new("Query").field(
                MetaField::new("double", "Int").argument(MetaInputValue::new("x", "Int!")),
            ),
        ),
    );
    let response = schema
        .execute(
            Request::new("query($n: Int!) { double(x: $n) }")
                .variables(Variables::from_json(serde_json::json!({"n": "5"}))),
        )
        .await;
    assert_eq!(response.data, ConstValue::Null);
    assert_eq!(response.errors.len(), 1);
    assert!(
        response.errors[0].message.ends_with("for n"),
        "{}",
        response.errors[0].message
    );
    assert!(!response.errors[0].locations.is_empty());
}

#[tokio::test]
async fn absent_variable_takes_the_default_literal() {
    let schema = schema(
        Registry::new("Query").register(
            ObjectType::new("Query").field(
                MetaField::new("echo", "String")
                    .argument(MetaInputValue::new("msg", "String"))
                    .resolve(|ctx| Ok(ctx.arg("msg").cloned().unwrap_or(ConstValue::Null))),
            ),
        ),
    );
    let response = schema
        .execute(Request::new(
            r#"query($greeting: String = "hi") { echo(msg: $greeting) }"#,
        ))
        .await;
    assert_data(&response, value!({"echo": "hi"}));
}

#[tokio::test]
async fn argument_defaults_apply_when_absent() {
    let schema = schema(
        Registry::new("Query").register(
            ObjectType::new("Query").field(
                MetaField::new("echo", "String")
                    .argument(
                        MetaInputValue::new("msg", "String").default_value(value!("fallback")),
                    )
                    .resolve(|ctx| Ok(ctx.arg("msg").cloned().unwrap_or(ConstValue::Null))),
            ),
        ),
    );
    let response = schema.execute(Request::new("{ echo }")).await;
    assert_data(&response, value!({"echo": "fallback"}));
}

#[tokio::test]
async fn fragment_cycles_terminate() {
    let schema = schema(Registry::new("Query").register(
        ObjectType::new("Query")
            .field(MetaField::new("a", "String"))
            .field(MetaField::new("b", "String")),
    ));
    let response = schema
        .execute(
            Request::new("{ a ...loop } fragment loop on Query { b ...loop }")
                .root_value(value!({"a": "1", "b": "2"})),
        )
        .await;
    assert_data(&response, value!({"a": "1", "b": "2"}));
}

#[tokio::test]
async fn typename_resolves_without_a_schema_field() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("a", "String"))),
    );
    let response = schema
        .execute(Request::new("{ t: __typename a }").root_value(value!({"a": "ok"})))
        .await;
    assert_data(&response, value!({"t": "Query", "a": "ok"}));
}

#[tokio::test]
async fn undefined_fields_are_omitted_without_error() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("a", "String"))),
    );
    let response = schema
        .execute(Request::new("{ a ghost }").root_value(value!({"a": "ok"})))
        .await;
    assert_data(&response, value!({"a": "ok"}));
}

#[tokio::test]
async fn enums_serialize_as_their_member_names() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("episode", "Episode")))
            .register(EnumType::new("Episode").value("HOPE").value("JEDI")),
    );
    let response = schema
        .execute(Request::new("{ episode }").root_value(value!({"episode": "JEDI"})))
        .await;
    assert!(response.errors.is_empty());
    assert_eq!(
        response.data.into_json().unwrap(),
        serde_json::json!({"episode": "JEDI"})
    );
}

#[tokio::test]
async fn unknown_enum_members_are_field_errors() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("episode", "Episode")))
            .register(EnumType::new("Episode").value("HOPE")),
    );
    let response = schema
        .execute(Request::new("{ episode }").root_value(value!({"episode": "CLONES"})))
        .await;
    assert_eq!(response.data, value!({"episode": null}));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        r#""CLONES" is not a member of enum "Episode""#
    );
}

#[tokio::test]
async fn non_null_list_items_null_the_list_with_an_indexed_path() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("tags", "[String!]"))),
    );
    let response = schema
        .execute(Request::new("{ tags }").root_value(value!({"tags": ["one", null, "three"]})))
        .await;
    assert_eq!(response.data, value!({"tags": null}));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].path,
        vec![
            QueryPathSegment::Field("tags".into()),
            QueryPathSegment::Index(1),
        ]
    );
}

#[tokio::test]
async fn nullable_list_items_null_only_their_slot() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("pets", "[Pet]")))
            .register(UnionType::new("Pet").possible_type("Cat"))
            .register(ObjectType::new("Cat").field(MetaField::new("meows", "Boolean"))),
    );
    // The second element cannot be resolved to a possible type; only its
    // slot nulls out.
    let response = schema
        .execute(
            Request::new("{ pets { ... on Cat { meows } } }").root_value(value!({
                "pets": [
                    {"__typename": "Cat", "meows": true},
                    {"__typename": "Dog"},
                    {"__typename": "Cat", "meows": false},
                ],
            })),
        )
        .await;
    assert_eq!(
        response.data,
        value!({"pets": [{"meows": true}, null, {"meows": false}]})
    );
    assert_eq!(response.errors.len(), 1);
}

#[tokio::test]
async fn non_list_values_for_list_fields_are_errors() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("tags", "[String]"))),
    );
    let response = schema
        .execute(Request::new("{ tags }").root_value(value!({"tags": "oops"})))
        .await;
    assert_eq!(response.data, value!({"tags": null}));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Expected a list for field tags, found string."
    );
}

#[tokio::test]
async fn missing_mutation_root_is_an_error() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("a", "String"))),
    );
    let response = schema.execute(Request::new("mutation { x }")).await;
    assert_eq!(response.data, ConstValue::Null);
    assert_eq!(
        response.errors[0].message,
        "Schema is not configured for mutations."
    );
}

#[tokio::test]
async fn parse_errors_return_without_data() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("a", "String"))),
    );
    let response = schema.execute(Request::new("{ a")).await;
    assert_eq!(response.data, ConstValue::Null);
    assert!(!response.errors.is_empty());
}

#[tokio::test]
async fn property_lookup_uses_the_camel_case_converter() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("HomePlanet", "String"))),
    );
    let response = schema
        .execute(Request::new("{ HomePlanet }").root_value(value!({"homePlanet": "Tatooine"})))
        .await;
    assert_data(&response, value!({"HomePlanet": "Tatooine"}));
}

#[tokio::test]
async fn operation_metadata_lands_on_the_response() {
    let schema = schema(
        Registry::new("Query")
            .register(ObjectType::new("Query").field(MetaField::new("a", "String"))),
    );
    let response = schema
        .execute(
            Request::new("query First { a } query Second { a }")
                .with_operation_name("Second")
                .root_value(value!({"a": "ok"})),
        )
        .await;
    assert!(response.errors.is_empty());
    assert_eq!(response.operation_name.as_deref(), Some("Second"));
}
