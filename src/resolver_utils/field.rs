//! Field dispatch and value completion.
//!
//! `resolve_field` drives one field group: argument coercion, resolver
//! invocation, then the type-directed completion of the raw value. Errors
//! are caught here when the field is nullable; non-null violations unwind
//! to the nearest nullable boundary.

use async_graphql_value::{ConstValue, Name};
use async_recursion::async_recursion;
use indexmap::IndexMap;

use crate::{
    context::{Context, ContextExt, ContextField},
    registry::{
        is_nullable, resolve_property, EnumType, MetaType, MetaTypeName, Resolver,
        ResolverContext, ResolverReturn, ScalarType,
    },
    Error, ServerError, ServerResult,
};

use super::{container::resolve_object_value, input_value::coerce_arguments, list::resolve_list};

/// Resolve one field group against `source` and complete the result.
pub(crate) async fn resolve_field(
    ctx: &ContextField<'_>,
    source: &ConstValue,
) -> ServerResult<ConstValue> {
    if ctx.query_env.cancellation.is_cancelled() {
        return Err(ServerError::new(
            "The operation was canceled.",
            Some(ctx.pos()),
        ));
    }

    let result = resolve_field_inner(ctx, source)
        .await
        .map_err(|error| ctx.set_error_path(error));

    match result {
        Ok(value) => Ok(value),
        Err(error) if is_nullable(&ctx.field_def.ty) => {
            ctx.add_error(error);
            Ok(ConstValue::Null)
        }
        // Propagate so an enclosing nullable field absorbs the violation.
        Err(error) => Err(error),
    }
}

async fn resolve_field_inner(
    ctx: &ContextField<'_>,
    source: &ConstValue,
) -> ServerResult<ConstValue> {
    let field = ctx.field_def;

    // Trivial scalar shortcut: no arguments, nullable scalar, default
    // resolver. Skips argument coercion and the completion walk.
    if let Some(scalar) = trivial_scalar(ctx) {
        let raw = resolve_property(source, field).map_err(|error| resolver_error(ctx, error))?;
        return scalar
            .parser
            .serialize(&scalar.name, raw)
            .map_err(|error| error.into_server_error(ctx.pos()));
    }

    let args = coerce_arguments(ctx)?;
    let raw = invoke_resolver(ctx, &args, source)
        .await
        .map_err(|error| resolver_error(ctx, error))?;
    complete_value(ctx, &field.ty, raw).await
}

fn trivial_scalar<'a>(ctx: &ContextField<'a>) -> Option<&'a ScalarType> {
    let field = ctx.field_def;
    if !field.args.is_empty() || !field.resolver.is_property() {
        return None;
    }
    match MetaTypeName::create(&field.ty) {
        MetaTypeName::Named(name) => match ctx.registry().lookup_type(name) {
            Some(MetaType::Scalar(scalar)) => Some(scalar),
            _ => None,
        },
        _ => None,
    }
}

async fn invoke_resolver(
    ctx: &ContextField<'_>,
    args: &IndexMap<Name, ConstValue>,
    source: &ConstValue,
) -> Result<ConstValue, Error> {
    let resolver = match &ctx.field_def.resolver {
        Resolver::Property => return resolve_property(source, ctx.field_def),
        Resolver::Custom(resolver) => resolver,
    };

    let resolver_ctx = ResolverContext {
        ctx,
        args,
        parent_value: source,
    };

    match resolver.resolve(resolver_ctx) {
        ResolverReturn::Ready(result) => result,
        ResolverReturn::Deferred(future) => {
            if resolver.run_threaded() && in_multi_thread_runtime() {
                let handle = tokio::runtime::Handle::current();
                tokio::task::block_in_place(move || handle.block_on(future))
            } else {
                future.await
            }
        }
    }
}

fn in_multi_thread_runtime() -> bool {
    tokio::runtime::Handle::try_current()
        .map(|handle| matches!(handle.runtime_flavor(), tokio::runtime::RuntimeFlavor::MultiThread))
        .unwrap_or(false)
}

/// A resolver failure, located at the group's canonical field. The cause is
/// only spelled out when the request exposes exceptions.
fn resolver_error(ctx: &ContextField<'_>, error: Error) -> ServerError {
    let name = &ctx.field_def.name;
    let message = if ctx.query_env.expose_exceptions {
        format!("Error trying to resolve {name}. Caused by: {}", error.message)
    } else {
        format!("Error trying to resolve {name}.")
    };
    ServerError {
        message,
        source: error.source,
        locations: vec![ctx.pos()],
        path: Vec::new(),
    }
}

/// Complete a resolved raw value against the type string `ty`.
#[async_recursion]
pub(crate) async fn complete_value(
    ctx: &ContextField<'_>,
    ty: &str,
    value: ConstValue,
) -> ServerResult<ConstValue> {
    match MetaTypeName::create(ty) {
        MetaTypeName::NonNull(inner) => {
            let completed = complete_value(ctx, inner, value).await?;
            if matches!(completed, ConstValue::Null) {
                tracing::warn!(
                    field = %ctx.field_def.name,
                    path = %ctx.path,
                    "expected a non-null value, found null"
                );
                Err(ctx.set_error_path(ServerError::new(
                    format!(
                        "Cannot return null for non-null type. Field: {}, Type: {ty}.",
                        ctx.field_def.name
                    ),
                    Some(ctx.pos()),
                )))
            } else {
                Ok(completed)
            }
        }
        _ if matches!(value, ConstValue::Null) => Ok(ConstValue::Null),
        MetaTypeName::List(inner) => match value {
            ConstValue::List(items) => resolve_list(ctx, inner, items).await,
            other => Err(ctx.set_error_path(ServerError::new(
                format!(
                    "Expected a list for field {}, found {}.",
                    ctx.field_def.name,
                    crate::registry::value_kind(&other)
                ),
                Some(ctx.pos()),
            ))),
        },
        MetaTypeName::Named(name) => {
            let Some(meta) = ctx.registry().lookup_type(name) else {
                return Err(ServerError::new(
                    format!(r#"Unknown type "{name}""#),
                    Some(ctx.pos()),
                ));
            };
            match meta {
                MetaType::Scalar(scalar) => scalar
                    .parser
                    .serialize(name, value)
                    .map_err(|error| ctx.set_error_path(error.into_server_error(ctx.pos()))),
                MetaType::Enum(enum_type) => serialize_enum(enum_type, value)
                    .map_err(|error| ctx.set_error_path(error.into_server_error(ctx.pos()))),
                MetaType::Object(_) => resolve_object_value(ctx, meta, &value).await,
                MetaType::Interface(_) | MetaType::Union(_) => {
                    match resolve_concrete_type(ctx, meta, &value)? {
                        Some(concrete) => resolve_object_value(ctx, concrete, &value).await,
                        None => Ok(ConstValue::Null),
                    }
                }
                MetaType::InputObject(_) => Err(ServerError::new(
                    format!(r#""{name}" is not an output type"#),
                    Some(ctx.pos()),
                )),
            }
        }
    }
}

/// Resolve the concrete object type of an abstract-typed value.
///
/// The installed discriminator wins; without one the value's `__typename`
/// property decides. An undecidable value completes to null; a type outside
/// the possible set is a type-mismatch error.
fn resolve_concrete_type<'a>(
    ctx: &ContextField<'a>,
    abstract_ty: &'a MetaType,
    value: &ConstValue,
) -> ServerResult<Option<&'a MetaType>> {
    let resolve_type = match abstract_ty {
        MetaType::Interface(interface) => interface.resolve_type.as_ref(),
        MetaType::Union(union) => union.resolve_type.as_ref(),
        _ => None,
    };

    let resolved = match resolve_type {
        Some(resolve) => resolve(value),
        None => match value {
            ConstValue::Object(object) => {
                object
                    .get(&Name::new("__typename"))
                    .and_then(|typename| match typename {
                        ConstValue::String(name) => Some(name.clone()),
                        _ => None,
                    })
            }
            _ => None,
        },
    };

    let Some(name) = resolved else {
        return Ok(None);
    };
    if !ctx.registry().is_possible_type(abstract_ty.name(), &name) {
        return Err(ctx.set_error_path(ServerError::new(
            format!(
                r#"Abstract type "{}" resolved to "{name}", which is not a possible type."#,
                abstract_ty.name()
            ),
            Some(ctx.pos()),
        )));
    }
    match ctx.registry().lookup_type(&name) {
        Some(meta) => Ok(Some(meta)),
        None => Err(ServerError::new(
            format!(r#"Unknown type "{name}""#),
            Some(ctx.pos()),
        )),
    }
}

fn serialize_enum(enum_type: &EnumType, value: ConstValue) -> Result<ConstValue, Error> {
    let member = match &value {
        ConstValue::Enum(name) => name.as_str(),
        ConstValue::String(string) => string.as_str(),
        other => {
            return Err(Error::new(format!(
                r#"Enum "{}" cannot represent a {}"#,
                enum_type.name,
                crate::registry::value_kind(other)
            )));
        }
    };
    if enum_type.values.contains_key(member) {
        Ok(ConstValue::Enum(Name::new(member)))
    } else {
        Err(Error::new(format!(
            r#""{member}" is not a member of enum "{}""#,
            enum_type.name
        )))
    }
}
