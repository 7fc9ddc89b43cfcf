//! Selection-set flattening and object resolution.
//!
//! `collect_fields` turns a selection set into an ordered map of response
//! key → field group, spreading fragments and applying `@skip`/`@include`;
//! `resolve_container` executes the collected groups against a source value.

use std::collections::HashSet;

use async_graphql_value::{ConstValue, Name};
use futures_util::future::try_join_all;
use indexmap::IndexMap;

use crate::{
    context::{Context, ContextExt, ContextSelectionSet, FieldGroup},
    parser::types::{Directive, Selection, SelectionSet},
    registry::MetaType,
    Positioned, ServerError, ServerResult,
};

use super::resolve_field;

/// Flatten `selection_sets` against the concrete type of `ctx` into an
/// ordered response map.
///
/// Keys appear in first-encounter order; later occurrences of a key append
/// to its group without reordering. The visited set spans the whole
/// flattening, so fragment cycles terminate.
pub fn collect_fields<'a>(
    ctx: &ContextSelectionSet<'a>,
    selection_sets: &[&'a Positioned<SelectionSet>],
) -> ServerResult<IndexMap<Name, FieldGroup<'a>>> {
    let mut fields = IndexMap::new();
    let mut visited = HashSet::new();
    for selection_set in selection_sets {
        collect_into(ctx, selection_set, &mut fields, &mut visited)?;
    }
    Ok(fields)
}

fn collect_into<'a>(
    ctx: &ContextSelectionSet<'a>,
    selection_set: &'a Positioned<SelectionSet>,
    fields: &mut IndexMap<Name, FieldGroup<'a>>,
    visited: &mut HashSet<Name>,
) -> ServerResult<()> {
    for selection in &selection_set.node.items {
        match &selection.node {
            Selection::Field(field) => {
                if is_excluded(ctx, &field.node.directives)? {
                    continue;
                }
                let key = field.node.response_key().node.clone();
                fields
                    .entry(key)
                    .or_insert_with(|| FieldGroup(Vec::new()))
                    .0
                    .push(field);
            }
            Selection::FragmentSpread(spread) => {
                let name = &spread.node.fragment_name.node;
                if visited.contains(name) {
                    continue;
                }
                if is_excluded(ctx, &spread.node.directives)? {
                    continue;
                }
                visited.insert(name.clone());
                let Some(fragment) = ctx.get_fragment(name) else {
                    continue;
                };
                if is_excluded(ctx, &fragment.node.directives)? {
                    continue;
                }
                if !condition_matches(
                    ctx,
                    Some(fragment.node.type_condition.node.on.node.as_str()),
                ) {
                    continue;
                }
                collect_into(ctx, &fragment.node.selection_set, fields, visited)?;
            }
            Selection::InlineFragment(inline) => {
                if is_excluded(ctx, &inline.node.directives)? {
                    continue;
                }
                let condition = inline
                    .node
                    .type_condition
                    .as_ref()
                    .map(|condition| condition.node.on.node.as_str());
                if !condition_matches(ctx, condition) {
                    continue;
                }
                collect_into(ctx, &inline.node.selection_set, fields, visited)?;
            }
        }
    }
    Ok(())
}

/// Whether a fragment's type condition admits the current concrete type:
/// no condition, the type itself, or an abstract type it belongs to.
fn condition_matches(ctx: &ContextSelectionSet<'_>, condition: Option<&str>) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    let concrete = ctx.ty.name();
    condition == concrete || ctx.registry().is_possible_type(condition, concrete)
}

/// Evaluate `@skip`/`@include` on a node. Either directive excluding the
/// node suppresses it.
fn is_excluded(
    ctx: &ContextSelectionSet<'_>,
    directives: &[Positioned<Directive>],
) -> ServerResult<bool> {
    for directive in directives {
        let exclude_when = match directive.node.name.node.as_str() {
            "skip" => true,
            "include" => false,
            _ => continue,
        };
        let condition = match directive.node.get_argument("if") {
            Some(value) => {
                let resolved = value
                    .node
                    .clone()
                    .into_const_with(|name| ServerResult::Ok(ctx.var_value_or_null(&name)))?;
                match resolved {
                    ConstValue::Boolean(condition) => condition,
                    // An unbound variable behaves like an absent argument.
                    ConstValue::Null => false,
                    other => {
                        return Err(ServerError::new(
                            format!(
                                r#"Expected a Boolean for the "if" argument of @{}, found {}."#,
                                directive.node.name.node,
                                crate::registry::value_kind(&other)
                            ),
                            Some(directive.pos),
                        ));
                    }
                }
            }
            None => false,
        };
        if condition == exclude_when {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resolve the union of `selection_sets` against `source`, one future per
/// field group.
///
/// Response keys keep their first-encounter order regardless of which
/// sibling finishes first; `parallel` is false for mutation roots, which
/// run their fields serially.
pub(crate) async fn resolve_container<'a>(
    ctx: &ContextSelectionSet<'a>,
    selection_sets: &[&'a Positioned<SelectionSet>],
    source: &ConstValue,
    parallel: bool,
) -> ServerResult<ConstValue> {
    let groups = collect_fields(ctx, selection_sets)?;

    let futures = groups.iter().map(|(key, group)| async move {
        let first = group.first();

        if ctx.query_env.cancellation.is_cancelled() {
            return Err(ServerError::new(
                "The operation was canceled.",
                Some(first.pos),
            ));
        }

        if first.node.name.node == "__typename" {
            let typename = ConstValue::String(ctx.ty.name().to_string());
            return Ok(Some((key.clone(), typename)));
        }

        let Some(field_def) = ctx.ty.field_by_name(&first.node.name.node) else {
            // The schema does not define this field: the key is omitted.
            return Ok(None);
        };

        let ctx_field = ctx.with_field(field_def, group, key.as_str());
        let value = resolve_field(&ctx_field, source).await?;
        Ok(Some((key.clone(), value)))
    });

    let resolved = if parallel {
        try_join_all(futures).await?
    } else {
        let mut resolved = Vec::with_capacity(groups.len());
        for future in futures {
            resolved.push(future.await?);
        }
        resolved
    };

    let mut map = IndexMap::new();
    for (name, value) in resolved.into_iter().flatten() {
        map.insert(name, value);
    }
    Ok(ConstValue::Object(map))
}

/// Gate a raw value through the object's `is_type_of` predicate, collect
/// the group's sub-selections and execute them against it.
pub(crate) async fn resolve_object_value(
    ctx: &crate::context::ContextField<'_>,
    ty: &MetaType,
    value: &ConstValue,
) -> ServerResult<ConstValue> {
    if let MetaType::Object(object) = ty {
        if let Some(is_type_of) = &object.is_type_of {
            if !is_type_of(value) {
                return Err(ctx.set_error_path(ServerError::new(
                    format!(
                        r#"Runtime value is not of the expected type "{}"."#,
                        object.name
                    ),
                    Some(ctx.pos()),
                )));
            }
        }
    }

    let selection_sets = ctx.group.selection_sets();
    let selection_ctx = ctx.selection_ctx(ty);
    resolve_container(&selection_ctx, &selection_sets, value, true).await
}
