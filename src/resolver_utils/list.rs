//! List completion: every element completes against the inner type
//! concurrently, in order, with per-item nullability deciding whether an
//! element failure nulls the slot or fails the whole list.

use async_graphql_value::ConstValue;
use futures_util::future::try_join_all;

use crate::{
    context::{ContextExt, ContextField},
    registry::is_nullable,
    ServerResult,
};

use super::field::complete_value;

pub(crate) async fn resolve_list(
    ctx: &ContextField<'_>,
    inner_ty: &str,
    items: Vec<ConstValue>,
) -> ServerResult<ConstValue> {
    let nullable_items = is_nullable(inner_ty);

    let futures = items.into_iter().enumerate().map(|(index, item)| {
        let ctx_idx = ctx.with_index(index);
        async move {
            match complete_value(&ctx_idx, inner_ty, item).await {
                Ok(value) => Ok(value),
                Err(error) if nullable_items => {
                    ctx_idx.add_error(ctx_idx.set_error_path(error));
                    Ok(ConstValue::Null)
                }
                Err(error) => Err(error),
            }
        }
    });

    let children = try_join_all(futures).await?;
    Ok(ConstValue::List(children))
}
