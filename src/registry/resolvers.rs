use std::sync::Arc;

use async_graphql_value::{ConstValue, Name};
use futures_util::future::BoxFuture;
use indexmap::IndexMap;

use crate::{context::ContextField, Error, Result};

use super::MetaField;

/// Everything a resolver gets to see: the field context plus the coerced
/// arguments and the parent object's resolved value.
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    /// The per-field execution context (field AST, definition, parent type,
    /// path, schema and query environments).
    pub ctx: &'a ContextField<'a>,
    /// Arguments of the field, coerced against the argument definitions.
    pub args: &'a IndexMap<Name, ConstValue>,
    /// The value the parent resolver produced for this subtree.
    pub parent_value: &'a ConstValue,
}

impl<'a> ResolverContext<'a> {
    /// An argument by name, when present after coercion.
    pub fn arg(&self, name: &str) -> Option<&'a ConstValue> {
        self.args.get(&Name::new(name))
    }
}

/// What a resolver hands back: either an immediately available value or a
/// computation to await. The dispatcher branches on this exactly once.
pub enum ResolverReturn<'a> {
    Ready(Result<ConstValue>),
    Deferred(BoxFuture<'a, Result<ConstValue>>),
}

/// A field resolver installed on a [`MetaField`](super::MetaField).
pub trait FieldResolver: Send + Sync {
    fn resolve<'a>(&'a self, ctx: ResolverContext<'a>) -> ResolverReturn<'a>;

    /// Advisory hint that this resolver performs heavy blocking work and
    /// would rather run on a worker than inline on the cooperative
    /// scheduler.
    fn run_threaded(&self) -> bool {
        false
    }
}

/// How a field obtains its raw value.
#[derive(Clone, Default)]
pub enum Resolver {
    /// Read the matching property off the parent object value.
    #[default]
    Property,
    /// A host-installed resolver.
    Custom(Arc<dyn FieldResolver>),
}

impl Resolver {
    pub fn is_property(&self) -> bool {
        matches!(self, Resolver::Property)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolver::Property => f.write_str("Property"),
            Resolver::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Wraps a resolver with cross-cutting behaviour once, while the schema is
/// being initialized.
pub type FieldMiddleware =
    Arc<dyn Fn(Arc<dyn FieldResolver>) -> Arc<dyn FieldResolver> + Send + Sync>;

/// Maps a schema field name to the property key the default resolver reads
/// off source objects.
pub trait FieldNameConverter: Send + Sync {
    fn convert(&self, field_name: &str) -> String;
}

/// The default converter: field names map to lower-camel-case property
/// keys.
pub struct CamelCaseFieldNameConverter;

impl FieldNameConverter for CamelCaseFieldNameConverter {
    fn convert(&self, field_name: &str) -> String {
        let mut chars = field_name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Read the property backing `field` off the parent object value.
///
/// Tries the field name, then the property key the converter produced at
/// schema initialization, then a case-insensitive scan. A null source
/// resolves to null; anything else without a matching property is a
/// resolver error.
pub fn resolve_property(source: &ConstValue, field: &MetaField) -> Result<ConstValue> {
    let object = match source {
        ConstValue::Null => return Ok(ConstValue::Null),
        ConstValue::Object(object) => object,
        other => {
            return Err(Error::new(format!(
                r#"Cannot read property "{}" from a source value of kind {}"#,
                field.name,
                super::value_kind(other)
            )));
        }
    };

    if let Some(value) = object.get(&Name::new(&field.name)) {
        return Ok(value.clone());
    }
    if let Some(key) = &field.property_key {
        if let Some(value) = object.get(&Name::new(key)) {
            return Ok(value.clone());
        }
    }
    if let Some((_, value)) = object
        .iter()
        .find(|(key, _)| key.as_str().eq_ignore_ascii_case(&field.name))
    {
        return Ok(value.clone());
    }

    Err(Error::new(format!(
        r#"Expected to find a property named "{}" on the source value"#,
        field.name
    )))
}

/// The property lookup packaged as a [`FieldResolver`], so field middleware
/// can wrap default-resolved fields the same way it wraps custom ones.
pub struct PropertyFieldResolver;

impl FieldResolver for PropertyFieldResolver {
    fn resolve<'a>(&'a self, ctx: ResolverContext<'a>) -> ResolverReturn<'a> {
        ResolverReturn::Ready(resolve_property(ctx.parent_value, ctx.ctx.field_def))
    }
}

/// A resolver built from a plain function returning a ready value.
pub(crate) struct SyncResolver<F>(pub F);

impl<F> FieldResolver for SyncResolver<F>
where
    F: Fn(ResolverContext<'_>) -> Result<ConstValue> + Send + Sync,
{
    fn resolve<'a>(&'a self, ctx: ResolverContext<'a>) -> ResolverReturn<'a> {
        ResolverReturn::Ready((self.0)(ctx))
    }
}

/// A resolver built from a function returning a boxed future.
pub(crate) struct AsyncResolver<F>(pub F);

impl<F> FieldResolver for AsyncResolver<F>
where
    F: for<'a> Fn(ResolverContext<'a>) -> BoxFuture<'a, Result<ConstValue>> + Send + Sync,
{
    fn resolve<'a>(&'a self, ctx: ResolverContext<'a>) -> ResolverReturn<'a> {
        ResolverReturn::Deferred((self.0)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use async_graphql_value::value;

    use super::*;

    fn field(name: &str) -> MetaField {
        MetaField::new(name, "String")
    }

    #[test]
    fn property_lookup_prefers_the_exact_key() {
        let source = value!({"name": "exact", "Name": "other"});
        assert_eq!(
            resolve_property(&source, &field("name")).unwrap(),
            value!("exact")
        );
    }

    #[test]
    fn property_lookup_falls_back_to_the_converted_key() {
        let mut meta = field("HomePlanet");
        meta.property_key = Some("homePlanet".to_string());
        let source = value!({"homePlanet": "Tatooine"});
        assert_eq!(
            resolve_property(&source, &meta).unwrap(),
            value!("Tatooine")
        );
    }

    #[test]
    fn property_lookup_is_case_insensitive_last() {
        let source = value!({"NAME": "shouty"});
        assert_eq!(
            resolve_property(&source, &field("name")).unwrap(),
            value!("shouty")
        );
    }

    #[test]
    fn null_source_resolves_to_null() {
        assert_eq!(
            resolve_property(&ConstValue::Null, &field("name")).unwrap(),
            ConstValue::Null
        );
    }

    #[test]
    fn missing_property_is_an_error() {
        let err = resolve_property(&value!({}), &field("name")).unwrap_err();
        assert_eq!(
            err.message,
            r#"Expected to find a property named "name" on the source value"#
        );
    }

    #[test]
    fn camel_case_converter_lowers_the_first_letter() {
        let converter = CamelCaseFieldNameConverter;
        assert_eq!(converter.convert("HomePlanet"), "homePlanet");
        assert_eq!(converter.convert("name"), "name");
    }
}
