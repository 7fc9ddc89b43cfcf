//! Input coercion: turning AST literals and raw variable inputs into typed
//! runtime values.
//!
//! One type-string-driven walk serves both entry points; the mode decides
//! the edge rules (literal coercion ignores unknown input-object keys,
//! variable-input coercion rejects them and insists scalars parse).

use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use crate::{
    context::{Context, ContextExt, ContextField},
    registry::{MetaType, MetaTypeName, Registry},
    Error, ServerResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoercionMode {
    /// AST literals: arguments, default values.
    Literal,
    /// Raw variable inputs supplied by the caller.
    Input,
}

enum PathSegment<'a> {
    Name(&'a str),
    Index(usize),
}

/// A stack-allocated linked list tracking the input path for error
/// messages.
struct PathNode<'a> {
    segment: PathSegment<'a>,
    previous: Option<&'a PathNode<'a>>,
}

impl<'a> PathNode<'a> {
    fn new(name: &'a str) -> PathNode<'a> {
        PathNode {
            segment: PathSegment::Name(name),
            previous: None,
        }
    }

    fn with_name(&'a self, name: &'a str) -> PathNode<'a> {
        PathNode {
            segment: PathSegment::Name(name),
            previous: Some(self),
        }
    }

    fn with_index(&'a self, index: usize) -> PathNode<'a> {
        PathNode {
            segment: PathSegment::Index(index),
            previous: Some(self),
        }
    }

    fn render(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current {
            segments.push(&node.segment);
            current = node.previous;
        }
        segments.reverse();

        let mut out = String::new();
        for segment in segments {
            match segment {
                PathSegment::Name(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

struct Coercer<'a> {
    registry: &'a Registry,
    mode: CoercionMode,
}

impl Coercer<'_> {
    fn error(&self, path: &PathNode<'_>, expected: &str) -> Error {
        Error::new(format!("{expected} for {}", path.render()))
    }

    fn maybe_absent(
        &self,
        path: &PathNode<'_>,
        ty: &str,
        default_value: Option<&ConstValue>,
        value: Option<ConstValue>,
    ) -> Result<Option<ConstValue>, Error> {
        let value = match (self.mode, value) {
            // A literal that is absent, or that coerced to null, takes the
            // default when one exists.
            (CoercionMode::Literal, Some(ConstValue::Null)) => {
                Some(default_value.cloned().unwrap_or(ConstValue::Null))
            }
            (_, None) => default_value.cloned(),
            (_, value) => value,
        };

        match value {
            Some(value) => self.present(path, ty, true, value).map(Some),
            None => match MetaTypeName::create(ty) {
                MetaTypeName::NonNull(_) => Err(self.error(path, "Unexpected null value")),
                _ => Ok(None),
            },
        }
    }

    fn present(
        &self,
        path: &PathNode<'_>,
        ty: &str,
        allow_list_coercion: bool,
        value: ConstValue,
    ) -> Result<ConstValue, Error> {
        match MetaTypeName::create(ty) {
            MetaTypeName::NonNull(inner) => {
                if matches!(value, ConstValue::Null) {
                    return Err(self.error(path, "Unexpected null value"));
                }
                self.present(path, inner, allow_list_coercion, value)
            }
            MetaTypeName::List(inner) => match value {
                ConstValue::Null => Ok(ConstValue::Null),
                ConstValue::List(items) => {
                    // Element-wise coercion only applies one level deep:
                    // [[Int]] does not accept [1, 2, 3].
                    let allow = items.len() <= 1;
                    let mut out = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        let node = path.with_index(index);
                        out.push(self.present(&node, inner, allow, item)?);
                    }
                    Ok(ConstValue::List(out))
                }
                value if allow_list_coercion => Ok(ConstValue::List(vec![self.present(
                    path, inner, true, value,
                )?])),
                _ => Err(self.error(path, "Expected a List")),
            },
            MetaTypeName::Named(name) => {
                if matches!(value, ConstValue::Null) {
                    return Ok(ConstValue::Null);
                }
                let Some(meta) = self.registry.lookup_type(name) else {
                    return Err(self.error(path, &format!(r#"Unknown type "{name}""#)));
                };
                match meta {
                    MetaType::InputObject(input_object) => {
                        let ConstValue::Object(mut fields) = value else {
                            return Err(self.error(path, "Expected an Object"));
                        };
                        let mut out = IndexMap::with_capacity(fields.len());
                        for input in input_object.input_fields.values() {
                            let node = path.with_name(&input.name);
                            let field_value = fields.shift_remove(&Name::new(&input.name));
                            if let Some(coerced) = self.maybe_absent(
                                &node,
                                &input.ty,
                                input.default_value.as_ref(),
                                field_value,
                            )? {
                                out.insert(Name::new(&input.name), coerced);
                            }
                        }
                        // Unknown keys are rejected for variable inputs;
                        // literals had them rejected by validation already.
                        if self.mode == CoercionMode::Input {
                            if let Some(unknown) = fields.keys().next() {
                                return Err(
                                    self.error(path, &format!(r#"Unknown field "{unknown}""#))
                                );
                            }
                        }
                        Ok(ConstValue::Object(out))
                    }
                    MetaType::Enum(enum_type) => {
                        let member = match &value {
                            ConstValue::Enum(name) => name.as_str(),
                            ConstValue::String(string) => string.as_str(),
                            other => {
                                return Err(self.error(
                                    path,
                                    &format!(
                                        "Expected an enum, not a {}",
                                        crate::registry::value_kind(other)
                                    ),
                                ));
                            }
                        };
                        if enum_type.values.contains_key(member) {
                            Ok(ConstValue::Enum(Name::new(member)))
                        } else {
                            Err(self.error(path, &format!(r#"Unknown enum value "{member}""#)))
                        }
                    }
                    MetaType::Scalar(scalar) => {
                        let parsed = scalar
                            .parser
                            .parse(name, value)
                            .map_err(|err| self.error(path, &err.message))?;
                        if self.mode == CoercionMode::Input && matches!(parsed, ConstValue::Null) {
                            return Err(
                                self.error(path, &format!(r#"Invalid value for scalar "{name}""#))
                            );
                        }
                        Ok(parsed)
                    }
                    MetaType::Object(_) | MetaType::Interface(_) | MetaType::Union(_) => {
                        Err(self.error(path, &format!(r#""{name}" is not an input type"#)))
                    }
                }
            }
        }
    }
}

/// Coerce an AST literal (with variable references already substituted)
/// against `ty`, falling back to `default_value`. `None` means the value is
/// absent and the type admits that.
pub(crate) fn coerce_literal(
    registry: &Registry,
    name: &str,
    ty: &str,
    default_value: Option<&ConstValue>,
    value: Option<ConstValue>,
) -> Result<Option<ConstValue>, Error> {
    Coercer {
        registry,
        mode: CoercionMode::Literal,
    }
    .maybe_absent(&PathNode::new(name), ty, default_value, value)
}

/// Validate and coerce a raw variable input against `ty`. Absent nullable
/// inputs coerce to null.
pub(crate) fn coerce_variable_input(
    registry: &Registry,
    name: &str,
    ty: &str,
    value: Option<ConstValue>,
) -> Result<ConstValue, Error> {
    Coercer {
        registry,
        mode: CoercionMode::Input,
    }
    .maybe_absent(&PathNode::new(name), ty, None, value)
    .map(|value| value.unwrap_or(ConstValue::Null))
}

/// Coerce the canonical field's arguments against the field definition,
/// applying argument defaults.
pub(crate) fn coerce_arguments(ctx: &ContextField<'_>) -> ServerResult<IndexMap<Name, ConstValue>> {
    let field = ctx.field_def;
    let mut args = IndexMap::with_capacity(field.args.len());
    for (name, def) in &field.args {
        let ast = ctx.item().node.get_argument(name);
        let pos = ast.map(|value| value.pos).unwrap_or_else(|| ctx.pos());
        let value = match ast {
            Some(value) => Some(
                value
                    .node
                    .clone()
                    .into_const_with(|var| ServerResult::Ok(ctx.var_value_or_null(&var)))?,
            ),
            None => None,
        };
        let coerced =
            coerce_literal(ctx.registry(), name, &def.ty, def.default_value.as_ref(), value)
                .map_err(|err| err.into_server_error(pos))?;
        if let Some(value) = coerced {
            args.insert(Name::new(name), value);
        }
    }
    Ok(args)
}
