//! Execution context.
//!
//! A [`QueryEnv`] is built once per execution and shared by reference with
//! every resolution branch; [`ContextField`] is the borrowed, per-field view
//! handed to resolvers.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    ops::Deref,
    sync::{Arc, Mutex},
};

use async_graphql_value::{ConstValue, Name, Variables};
use fnv::FnvHashMap;
use tokio_util::sync::CancellationToken;

use crate::{
    metrics::Metrics,
    parser::types::{Field, FragmentDefinition, OperationDefinition, SelectionSet},
    query_path::QueryPath,
    registry::{MetaField, MetaType, Registry},
    schema::SchemaEnv,
    Error, Pos, Positioned, Result, ServerError,
};

/// Schema- and request-scoped data.
///
/// A type map: anything can be stored, resolvers retrieve by concrete type.
#[derive(Default)]
pub struct Data(FnvHashMap<TypeId, Box<dyn Any + Send + Sync>>);

impl Data {
    pub fn insert<D: Any + Send + Sync>(&mut self, data: D) {
        self.0.insert(TypeId::of::<D>(), Box::new(data));
    }

    pub(crate) fn get<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.0
            .get(&TypeId::of::<D>())
            .and_then(|boxed| boxed.downcast_ref::<D>())
    }
}

impl Debug for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Data").finish()
    }
}

#[doc(hidden)]
pub struct QueryEnvInner {
    pub operation_name: Option<String>,
    pub operation: Positioned<OperationDefinition>,
    pub fragments: HashMap<Name, Positioned<FragmentDefinition>>,
    pub variables: Variables,
    pub root_value: ConstValue,
    pub ctx_data: Arc<Data>,
    pub cancellation: CancellationToken,
    pub metrics: Metrics,
    pub expose_exceptions: bool,
    pub errors: Mutex<Vec<ServerError>>,
}

/// The per-execution environment, shared by every resolution branch.
#[derive(Clone)]
pub struct QueryEnv(Arc<QueryEnvInner>);

impl Deref for QueryEnv {
    type Target = QueryEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl QueryEnv {
    #[doc(hidden)]
    pub fn new(inner: QueryEnvInner) -> QueryEnv {
        QueryEnv(Arc::new(inner))
    }

    /// Append an error to the execution's error list.
    pub fn add_error(&self, error: ServerError) {
        self.errors.lock().unwrap().push(error);
    }

    pub(crate) fn take_errors(&self) -> Vec<ServerError> {
        std::mem::take(&mut *self.errors.lock().unwrap())
    }
}

/// The fields collected under one response key, in source order.
///
/// The first entry is canonical: its arguments and position drive coercion
/// and error reporting for the whole group.
#[derive(Debug, Clone)]
pub struct FieldGroup<'a>(pub Vec<&'a Positioned<Field>>);

impl<'a> FieldGroup<'a> {
    pub fn first(&self) -> &'a Positioned<Field> {
        self.0[0]
    }

    /// The selection sets of every field in the group, for sub-field
    /// collection.
    pub fn selection_sets(&self) -> Vec<&'a Positioned<SelectionSet>> {
        self.0.iter().map(|field| &field.node.selection_set).collect()
    }
}

/// Context for resolving a selection set against a concrete object type.
#[derive(Clone)]
pub struct ContextSelectionSet<'a> {
    /// The object type the selections are being resolved against.
    pub ty: &'a MetaType,
    pub path: QueryPath,
    pub schema_env: &'a SchemaEnv,
    pub query_env: &'a QueryEnv,
}

impl<'a> ContextSelectionSet<'a> {
    /// Enter a field of this selection set.
    pub fn with_field(
        &self,
        field_def: &'a MetaField,
        group: &'a FieldGroup<'a>,
        response_key: &str,
    ) -> ContextField<'a> {
        ContextField {
            parent_type: self.ty,
            field_def,
            group,
            path: self.path.child(response_key),
            schema_env: self.schema_env,
            query_env: self.query_env,
        }
    }
}

/// Context for resolving one field group. This is what resolvers see.
#[derive(Clone)]
pub struct ContextField<'a> {
    /// The concrete type the field was selected on.
    pub parent_type: &'a MetaType,
    /// The schema definition of the field.
    pub field_def: &'a MetaField,
    /// All AST fields sharing this response key.
    pub group: &'a FieldGroup<'a>,
    pub path: QueryPath,
    pub schema_env: &'a SchemaEnv,
    pub query_env: &'a QueryEnv,
}

impl<'a> ContextField<'a> {
    /// The canonical field node of the group.
    pub fn item(&self) -> &'a Positioned<Field> {
        self.group.first()
    }

    /// The canonical source position for errors on this field.
    pub fn pos(&self) -> Pos {
        self.item().pos
    }

    /// This context, one list index deeper.
    #[must_use]
    pub fn with_index(&self, index: usize) -> ContextField<'a> {
        ContextField {
            path: self.path.child_index(index),
            ..self.clone()
        }
    }

    /// Descend into this field's sub-selections against `ty`.
    #[must_use]
    pub fn selection_ctx(&self, ty: &'a MetaType) -> ContextSelectionSet<'a> {
        ContextSelectionSet {
            ty,
            path: self.path.clone(),
            schema_env: self.schema_env,
            query_env: self.query_env,
        }
    }
}

/// Accessors both context shapes share.
pub trait Context<'a> {
    fn path(&self) -> &QueryPath;
    fn query_env(&self) -> &'a QueryEnv;
    fn schema_env(&self) -> &'a SchemaEnv;

    fn registry(&self) -> &'a Registry {
        &self.schema_env().registry
    }
}

impl<'a> Context<'a> for ContextSelectionSet<'a> {
    fn path(&self) -> &QueryPath {
        &self.path
    }

    fn query_env(&self) -> &'a QueryEnv {
        self.query_env
    }

    fn schema_env(&self) -> &'a SchemaEnv {
        self.schema_env
    }
}

impl<'a> Context<'a> for ContextField<'a> {
    fn path(&self) -> &QueryPath {
        &self.path
    }

    fn query_env(&self) -> &'a QueryEnv {
        self.query_env
    }

    fn schema_env(&self) -> &'a SchemaEnv {
        self.schema_env
    }
}

/// Shared behaviour over [`ContextSelectionSet`] and [`ContextField`].
pub trait ContextExt<'a>: Context<'a> {
    /// Find a fragment definition by name.
    fn get_fragment(&self, name: &Name) -> Option<&'a Positioned<FragmentDefinition>> {
        self.query_env().fragments.get(name)
    }

    /// Locate `error` at the current response path, unless it already has
    /// one.
    fn set_error_path(&self, error: ServerError) -> ServerError {
        if !error.path.is_empty() {
            return error;
        }
        ServerError {
            path: self.path().iter().cloned().collect(),
            ..error
        }
    }

    /// Report a field error without aborting the execution.
    fn add_error(&self, error: ServerError) {
        self.query_env().add_error(error);
    }

    /// The bound value of a variable, falling back to the definition's
    /// default. Unbound variables resolve to null.
    fn var_value_or_null(&self, name: &str) -> ConstValue {
        self.query_env()
            .variables
            .get(&Name::new(name))
            .or_else(|| {
                self.query_env()
                    .operation
                    .node
                    .variable_definitions
                    .iter()
                    .find(|def| def.node.name.node == name)
                    .and_then(|def| def.node.default_value())
            })
            .cloned()
            .unwrap_or(ConstValue::Null)
    }

    /// Request- or schema-scoped data of type `D`.
    ///
    /// Request data wins when both carry the same type.
    fn data<D: Any + Send + Sync>(&self) -> Result<&'a D> {
        self.data_opt::<D>().ok_or_else(|| {
            Error::new(format!(
                "Data `{}` does not exist.",
                std::any::type_name::<D>()
            ))
        })
    }

    /// Request- or schema-scoped data of type `D`, or `None`.
    fn data_opt<D: Any + Send + Sync>(&self) -> Option<&'a D> {
        self.query_env()
            .ctx_data
            .get::<D>()
            .or_else(|| self.schema_env().data.get::<D>())
    }
}

impl<'a, T> ContextExt<'a> for T where T: Context<'a> + ?Sized {}
