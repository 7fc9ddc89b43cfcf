//! The schema registry: every named type the executor can resolve against,
//! with typed lookups over them.
//!
//! Registries are built programmatically, handed to
//! [`Schema::build`](crate::Schema::build), and frozen once the schema is
//! initialized; executions only ever read them.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_graphql_value::ConstValue;
use futures_util::future::BoxFuture;
use indexmap::{IndexMap, IndexSet};

use crate::{
    error::SchemaError,
    parser::types::OperationType,
    registry::resolvers::{AsyncResolver, SyncResolver},
    Result,
};

mod resolvers;
mod scalars;
mod type_names;

pub use resolvers::{
    CamelCaseFieldNameConverter, FieldMiddleware, FieldNameConverter, FieldResolver,
    PropertyFieldResolver, Resolver, ResolverContext, ResolverReturn,
};
pub use scalars::{PossibleScalar, ScalarCodec, ScalarParser};
pub use type_names::{is_nullable, MetaTypeName};

pub(crate) use resolvers::resolve_property;

/// Decides the concrete object type an abstract type's value belongs to.
pub type TypeResolverFn = Arc<dyn Fn(&ConstValue) -> Option<String> + Send + Sync>;

/// Accepts or rejects a raw value as an instance of an object type.
pub type IsTypeOfFn = Arc<dyn Fn(&ConstValue) -> bool + Send + Sync>;

/// An argument or input-object field definition.
#[derive(Debug, Clone)]
pub struct MetaInputValue {
    pub name: String,
    pub description: Option<String>,
    /// GraphQL type string, e.g. `"[Int!]!"`.
    pub ty: String,
    pub default_value: Option<ConstValue>,
}

impl MetaInputValue {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty: ty.into(),
            default_value: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: ConstValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// A field definition on an object or interface type.
#[derive(Clone)]
pub struct MetaField {
    pub name: String,
    pub description: Option<String>,
    pub args: IndexMap<String, MetaInputValue>,
    /// GraphQL type string of the return type.
    pub ty: String,
    pub resolver: Resolver,
    /// The property key the default resolver reads, produced by the schema's
    /// field-name converter during initialization.
    pub property_key: Option<String>,
}

impl MetaField {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            args: IndexMap::new(),
            ty: ty.into(),
            resolver: Resolver::Property,
            property_key: None,
        }
    }

    #[must_use]
    pub fn argument(mut self, argument: MetaInputValue) -> Self {
        self.args.insert(argument.name.clone(), argument);
        self
    }

    /// Install a custom resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.resolver = Resolver::Custom(resolver);
        self
    }

    /// Install a synchronous resolver from a plain function.
    #[must_use]
    pub fn resolve<F>(self, f: F) -> Self
    where
        F: Fn(ResolverContext<'_>) -> Result<ConstValue> + Send + Sync + 'static,
    {
        self.resolver(Arc::new(SyncResolver(f)))
    }

    /// Install an asynchronous resolver from a function returning a boxed
    /// future.
    #[must_use]
    pub fn resolve_async<F>(self, f: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> BoxFuture<'a, Result<ConstValue>>
            + Send
            + Sync
            + 'static,
    {
        self.resolver(Arc::new(AsyncResolver(f)))
    }
}

impl std::fmt::Debug for MetaField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaField")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub parser: ScalarParser,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parser: ScalarParser::default(),
        }
    }

    #[must_use]
    pub fn codec(mut self, codec: Arc<dyn ScalarCodec>) -> Self {
        self.parser = ScalarParser::Custom(codec);
        self
    }
}

#[derive(Clone)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, MetaField>,
    pub implements: IndexSet<String>,
    pub is_type_of: Option<IsTypeOfFn>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            implements: IndexSet::new(),
            is_type_of: None,
        }
    }

    #[must_use]
    pub fn field(mut self, field: MetaField) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn implement(mut self, interface: impl Into<String>) -> Self {
        self.implements.insert(interface.into());
        self
    }

    #[must_use]
    pub fn is_type_of(mut self, f: impl Fn(&ConstValue) -> bool + Send + Sync + 'static) -> Self {
        self.is_type_of = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("implements", &self.implements)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, MetaField>,
    /// Object types implementing the interface; completed from object
    /// `implements` declarations at schema initialization.
    pub possible_types: IndexSet<String>,
    pub resolve_type: Option<TypeResolverFn>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            possible_types: IndexSet::new(),
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn field(mut self, field: MetaField) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn resolve_type(
        mut self,
        f: impl Fn(&ConstValue) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceType")
            .field("name", &self.name)
            .field("possible_types", &self.possible_types)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub possible_types: IndexSet<String>,
    pub resolve_type: Option<TypeResolverFn>,
}

impl UnionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            possible_types: IndexSet::new(),
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn possible_type(mut self, name: impl Into<String>) -> Self {
        self.possible_types.insert(name.into());
        self
    }

    #[must_use]
    pub fn resolve_type(
        mut self,
        f: impl Fn(&ConstValue) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for UnionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionType")
            .field("name", &self.name)
            .field("possible_types", &self.possible_types)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct MetaEnumValue {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: IndexMap<String, MetaEnumValue>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn value(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.values.insert(
            name.clone(),
            MetaEnumValue {
                name,
                description: None,
            },
        );
        self
    }
}

#[derive(Debug, Clone)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub input_fields: IndexMap<String, MetaInputValue>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn input_field(mut self, field: MetaInputValue) -> Self {
        self.input_fields.insert(field.name.clone(), field);
        self
    }
}

/// A named type in the registry. Closed: the executor matches exhaustively.
#[derive(Debug, Clone)]
pub enum MetaType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl MetaType {
    pub fn name(&self) -> &str {
        match self {
            MetaType::Scalar(inner) => &inner.name,
            MetaType::Object(inner) => &inner.name,
            MetaType::Interface(inner) => &inner.name,
            MetaType::Union(inner) => &inner.name,
            MetaType::Enum(inner) => &inner.name,
            MetaType::InputObject(inner) => &inner.name,
        }
    }

    /// A field definition by name, for types that carry fields.
    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        match self {
            MetaType::Object(object) => object.fields.get(name),
            MetaType::Interface(interface) => interface.fields.get(name),
            _ => None,
        }
    }

    /// The possible-types set of an abstract type.
    pub fn possible_types(&self) -> Option<&IndexSet<String>> {
        match self {
            MetaType::Interface(interface) => Some(&interface.possible_types),
            MetaType::Union(union) => Some(&union.possible_types),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, MetaType::Interface(_) | MetaType::Union(_))
    }
}

macro_rules! meta_type_from {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(impl From<$ty> for MetaType {
            fn from(value: $ty) -> Self {
                MetaType::$variant(value)
            }
        })+
    };
}

meta_type_from! {
    Scalar => ScalarType,
    Object => ObjectType,
    Interface => InterfaceType,
    Union => UnionType,
    Enum => EnumType,
    InputObject => InputObjectType,
}

/// The registry itself: a name-keyed map of types plus the root operation
/// type names.
#[derive(Debug, Clone)]
pub struct Registry {
    pub types: IndexMap<String, MetaType>,
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    /// Object name → names of the interfaces it implements.
    pub implements: HashMap<String, IndexSet<String>>,
}

impl Registry {
    pub fn new(query_type: impl Into<String>) -> Self {
        let mut registry = Self {
            types: IndexMap::new(),
            query_type: query_type.into(),
            mutation_type: None,
            subscription_type: None,
            implements: HashMap::new(),
        };
        for scalar in ["String", "Int", "Float", "Boolean", "ID"] {
            registry.types.insert(
                scalar.to_string(),
                MetaType::Scalar(ScalarType::new(scalar)),
            );
        }
        registry
    }

    #[must_use]
    pub fn with_mutation(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_subscription(mut self, name: impl Into<String>) -> Self {
        self.subscription_type = Some(name.into());
        self
    }

    /// Register a type, replacing any previous type with the same name.
    #[must_use]
    pub fn register(mut self, ty: impl Into<MetaType>) -> Self {
        let ty = ty.into();
        self.types.insert(ty.name().to_string(), ty);
        self
    }

    pub fn lookup_type(&self, name: &str) -> Option<&MetaType> {
        self.types.get(MetaTypeName::concrete_typename(name))
    }

    /// The root type name of an operation kind, when the schema defines one.
    pub fn root_type_name(&self, operation_type: OperationType) -> Option<&str> {
        match operation_type {
            OperationType::Query => Some(self.query_type.as_str()),
            OperationType::Mutation => self.mutation_type.as_deref(),
            OperationType::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Whether `concrete` is a member of the abstract type `abstract_name`.
    pub fn is_possible_type(&self, abstract_name: &str, concrete: &str) -> bool {
        if let Some(possible) = self
            .lookup_type(abstract_name)
            .and_then(MetaType::possible_types)
        {
            if possible.contains(concrete) {
                return true;
            }
        }
        self.implements
            .get(concrete)
            .map(|interfaces| interfaces.contains(abstract_name))
            .unwrap_or(false)
    }

    /// Complete derived data and apply field middleware. Runs once, while
    /// the schema is being built.
    pub(crate) fn initialize(
        &mut self,
        converter: &dyn FieldNameConverter,
        middleware: &[FieldMiddleware],
    ) {
        // Interface membership comes from the objects' declarations.
        let mut memberships: Vec<(String, String)> = Vec::new();
        for ty in self.types.values() {
            if let MetaType::Object(object) = ty {
                for interface in &object.implements {
                    memberships.push((interface.clone(), object.name.clone()));
                }
            }
        }
        for (interface, object) in memberships {
            if let Some(MetaType::Interface(meta)) = self.types.get_mut(&interface) {
                meta.possible_types.insert(object.clone());
            }
            self.implements
                .entry(object)
                .or_default()
                .insert(interface);
        }

        for ty in self.types.values_mut() {
            let fields = match ty {
                MetaType::Object(object) => &mut object.fields,
                MetaType::Interface(interface) => &mut interface.fields,
                _ => continue,
            };
            for field in fields.values_mut() {
                let key = converter.convert(&field.name);
                field.property_key = (key != field.name).then_some(key);

                if !middleware.is_empty() {
                    let base: Arc<dyn FieldResolver> = match &field.resolver {
                        Resolver::Property => Arc::new(PropertyFieldResolver),
                        Resolver::Custom(resolver) => Arc::clone(resolver),
                    };
                    let wrapped = middleware.iter().fold(base, |acc, layer| layer(acc));
                    field.resolver = Resolver::Custom(wrapped);
                }
            }
        }
    }

    /// Check that the root operation types exist and are objects, and that
    /// every type referenced by a field or abstract member is registered.
    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        match self.types.get(&self.query_type) {
            None => return Err(SchemaError::MissingQueryRoot),
            Some(MetaType::Object(_)) => {}
            Some(_) => return Err(SchemaError::NotAnObjectType(self.query_type.clone())),
        }
        for root in [&self.mutation_type, &self.subscription_type]
            .into_iter()
            .flatten()
        {
            match self.types.get(root) {
                None => return Err(SchemaError::UnknownType(root.clone())),
                Some(MetaType::Object(_)) => {}
                Some(_) => return Err(SchemaError::NotAnObjectType(root.clone())),
            }
        }

        let mut referenced: HashSet<&str> = HashSet::new();
        for ty in self.types.values() {
            match ty {
                MetaType::Object(object) => {
                    for field in object.fields.values() {
                        referenced.insert(MetaTypeName::concrete_typename(&field.ty));
                        for arg in field.args.values() {
                            referenced.insert(MetaTypeName::concrete_typename(&arg.ty));
                        }
                    }
                }
                MetaType::Interface(interface) => {
                    for field in interface.fields.values() {
                        referenced.insert(MetaTypeName::concrete_typename(&field.ty));
                    }
                }
                MetaType::Union(union) => {
                    referenced.extend(union.possible_types.iter().map(String::as_str));
                }
                MetaType::InputObject(input) => {
                    for field in input.input_fields.values() {
                        referenced.insert(MetaTypeName::concrete_typename(&field.ty));
                    }
                }
                MetaType::Scalar(_) | MetaType::Enum(_) => {}
            }
        }
        for name in referenced {
            if !self.types.contains_key(name) {
                return Err(SchemaError::UnknownType(name.to_string()));
            }
        }
        Ok(())
    }
}

/// A short human-readable kind for a value, used in coercion errors.
pub(crate) fn value_kind(value: &ConstValue) -> &'static str {
    match value {
        ConstValue::Null => "null",
        ConstValue::Number(_) => "number",
        ConstValue::String(_) => "string",
        ConstValue::Boolean(_) => "boolean",
        ConstValue::Binary(_) => "binary",
        ConstValue::Enum(_) => "enum",
        ConstValue::List(_) => "list",
        ConstValue::Object(_) => "object",
    }
}
