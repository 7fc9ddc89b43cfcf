//! A dynamic, schema-driven GraphQL query execution engine.
//!
//! Given a parsed query document, a schema [`registry`], variable inputs
//! and an optional root value, [`Schema::execute`] produces the JSON-shaped
//! response tree defined by the GraphQL specification. Parsing is delegated
//! to `async-graphql-parser`; static validation and complexity analysis are
//! consumed through the traits in [`validation`].
//!
//! ```
//! use graphql_executor::{
//!     registry::{MetaField, ObjectType, Registry},
//!     Request, Schema,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let registry = Registry::new("Query")
//!     .register(ObjectType::new("Query").field(MetaField::new("hello", "String")));
//! let schema = Schema::new(registry).unwrap();
//!
//! let response = schema
//!     .execute(Request::new("{ hello }").root_value(graphql_executor::value!({
//!         "hello": "world",
//!     })))
//!     .await;
//! assert!(response.is_ok());
//! # }
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![recursion_limit = "256"]

pub mod context;
mod error;
pub mod extensions;
mod metrics;
mod query_path;
pub mod registry;
mod request;
mod response;
pub mod resolver_utils;
mod schema;
pub mod validation;
mod variables;

pub use async_graphql_parser as parser;
pub use async_graphql_value::{
    from_value, to_value, value, ConstValue as Value, Name, Number, Variables,
};

pub use context::{
    Context, ContextExt, ContextField, ContextSelectionSet, Data, FieldGroup, QueryEnv,
};
pub use error::{Error, Result, SchemaError, ServerError, ServerResult};
pub use extensions::ExecutionListener;
pub use metrics::{Metrics, MetricsSubject, PerfRecord, PerfRecords};
#[doc(no_inline)]
pub use parser::{Pos, Positioned};
pub use query_path::{QueryPath, QueryPathSegment};
pub use registry::{
    CamelCaseFieldNameConverter, EnumType, FieldMiddleware, FieldNameConverter, FieldResolver,
    InputObjectType, InterfaceType, MetaField, MetaInputValue, MetaType, ObjectType, Registry,
    Resolver, ResolverContext, ResolverReturn, ScalarCodec, ScalarType, UnionType,
};
pub use request::Request;
pub use response::Response;
pub use schema::{Schema, SchemaBuilder, SchemaEnv};
pub use validation::{
    ComplexityAnalyzer, ComplexityConfiguration, QueryValidator, ValidationResult,
};
