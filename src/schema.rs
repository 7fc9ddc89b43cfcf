//! The executor: schema construction and the per-request execution
//! pipeline.

use std::{
    any::Any,
    ops::Deref,
    sync::{Arc, Mutex},
};

use async_graphql_value::ConstValue;
use tracing::Instrument;

use crate::{
    context::{ContextSelectionSet, Data, QueryEnv, QueryEnvInner},
    error::SchemaError,
    extensions::ExecutionListener,
    metrics::Metrics,
    parser::{
        parse_query,
        types::{
            DocumentOperations, ExecutableDocument, OperationDefinition, OperationType,
        },
    },
    query_path::QueryPath,
    registry::{CamelCaseFieldNameConverter, FieldMiddleware, FieldNameConverter, Registry},
    resolver_utils::resolve_container,
    validation::{ComplexityAnalyzer, QueryValidator, ValidationResult},
    variables::bind_variables,
    Name, Positioned, Request, Response, ServerError,
};

#[doc(hidden)]
pub struct SchemaEnvInner {
    pub registry: Registry,
    pub data: Data,
    pub(crate) validator: Option<Box<dyn QueryValidator>>,
    pub(crate) complexity_analyzer: Option<Box<dyn ComplexityAnalyzer>>,
    pub(crate) listeners: Vec<Arc<dyn ExecutionListener>>,
}

/// The schema-scoped environment shared by every execution.
#[derive(Clone)]
pub struct SchemaEnv(Arc<SchemaEnvInner>);

impl Deref for SchemaEnv {
    type Target = SchemaEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SchemaEnv {
    #[cfg(test)]
    pub(crate) fn for_tests(mut registry: Registry) -> Self {
        registry.initialize(&CamelCaseFieldNameConverter, &[]);
        SchemaEnv(Arc::new(SchemaEnvInner {
            registry,
            data: Data::default(),
            validator: None,
            complexity_analyzer: None,
            listeners: Vec::new(),
        }))
    }
}

/// Builder for a [`Schema`].
pub struct SchemaBuilder {
    registry: Registry,
    data: Data,
    validator: Option<Box<dyn QueryValidator>>,
    complexity_analyzer: Option<Box<dyn ComplexityAnalyzer>>,
    listeners: Vec<Arc<dyn ExecutionListener>>,
    field_middleware: Vec<FieldMiddleware>,
    field_name_converter: Box<dyn FieldNameConverter>,
}

impl SchemaBuilder {
    /// Attach schema-scoped data, readable by every resolver.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    /// Install the external document validator.
    #[must_use]
    pub fn validator(mut self, validator: impl QueryValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Install the external complexity analyzer.
    #[must_use]
    pub fn complexity_analyzer(mut self, analyzer: impl ComplexityAnalyzer + 'static) -> Self {
        self.complexity_analyzer = Some(Box::new(analyzer));
        self
    }

    /// Append an execution listener; listeners run in installation order.
    #[must_use]
    pub fn listener(mut self, listener: impl ExecutionListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Append a field middleware, applied to every resolver once when the
    /// schema initializes.
    #[must_use]
    pub fn field_middleware(mut self, middleware: FieldMiddleware) -> Self {
        self.field_middleware.push(middleware);
        self
    }

    /// Replace the field-name converter used by the default resolver.
    #[must_use]
    pub fn field_name_converter(mut self, converter: impl FieldNameConverter + 'static) -> Self {
        self.field_name_converter = Box::new(converter);
        self
    }

    /// Validate the registry and initialize it into an immutable schema.
    pub fn finish(mut self) -> Result<Schema, SchemaError> {
        let span = tracing::info_span!("schema");
        let _enter = span.enter();

        self.registry.validate()?;
        self.registry
            .initialize(self.field_name_converter.as_ref(), &self.field_middleware);

        Ok(Schema(SchemaEnv(Arc::new(SchemaEnvInner {
            registry: self.registry,
            data: self.data,
            validator: self.validator,
            complexity_analyzer: self.complexity_analyzer,
            listeners: self.listeners,
        }))))
    }
}

/// An executable GraphQL schema. Cheap to clone; immutable once built.
#[derive(Clone)]
pub struct Schema(SchemaEnv);

impl Schema {
    /// Start building a schema over `registry`.
    pub fn build(registry: Registry) -> SchemaBuilder {
        SchemaBuilder {
            registry,
            data: Data::default(),
            validator: None,
            complexity_analyzer: None,
            listeners: Vec::new(),
            field_middleware: Vec::new(),
            field_name_converter: Box::new(CamelCaseFieldNameConverter),
        }
    }

    /// Build a schema with no validator, listeners or middleware.
    pub fn new(registry: Registry) -> Result<Self, SchemaError> {
        Self::build(registry).finish()
    }

    pub fn registry(&self) -> &Registry {
        &self.0.registry
    }

    /// Execute a request to completion and return the response.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        let request = request.into();
        let metrics = if request.enable_metrics {
            Metrics::enabled()
        } else {
            Metrics::disabled()
        };

        let mut response = match self.execute_inner(request, &metrics).await {
            Ok(response) => response,
            Err(errors) => Response::from_errors(errors),
        };
        response.perf = metrics.finish();
        response
    }

    async fn execute_inner(
        &self,
        request: Request,
        metrics: &Metrics,
    ) -> Result<Response, Vec<ServerError>> {
        let Request {
            query,
            operation_name,
            variables: inputs,
            document,
            root_value,
            data,
            cancellation,
            complexity,
            expose_exceptions,
            enable_metrics: _,
        } = request;

        let document = match document {
            Some(document) => document,
            None => {
                let span = tracing::info_span!("document");
                let _enter = span.enter();
                let _subject = metrics.subject("document", "Building document");
                parse_query(&query).map_err(|error| vec![ServerError::from(error)])?
            }
        };

        let ExecutableDocument {
            operations,
            fragments,
        } = document;
        let (operation_name, operation) =
            select_operation(operations, operation_name.as_deref()).map_err(|error| vec![error])?;

        if let (Some(configuration), Some(analyzer)) = (&complexity, &self.0.complexity_analyzer) {
            let _subject = metrics.subject("analysis", "Analyzing complexity");
            analyzer
                .analyze(&operation, &fragments, configuration)
                .map_err(|error| vec![error])?;
        }

        let validation = {
            let span = tracing::info_span!("validation");
            let _enter = span.enter();
            let _subject = metrics.subject("document", "Validating document");
            match &self.0.validator {
                Some(validator) => validator.validate(&self.0.registry, &operation, &fragments),
                None => ValidationResult::valid(),
            }
        };
        for listener in &self.0.listeners {
            listener.after_validation(&validation).await;
        }
        if !validation.is_valid() {
            return Err(validation.errors);
        }

        let variables =
            bind_variables(&self.0.registry, &operation, &inputs).map_err(|error| vec![error])?;

        let env = QueryEnv::new(QueryEnvInner {
            operation_name,
            operation,
            fragments,
            variables,
            root_value,
            ctx_data: Arc::new(data),
            cancellation,
            metrics: metrics.clone(),
            expose_exceptions,
            errors: Mutex::new(Vec::new()),
        });

        let data = {
            let _subject = metrics.subject("execution", "Executing operation");
            let span = tracing::info_span!("execute");
            async {
                for listener in &self.0.listeners {
                    listener.before_execution(&env).await;
                }
                let root = self.execute_root(&env);
                for listener in &self.0.listeners {
                    listener.before_execution_awaited(&env).await;
                }
                let data = root.await;
                for listener in &self.0.listeners {
                    listener.after_execution(&env).await;
                }
                data
            }
            .instrument(span)
            .await
        };

        Ok(Response {
            data,
            errors: env.take_errors(),
            perf: None,
            operation_name: env.operation_name.clone(),
            operation_type: Some(env.operation.node.ty),
        })
    }

    async fn execute_root(&self, env: &QueryEnv) -> ConstValue {
        if env.cancellation.is_cancelled() {
            env.add_error(ServerError::new("The operation was canceled.", None));
            return ConstValue::Null;
        }

        let operation_type = env.operation.node.ty;
        let Some(root_name) = self.0.registry.root_type_name(operation_type) else {
            env.add_error(ServerError::new(
                format!("Schema is not configured for {operation_type}s."),
                None,
            ));
            return ConstValue::Null;
        };
        let Some(root_type) = self.0.registry.lookup_type(root_name) else {
            env.add_error(ServerError::new(
                format!(r#"Unknown type "{root_name}""#),
                None,
            ));
            return ConstValue::Null;
        };

        let ctx = ContextSelectionSet {
            ty: root_type,
            path: QueryPath::empty(),
            schema_env: &self.0,
            query_env: env,
        };
        let selection_sets = [&env.operation.node.selection_set];
        // Mutation root fields run serially; everything else may fan out.
        let parallel = operation_type != OperationType::Mutation;

        match resolve_container(&ctx, &selection_sets, &env.root_value, parallel).await {
            Ok(data) => data,
            Err(error) => {
                env.add_error(error);
                ConstValue::Null
            }
        }
    }
}

/// Pick the operation to execute: by name when one was given, otherwise the
/// document's only operation.
fn select_operation(
    operations: DocumentOperations,
    operation_name: Option<&str>,
) -> Result<(Option<String>, Positioned<OperationDefinition>), ServerError> {
    let operation_name = operation_name.filter(|name| !name.is_empty());
    match (operation_name, operations) {
        (Some(name), DocumentOperations::Multiple(mut operations)) => operations
            .remove(&Name::new(name))
            .map(|operation| (Some(name.to_string()), operation))
            .ok_or_else(|| {
                ServerError::new(format!(r#"Unknown operation named "{name}"."#), None)
            }),
        (Some(name), DocumentOperations::Single(_)) => Err(ServerError::new(
            format!(r#"Unknown operation named "{name}"."#),
            None,
        )),
        (None, DocumentOperations::Single(operation)) => Ok((None, operation)),
        (None, DocumentOperations::Multiple(operations)) => {
            let mut operations = operations.into_iter();
            match (operations.next(), operations.next()) {
                (Some((name, operation)), None) => Ok((Some(name.to_string()), operation)),
                _ => Err(ServerError::new("Operation name required in request.", None)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_query;

    use super::*;

    #[test]
    fn unknown_operation_name_is_an_error() {
        let document = parse_query("query A { a } query B { b }").unwrap();
        let err = select_operation(document.operations, Some("C")).unwrap_err();
        assert_eq!(err.message, r#"Unknown operation named "C"."#);
    }

    #[test]
    fn missing_name_with_several_operations_is_an_error() {
        let document = parse_query("query A { a } query B { b }").unwrap();
        let err = select_operation(document.operations, None).unwrap_err();
        assert_eq!(err.message, "Operation name required in request.");
    }

    #[test]
    fn empty_name_selects_the_only_operation() {
        let document = parse_query("query Only { a }").unwrap();
        let (name, _) = select_operation(document.operations, Some("")).unwrap();
        assert_eq!(name.as_deref(), Some("Only"));
    }
}
