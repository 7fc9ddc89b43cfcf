use std::any::Any;
use std::fmt::{self, Debug, Formatter};

use async_graphql_value::{ConstValue, Variables};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    context::Data, parser::types::ExecutableDocument, validation::ComplexityConfiguration,
};

/// One GraphQL execution request.
///
/// Deserializable from the conventional wire shape (`query`,
/// `operationName`, `variables`); everything execution-specific — root
/// value, user data, cancellation — is attached through the builder
/// methods.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The query source of the request.
    #[serde(default)]
    pub query: String,

    /// The operation to execute; empty or absent selects the document's
    /// only operation.
    #[serde(default)]
    pub operation_name: Option<String>,

    /// Raw variable inputs.
    #[serde(default)]
    pub variables: Variables,

    /// A pre-parsed document. When set, `query` is ignored.
    #[serde(skip)]
    pub document: Option<ExecutableDocument>,

    /// The source value handed to top-level resolvers.
    #[serde(skip, default = "null_value")]
    pub root_value: ConstValue,

    /// Request-scoped data, readable by resolvers through the context.
    #[serde(skip)]
    pub data: Data,

    /// Cancellation signal polled during execution.
    #[serde(skip)]
    pub cancellation: CancellationToken,

    /// When set, the schema's complexity analyzer runs before validation.
    #[serde(skip)]
    pub complexity: Option<ComplexityConfiguration>,

    /// Include resolver failure causes in error messages.
    #[serde(skip)]
    pub expose_exceptions: bool,

    /// Record phase timings onto the response.
    #[serde(skip)]
    pub enable_metrics: bool,
}

fn null_value() -> ConstValue {
    ConstValue::Null
}

impl Request {
    /// Create a request from query source.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: Variables::default(),
            document: None,
            root_value: ConstValue::Null,
            data: Data::default(),
            cancellation: CancellationToken::new(),
            complexity: None,
            expose_exceptions: false,
            enable_metrics: false,
        }
    }

    /// Create a request from an already-parsed document.
    pub fn from_document(document: ExecutableDocument) -> Self {
        Self {
            document: Some(document),
            ..Self::new(String::new())
        }
    }

    #[must_use]
    pub fn with_operation_name(self, name: impl Into<String>) -> Self {
        Self {
            operation_name: Some(name.into()),
            ..self
        }
    }

    #[must_use]
    pub fn variables(self, variables: Variables) -> Self {
        Self { variables, ..self }
    }

    #[must_use]
    pub fn root_value(self, root_value: ConstValue) -> Self {
        Self { root_value, ..self }
    }

    /// Attach request-scoped data.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    #[must_use]
    pub fn cancellation_token(self, cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            ..self
        }
    }

    #[must_use]
    pub fn complexity_configuration(self, configuration: ComplexityConfiguration) -> Self {
        Self {
            complexity: Some(configuration),
            ..self
        }
    }

    #[must_use]
    pub fn expose_exceptions(self) -> Self {
        Self {
            expose_exceptions: true,
            ..self
        }
    }

    #[must_use]
    pub fn enable_metrics(self) -> Self {
        Self {
            enable_metrics: true,
            ..self
        }
    }
}

impl<T: Into<String>> From<T> for Request {
    fn from(query: T) -> Self {
        Self::new(query)
    }
}

impl Debug for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("operation_name", &self.operation_name)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}
