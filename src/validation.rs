//! Seams for the external document validator and complexity analyzer.
//!
//! Static validation is not part of the executor; hosts install an
//! implementation of [`QueryValidator`] on the schema and the executor runs
//! it once per request, returning its errors verbatim.

use std::collections::HashMap;

use async_graphql_value::Name;
use serde::{Deserialize, Serialize};

use crate::{
    parser::types::{FragmentDefinition, OperationDefinition},
    registry::Registry,
    Positioned, ServerError,
};

/// The outcome of validating an operation against a schema.
#[derive(Debug, Default, Clone)]
pub struct ValidationResult {
    pub errors: Vec<ServerError>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn invalid(errors: Vec<ServerError>) -> Self {
        Self { errors }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A document validator installed on the schema.
pub trait QueryValidator: Send + Sync {
    fn validate(
        &self,
        registry: &Registry,
        operation: &Positioned<OperationDefinition>,
        fragments: &HashMap<Name, Positioned<FragmentDefinition>>,
    ) -> ValidationResult;
}

/// Limits handed through to the complexity analyzer. The executor does not
/// interpret them.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityConfiguration {
    pub max_complexity: Option<usize>,
    pub max_depth: Option<usize>,
    pub field_impact: Option<f64>,
}

/// A complexity analyzer installed on the schema, invoked only when the
/// request carries a [`ComplexityConfiguration`].
pub trait ComplexityAnalyzer: Send + Sync {
    fn analyze(
        &self,
        operation: &Positioned<OperationDefinition>,
        fragments: &HashMap<Name, Positioned<FragmentDefinition>>,
        configuration: &ComplexityConfiguration,
    ) -> Result<(), ServerError>;
}
