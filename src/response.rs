use async_graphql_value::ConstValue;
use serde::Serialize;

use crate::{metrics::PerfRecords, parser::types::OperationType, ServerError};

/// The outcome of one execution: the response-shaped data tree plus any
/// errors collected along the way.
#[derive(Debug, Serialize)]
pub struct Response {
    /// Data of the query result; null when execution never started or a
    /// non-null violation reached the root.
    pub data: ConstValue,

    /// Errors, in append order. Omitted from the wire shape when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,

    /// Phase timings, present when the request enabled metrics.
    #[serde(skip)]
    pub perf: Option<PerfRecords>,

    /// The executed operation's name, when it had one.
    #[serde(skip)]
    pub operation_name: Option<String>,

    /// The executed operation's kind.
    #[serde(skip)]
    pub operation_type: Option<OperationType>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            data: ConstValue::Null,
            errors: Vec::new(),
            perf: None,
            operation_name: None,
            operation_type: None,
        }
    }
}

impl Response {
    /// A successful response carrying `data`.
    #[must_use]
    pub fn new(data: ConstValue) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// A response that failed before producing data.
    #[must_use]
    pub fn from_errors(errors: Vec<ServerError>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }

    /// `true` when no errors were recorded.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    #[inline]
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// The data, or the error list when any error was recorded.
    pub fn into_result(self) -> Result<ConstValue, Vec<ServerError>> {
        if self.is_err() {
            Err(self.errors)
        } else {
            Ok(self.data)
        }
    }
}
