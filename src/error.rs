use std::{
    any::Any,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use serde::{Serialize, Serializer};

use crate::{query_path::QueryPathSegment, Pos};

/// An error produced inside a resolver, before it has been located in the
/// query.
///
/// Carries a message and an optional type-erased source so hosts can
/// downcast the underlying failure. Converted into a [`ServerError`] with
/// [`Error::into_server_error`] once the triggering AST position is known.
#[derive(Clone)]
pub struct Error {
    /// The error message.
    pub message: String,
    /// The source of the error, if any.
    pub source: Option<Arc<dyn Any + Send + Sync>>,
}

impl Error {
    /// Create an error from the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error from a displayable source, keeping the source value
    /// available for downcasting.
    pub fn new_with_source(source: impl Display + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// Convert the error to a server error located at `pos`.
    #[must_use]
    pub fn into_server_error(self, pos: Pos) -> ServerError {
        ServerError {
            message: self.message,
            source: self.source,
            locations: vec![pos],
            path: Vec::new(),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.message.eq(&other.message)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::new(value.to_string())
    }
}

/// An alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error that appears on the response, with locations and a response
/// path.
#[derive(Clone, Serialize)]
pub struct ServerError {
    /// The error message.
    pub message: String,
    /// The source of the error, if any.
    #[serde(skip)]
    pub source: Option<Arc<dyn Any + Send + Sync>>,
    /// Positions in the query document the error applies to.
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_locations"
    )]
    pub locations: Vec<Pos>,
    /// The path to the response field the error applies to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<QueryPathSegment>,
}

impl ServerError {
    /// Create a new server error with the message, located at `pos` when
    /// given.
    pub fn new(message: impl Into<String>, pos: Option<Pos>) -> Self {
        Self {
            message: message.into(),
            source: None,
            locations: pos.into_iter().collect(),
            path: Vec::new(),
        }
    }
}

impl Debug for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerError")
            .field("message", &self.message)
            .field("locations", &self.locations)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ServerError {
    fn eq(&self, other: &Self) -> bool {
        self.message.eq(&other.message)
            && self.locations.eq(&other.locations)
            && self.path.eq(&other.path)
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<crate::parser::Error> for ServerError {
    fn from(value: crate::parser::Error) -> Self {
        Self {
            message: value.to_string(),
            source: None,
            locations: value.positions().into_iter().collect(),
            path: Vec::new(),
        }
    }
}

impl From<ServerError> for Error {
    fn from(value: ServerError) -> Self {
        Self {
            message: value.message,
            source: value.source,
        }
    }
}

fn serialize_locations<S: Serializer>(locations: &[Pos], serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Location {
        line: usize,
        column: usize,
    }

    serializer.collect_seq(locations.iter().map(|pos| Location {
        line: pos.line,
        column: pos.column,
    }))
}

/// Alias for `Result<T, ServerError>`.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// An error raised while building a [`Schema`](crate::Schema) from a
/// registry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// A root operation type or a referenced type is missing from the
    /// registry.
    #[error(r#"Unknown type "{0}""#)]
    UnknownType(String),

    /// A root operation type is not an object type.
    #[error(r#"Type "{0}" is not an object type"#)]
    NotAnObjectType(String),

    /// The registry has no type registered under the query root name.
    #[error("The schema has no query root type")]
    MissingQueryRoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_serializes_locations_as_line_column() {
        let error = ServerError::new("boom", Some(Pos { line: 3, column: 7 }));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "boom",
                "locations": [{"line": 3, "column": 7}],
            })
        );
    }

    #[test]
    fn path_is_omitted_when_empty() {
        let error = ServerError::new("boom", None);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json, serde_json::json!({"message": "boom"}));
    }
}
