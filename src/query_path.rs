use std::fmt::{self, Display, Formatter, Write};

use serde::Serialize;

/// A segment of the response path: either a field key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum QueryPathSegment {
    /// A list index.
    Index(usize),
    /// A field response key.
    Field(String),
}

/// The path from the response root to the field currently being resolved.
///
/// Cloned on every push so sibling branches never observe each other's
/// segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPath(Vec<QueryPathSegment>);

impl QueryPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The path extended with a field key.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut path = self.clone();
        path.0.push(QueryPathSegment::Field(name.to_string()));
        path
    }

    /// The path extended with a list index.
    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.0.push(QueryPathSegment::Index(index));
        path
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryPathSegment> {
        self.0.iter()
    }
}

impl IntoIterator for QueryPath {
    type Item = QueryPathSegment;
    type IntoIter = std::vec::IntoIter<QueryPathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for QueryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.0.iter().enumerate() {
            match segment {
                QueryPathSegment::Index(index) => {
                    f.write_char('[')?;
                    index.fmt(f)?;
                    f.write_char(']')?;
                }
                QueryPathSegment::Field(name) => {
                    if idx != 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(name)?;
                }
            }
        }
        Ok(())
    }
}
