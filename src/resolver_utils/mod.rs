//! The resolution machinery: field collection, input coercion, field
//! dispatch, and value completion.

mod container;
mod field;
mod input_value;
mod list;

pub use container::collect_fields;

pub(crate) use container::resolve_container;
pub(crate) use field::resolve_field;
pub(crate) use input_value::{coerce_literal, coerce_variable_input};
