use std::sync::Arc;

use async_graphql_value::ConstValue;

use crate::Error;

/// The built-in scalars every registry understands without a custom codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PossibleScalar {
    String,
    Int,
    Float,
    Boolean,
    ID,
}

impl PossibleScalar {
    /// Parse an input value into the scalar's runtime representation.
    ///
    /// `Int` is range-checked to 32 bits; `ID` accepts strings and
    /// integers.
    pub fn parse(name: &str, value: ConstValue) -> Result<ConstValue, Error> {
        let Ok(scalar) = PossibleScalar::try_from(name) else {
            // Custom scalar without a codec: accepted as-is.
            return Ok(value);
        };

        match (scalar, value) {
            (Self::String, value @ ConstValue::String(_)) => Ok(value),
            (Self::Boolean, value @ ConstValue::Boolean(_)) => Ok(value),
            (Self::Int, ConstValue::Number(num)) => match num.as_i64() {
                Some(n) if i32::try_from(n).is_ok() => Ok(ConstValue::Number(num)),
                Some(_) => Err(Error::new("Int cannot represent values outside 32 bits")),
                None => Err(Error::new("Int cannot represent a non-integer value")),
            },
            (Self::Float, value @ ConstValue::Number(_)) => Ok(value),
            (Self::ID, value @ ConstValue::String(_)) => Ok(value),
            (Self::ID, ConstValue::Number(num)) => match num.as_i64() {
                Some(n) => Ok(ConstValue::String(n.to_string())),
                None => Err(Error::new("ID cannot represent a non-integer number")),
            },
            (_, value) => Err(Error::new(format!(
                r#"Expected a "{name}", found {}"#,
                super::value_kind(&value)
            ))),
        }
    }

    /// Convert a resolved value into the scalar's response representation.
    pub fn serialize(name: &str, value: ConstValue) -> Result<ConstValue, Error> {
        if matches!(value, ConstValue::Null) {
            return Ok(ConstValue::Null);
        }
        // The output rules coincide with the input rules for the built-in
        // scalars, ID normalization included.
        Self::parse(name, value)
    }
}

impl TryFrom<&str> for PossibleScalar {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, ()> {
        match value {
            "String" => Ok(PossibleScalar::String),
            "Int" => Ok(PossibleScalar::Int),
            "Float" => Ok(PossibleScalar::Float),
            "Boolean" => Ok(PossibleScalar::Boolean),
            "ID" => Ok(PossibleScalar::ID),
            _ => Err(()),
        }
    }
}

/// Parse and serialize behaviour of a custom scalar type.
pub trait ScalarCodec: Send + Sync {
    /// Convert an input (literal or variable) value into the runtime value.
    fn parse(&self, value: ConstValue) -> Result<ConstValue, Error>;

    /// Convert a resolved value into the response value.
    fn serialize(&self, value: ConstValue) -> Result<ConstValue, Error>;
}

/// How a scalar type converts between input, runtime and response values.
#[derive(Clone, Default)]
pub enum ScalarParser {
    /// Use the built-in table, keyed by the scalar's name; unknown names
    /// pass values through untouched.
    #[default]
    BestEffort,
    /// Accept any value unchanged in both directions.
    PassThrough,
    /// A host-installed codec.
    Custom(Arc<dyn ScalarCodec>),
}

impl ScalarParser {
    pub(crate) fn parse(&self, name: &str, value: ConstValue) -> Result<ConstValue, Error> {
        match self {
            ScalarParser::BestEffort => PossibleScalar::parse(name, value),
            ScalarParser::PassThrough => Ok(value),
            ScalarParser::Custom(codec) => codec.parse(value),
        }
    }

    pub(crate) fn serialize(&self, name: &str, value: ConstValue) -> Result<ConstValue, Error> {
        match self {
            ScalarParser::BestEffort => PossibleScalar::serialize(name, value),
            ScalarParser::PassThrough => Ok(value),
            ScalarParser::Custom(codec) => codec.serialize(value),
        }
    }
}

impl std::fmt::Debug for ScalarParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarParser::BestEffort => f.write_str("BestEffort"),
            ScalarParser::PassThrough => f.write_str("PassThrough"),
            ScalarParser::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_graphql_value::value;

    use super::*;

    #[test]
    fn int_refuses_strings() {
        let err = PossibleScalar::parse("Int", value!("5")).unwrap_err();
        assert_eq!(err.message, r#"Expected a "Int", found string"#);
    }

    #[test]
    fn int_is_range_checked() {
        assert!(PossibleScalar::parse("Int", value!(i64::from(i32::MAX))).is_ok());
        assert!(PossibleScalar::parse("Int", value!(i64::from(i32::MAX) + 1)).is_err());
    }

    #[test]
    fn id_accepts_integers_as_strings() {
        assert_eq!(
            PossibleScalar::parse("ID", value!(42)).unwrap(),
            value!("42")
        );
    }

    #[test]
    fn unknown_scalars_pass_through() {
        let json = value!({"anything": [1, 2]});
        assert_eq!(
            PossibleScalar::parse("JSON", json.clone()).unwrap(),
            json
        );
    }

    #[test]
    fn serialize_passes_null_through() {
        assert_eq!(
            PossibleScalar::serialize("Int", ConstValue::Null).unwrap(),
            ConstValue::Null
        );
    }
}
