use serde::{Deserialize, Serialize};

/// Logical type of a column or scalar.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub enum DataType {
    /// 64-bit floating point.
    #[default]
    Float64,
    /// 64-bit signed integer.
    Int64,
    /// Boolean.
    Boolean,
    /// UTF-8 string.
    Utf8,
}

/// A single typed value with nullability.
///
/// The null representation carries its [`DataType`] so that broadcasting a null scalar into a
/// column preserves the declared logical type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Scalar {
    Float64(Option<f64>),
    Int64(Option<i64>),
    Boolean(Option<bool>),
    Utf8(Option<String>),
}

impl Scalar {
    /// Construct the typed null scalar for the provided [`DataType`].
    pub fn null(dtype: DataType) -> Self {
        match dtype {
            DataType::Float64 => Self::Float64(None),
            DataType::Int64 => Self::Int64(None),
            DataType::Boolean => Self::Boolean(None),
            DataType::Utf8 => Self::Utf8(None),
        }
    }

    pub fn dtype(&self) -> DataType {
        match self {
            Self::Float64(_) => DataType::Float64,
            Self::Int64(_) => DataType::Int64,
            Self::Boolean(_) => DataType::Boolean,
            Self::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Float64(value) => value.is_none(),
            Self::Int64(value) => value.is_none(),
            Self::Boolean(value) => value.is_none(),
            Self::Utf8(value) => value.is_none(),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float64(Some(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int64(Some(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(Some(value))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(Some(value.to_owned()))
    }
}
