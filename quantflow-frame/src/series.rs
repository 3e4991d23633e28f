use crate::{
    index::DateTimeIndex,
    scalar::{DataType, Scalar},
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Nullable typed column storage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ColumnValues {
    Float64(Vec<Option<f64>>),
    Int64(Vec<Option<i64>>),
    Boolean(Vec<Option<bool>>),
    Utf8(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Float64(_) => DataType::Float64,
            Self::Int64(_) => DataType::Int64,
            Self::Boolean(_) => DataType::Boolean,
            Self::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Float64(values) => values.len(),
            Self::Int64(values) => values.len(),
            Self::Boolean(values) => values.len(),
            Self::Utf8(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All-null storage of the provided type and length.
    pub fn nulls(dtype: DataType, len: usize) -> Self {
        match dtype {
            DataType::Float64 => Self::Float64(vec![None; len]),
            DataType::Int64 => Self::Int64(vec![None; len]),
            DataType::Boolean => Self::Boolean(vec![None; len]),
            DataType::Utf8 => Self::Utf8(vec![None; len]),
        }
    }

    /// Replicate a scalar `len` times, preserving its type.
    pub fn from_scalar(scalar: &Scalar, len: usize) -> Self {
        match scalar {
            Scalar::Float64(value) => Self::Float64(vec![*value; len]),
            Scalar::Int64(value) => Self::Int64(vec![*value; len]),
            Scalar::Boolean(value) => Self::Boolean(vec![*value; len]),
            Scalar::Utf8(value) => Self::Utf8(vec![value.clone(); len]),
        }
    }

    pub fn is_null(&self, position: usize) -> bool {
        match self {
            Self::Float64(values) => values.get(position).is_none_or(Option::is_none),
            Self::Int64(values) => values.get(position).is_none_or(Option::is_none),
            Self::Boolean(values) => values.get(position).is_none_or(Option::is_none),
            Self::Utf8(values) => values.get(position).is_none_or(Option::is_none),
        }
    }

    pub fn get(&self, position: usize) -> Scalar {
        match self {
            Self::Float64(values) => Scalar::Float64(values.get(position).copied().flatten()),
            Self::Int64(values) => Scalar::Int64(values.get(position).copied().flatten()),
            Self::Boolean(values) => Scalar::Boolean(values.get(position).copied().flatten()),
            Self::Utf8(values) => Scalar::Utf8(values.get(position).cloned().flatten()),
        }
    }

    /// Gather rows by source position, null-filling absent positions.
    fn take(&self, positions: &[Option<usize>]) -> Self {
        fn gather<T: Clone>(values: &[Option<T>], positions: &[Option<usize>]) -> Vec<Option<T>> {
            positions
                .iter()
                .map(|position| position.and_then(|p| values.get(p).cloned().flatten()))
                .collect()
        }

        match self {
            Self::Float64(values) => Self::Float64(gather(values, positions)),
            Self::Int64(values) => Self::Int64(gather(values, positions)),
            Self::Boolean(values) => Self::Boolean(gather(values, positions)),
            Self::Utf8(values) => Self::Utf8(gather(values, positions)),
        }
    }

    fn filter(&self, mask: &[bool]) -> Self {
        fn retain<T: Clone>(values: &[Option<T>], mask: &[bool]) -> Vec<Option<T>> {
            values
                .iter()
                .zip(mask)
                .filter_map(|(value, &keep)| keep.then(|| value.clone()))
                .collect()
        }

        match self {
            Self::Float64(values) => Self::Float64(retain(values, mask)),
            Self::Int64(values) => Self::Int64(retain(values, mask)),
            Self::Boolean(values) => Self::Boolean(retain(values, mask)),
            Self::Utf8(values) => Self::Utf8(retain(values, mask)),
        }
    }
}

/// A named, nullable, typed column.
///
/// A `Series` does not carry its own index; the owning [`DataFrame`](crate::DataFrame) (or, in
/// engine caches, the base-data table it was aligned to) provides row positions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Series {
    name: SmolStr,
    values: ColumnValues,
}

impl Series {
    pub fn new(name: impl Into<SmolStr>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn f64(name: impl Into<SmolStr>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(
            name,
            ColumnValues::Float64(values.into_iter().map(Some).collect()),
        )
    }

    pub fn opt_f64(
        name: impl Into<SmolStr>,
        values: impl IntoIterator<Item = Option<f64>>,
    ) -> Self {
        Self::new(name, ColumnValues::Float64(values.into_iter().collect()))
    }

    pub fn i64(name: impl Into<SmolStr>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(
            name,
            ColumnValues::Int64(values.into_iter().map(Some).collect()),
        )
    }

    pub fn opt_i64(
        name: impl Into<SmolStr>,
        values: impl IntoIterator<Item = Option<i64>>,
    ) -> Self {
        Self::new(name, ColumnValues::Int64(values.into_iter().collect()))
    }

    pub fn bool(name: impl Into<SmolStr>, values: impl IntoIterator<Item = bool>) -> Self {
        Self::new(
            name,
            ColumnValues::Boolean(values.into_iter().map(Some).collect()),
        )
    }

    pub fn opt_bool(
        name: impl Into<SmolStr>,
        values: impl IntoIterator<Item = Option<bool>>,
    ) -> Self {
        Self::new(name, ColumnValues::Boolean(values.into_iter().collect()))
    }

    pub fn utf8<S: Into<String>>(
        name: impl Into<SmolStr>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            ColumnValues::Utf8(values.into_iter().map(|value| Some(value.into())).collect()),
        )
    }

    /// All-null series of the provided type and length.
    pub fn null(name: impl Into<SmolStr>, dtype: DataType, len: usize) -> Self {
        Self::new(name, ColumnValues::nulls(dtype, len))
    }

    /// Broadcast a scalar to a series of the provided length.
    pub fn broadcast(name: impl Into<SmolStr>, scalar: &Scalar, len: usize) -> Self {
        Self::new(name, ColumnValues::from_scalar(scalar, len))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = name.into();
        self
    }

    pub fn dtype(&self) -> DataType {
        self.values.dtype()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn get(&self, position: usize) -> Scalar {
        self.values.get(position)
    }

    /// First value, or the typed null when the series is empty.
    pub fn first(&self) -> Scalar {
        if self.is_empty() {
            Scalar::null(self.dtype())
        } else {
            self.values.get(0)
        }
    }

    pub fn is_null(&self, position: usize) -> bool {
        self.values.is_null(position)
    }

    /// Realign this series from `source` onto `target`, null-filling timestamps absent from
    /// `source` and preserving dtype.
    pub fn reindex(&self, source: &DateTimeIndex, target: &DateTimeIndex) -> Self {
        let positions = target
            .iter()
            .map(|timestamp| source.position(timestamp))
            .collect::<Vec<_>>();

        Self {
            name: self.name.clone(),
            values: self.values.take(&positions),
        }
    }

    pub(crate) fn filter(&self, mask: &[bool]) -> Self {
        Self {
            name: self.name.clone(),
            values: self.values.filter(mask),
        }
    }
}
