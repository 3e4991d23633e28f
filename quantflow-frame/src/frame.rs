use crate::{
    error::FrameError,
    index::DateTimeIndex,
    series::Series,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashSet;

/// A two-dimensional columnar table: a monotonic UTC [`DateTimeIndex`] plus named [`Series`]
/// columns of equal length. Column order is preserved.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DataFrame {
    index: DateTimeIndex,
    columns: Vec<Series>,
}

impl DataFrame {
    /// Construct a frame, validating column lengths and name uniqueness.
    pub fn new(index: DateTimeIndex, columns: Vec<Series>) -> Result<Self, FrameError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.len() != index.len() {
                return Err(FrameError::LengthMismatch {
                    name: SmolStr::new(column.name()),
                    expected: index.len(),
                    actual: column.len(),
                });
            }
            if !seen.insert(column.name().to_owned()) {
                return Err(FrameError::DuplicateColumn(SmolStr::new(column.name())));
            }
        }
        Ok(Self { index, columns })
    }

    /// A frame with no rows and no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Single-column frame over the provided index.
    pub fn single(index: DateTimeIndex, column: Series) -> Result<Self, FrameError> {
        Self::new(index, vec![column])
    }

    pub fn index(&self) -> &DateTimeIndex {
        &self.index
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// True when the frame has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0 || self.num_cols() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name() == name)
    }

    pub fn column(&self, name: &str) -> Result<&Series, FrameError> {
        self.get_column(name)
            .ok_or_else(|| FrameError::MissingColumn(SmolStr::new(name)))
    }

    pub fn get_column(&self, name: &str) -> Option<&Series> {
        self.columns.iter().find(|column| column.name() == name)
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Series::name)
    }

    /// Append a column, preserving order.
    pub fn with_column(mut self, column: Series) -> Result<Self, FrameError> {
        if column.len() != self.index.len() {
            return Err(FrameError::LengthMismatch {
                name: SmolStr::new(column.name()),
                expected: self.index.len(),
                actual: column.len(),
            });
        }
        if self.contains(column.name()) {
            return Err(FrameError::DuplicateColumn(SmolStr::new(column.name())));
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Project onto the provided column names, in the provided order.
    pub fn select(&self, names: &[&str]) -> Result<Self, FrameError> {
        let columns = names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(self.index.clone(), columns)
    }

    /// Drop every row in which any column is null.
    pub fn drop_null(&self) -> Self {
        if self.columns.is_empty() {
            return self.clone();
        }

        let mask = (0..self.num_rows())
            .map(|row| self.columns.iter().all(|column| !column.is_null(row)))
            .collect::<Vec<_>>();

        self.apply_mask(&mask)
    }

    /// Retain rows whose mask entry is true.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Self, FrameError> {
        if mask.len() != self.num_rows() {
            return Err(FrameError::MaskLengthMismatch {
                expected: self.num_rows(),
                actual: mask.len(),
            });
        }
        Ok(self.apply_mask(mask))
    }

    fn apply_mask(&self, mask: &[bool]) -> Self {
        let timestamps = self
            .index
            .iter()
            .zip(mask)
            .filter_map(|(timestamp, &keep)| keep.then_some(timestamp))
            .collect::<Vec<_>>();

        Self {
            index: DateTimeIndex::new(timestamps).expect("filtered index remains monotonic"),
            columns: self
                .columns
                .iter()
                .map(|column| column.filter(mask))
                .collect(),
        }
    }

    /// Outer-join concatenation on the column axis.
    ///
    /// The result index is the sorted union of all input indices; every column is reindexed onto
    /// it with null fill. Fully empty frames are skipped. Duplicate column names across inputs
    /// are an error.
    pub fn concat_columns(frames: Vec<DataFrame>) -> Result<Self, FrameError> {
        let frames = frames
            .into_iter()
            .filter(|frame| frame.num_cols() > 0)
            .collect::<Vec<_>>();

        let Some(first) = frames.first() else {
            return Ok(Self::empty());
        };

        let union = frames
            .iter()
            .skip(1)
            .fold(first.index.clone(), |acc, frame| acc.union(&frame.index));

        let mut columns = Vec::with_capacity(frames.iter().map(DataFrame::num_cols).sum());
        let mut seen = HashSet::new();
        for frame in &frames {
            for column in &frame.columns {
                if !seen.insert(column.name().to_owned()) {
                    return Err(FrameError::DuplicateColumn(SmolStr::new(column.name())));
                }
                columns.push(column.reindex(&frame.index, &union));
            }
        }

        Ok(Self {
            index: union,
            columns,
        })
    }
}
