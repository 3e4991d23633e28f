use crate::error::FrameError;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Monotonic UTC time index of a [`DataFrame`](crate::DataFrame).
///
/// Timestamps are strictly increasing, which makes position lookups a binary search and index
/// unions a linear merge.
#[derive(Debug, Clone, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct DateTimeIndex(Vec<DateTime<Utc>>);

impl DateTimeIndex {
    /// Construct an index from strictly increasing timestamps.
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Result<Self, FrameError> {
        if let Some(position) = timestamps.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(FrameError::UnsortedIndex(position + 1));
        }
        Ok(Self(timestamps))
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<DateTime<Utc>> {
        self.0.get(position).copied()
    }

    /// Position of the provided timestamp, if present.
    pub fn position(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.0.binary_search(&timestamp).ok()
    }

    /// Sorted union of two indices.
    pub fn union(&self, other: &Self) -> Self {
        Self(
            self.0
                .iter()
                .merge(other.0.iter())
                .dedup()
                .copied()
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[DateTime<Utc>] {
        &self.0
    }
}
