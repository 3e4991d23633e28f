use smol_str::SmolStr;
use thiserror::Error;

/// Represents all errors that can occur when constructing or combining frames.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
pub enum FrameError {
    /// Index timestamps must be strictly increasing.
    #[error("index is not strictly monotonic at position {0}")]
    UnsortedIndex(usize),

    /// Column length must equal the index length.
    #[error("column {name} has length {actual}, expected {expected}")]
    LengthMismatch {
        name: SmolStr,
        expected: usize,
        actual: usize,
    },

    /// Column names within a frame must be unique.
    #[error("duplicate column: {0}")]
    DuplicateColumn(SmolStr),

    /// Requested column is not present in the frame.
    #[error("missing column: {0}")]
    MissingColumn(SmolStr),

    /// Row mask length must equal the number of rows.
    #[error("filter mask has length {actual}, expected {expected}")]
    MaskLengthMismatch { expected: usize, actual: usize },
}
