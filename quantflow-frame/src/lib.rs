#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Quantflow-Frame
//! Columnar time-series tables for the Quantflow dataflow engine.
//! * **Columnar**: A [`DataFrame`] is a monotonic UTC [`DateTimeIndex`] plus named, nullable,
//!   typed [`Series`] columns.
//! * **Alignment first**: reindexing onto a foreign index null-fills and preserves dtype,
//!   outer-join column concatenation unions indices, and row-wise null-drops keep tables tidy.
//! * **Engine facing**: the API surface is exactly what a dataflow runtime needs to gather
//!   transform inputs, store outputs, and assemble final per-asset tables.

/// All [`Error`](std::error::Error)s generated in Quantflow-Frame.
pub mod error;

/// Columnar [`DataFrame`] and its row/column operations.
pub mod frame;

/// Monotonic UTC [`DateTimeIndex`].
pub mod index;

/// Single typed nullable values, and the logical column [`DataType`]s.
pub mod scalar;

/// Named, nullable, typed [`Series`] columns.
pub mod series;

pub use error::FrameError;
pub use frame::DataFrame;
pub use index::DateTimeIndex;
pub use scalar::{DataType, Scalar};
pub use series::{ColumnValues, Series};
