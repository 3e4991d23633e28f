use crate::{AssetId, OutputHandle, TimeFrame};
use quantflow_frame::FrameError;
use smol_str::SmolStr;
use thiserror::Error;

/// Represents all errors that can terminate pipeline construction or execution.
///
/// Construction errors (duplicate ids, unresolved handles) are raised immediately and leave no
/// partially built graph behind. Execution errors are aggregated: per-(asset, transform)
/// failures accumulate in the [`PipelineLogger`](crate::engine::logger::PipelineLogger) while
/// the graph keeps draining, and surface as a single [`PipelineError::ExecutionFailed`] after.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PipelineError {
    /// Two registered transforms share an id.
    #[error("Duplicate transform id: {0}")]
    DuplicateTransformId(SmolStr),

    /// An input handle does not refer to any previously registered transform output.
    #[error("Handle {0} was not previously hashed.")]
    UnresolvedHandle(OutputHandle),

    /// One or more (asset, transform) executions failed; the payload joins every logged error.
    #[error("Transform pipeline failed: {0}")]
    ExecutionFailed(String),

    /// Storage rejected an operation outside of per-node execution (eg/ final assembly).
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Represents all errors generated by [`IntermediateStorage`](crate::storage::IntermediateStorage)
/// operations.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum StorageError {
    /// Base data holds no tables for the requested timeframe.
    #[error("no base data for timeframe: {0}")]
    MissingTimeFrame(TimeFrame),

    /// Base data holds no table for the requested asset at the requested timeframe.
    #[error("no base data for asset {asset} at timeframe {timeframe}")]
    MissingAsset { timeframe: TimeFrame, asset: AssetId },

    /// Input handle has no registered producer.
    #[error("cannot find transform for input: {0}")]
    UnregisteredHandle(OutputHandle),

    /// Producer ran but left no cached series for the requested (asset, handle).
    #[error("no cached series for handle {handle}, asset {asset}")]
    MissingCacheEntry { handle: OutputHandle, asset: AssetId },

    /// Underlying frame operation failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Error returned by a [`Transform::apply`](crate::transform::Transform::apply) implementation.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum TransformError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Catalog-defined failure.
    #[error("{0}")]
    Custom(String),
}

/// Any error arising while driving one transform over the current input set.
///
/// Trapped by the execution functions, annotated with asset/transform identity and appended to
/// the pipeline logger; never propagated out of a graph node.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum NodeError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    /// A per-asset worker task died before reporting a result.
    #[error("worker task failed: {0}")]
    Task(String),

    /// The transform contract was violated (eg/ a cross-sectional transform without inputs).
    #[error("{0}")]
    Contract(String),
}
