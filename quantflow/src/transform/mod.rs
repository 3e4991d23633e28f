use crate::{
    OutputHandle, TimeFrame,
    error::TransformError,
    report::{SelectorData, TearSheet},
};
use quantflow_frame::DataFrame;
use std::fmt::Debug;

/// Transform runtime configuration.
pub mod config;

/// External supplier of transform instances in dependency-safe order.
pub mod manager;

/// Static transform descriptions: categories, output descriptors, execution policies.
pub mod metadata;

pub use config::TransformConfig;
pub use manager::{StaticTransformManager, TransformManager};
pub use metadata::{IoType, OutputDescriptor, PlotKind, TransformCategory, TransformMetadata};

/// A named, pure columnar operator in the dataflow graph.
///
/// [`Transform::apply`] must depend only on its input table and configured options, and must not
/// mutate shared state; the engine calls it concurrently across assets. Errors are trapped by
/// the execution functions, annotated with asset/transform identity, and aggregated into a
/// single pipeline failure after the graph drains.
pub trait Transform: Debug + Send + Sync {
    fn config(&self) -> &TransformConfig;

    fn metadata(&self) -> &TransformMetadata;

    /// Apply the operator to the gathered input table.
    fn apply(&self, input: DataFrame) -> Result<DataFrame, TransformError>;

    /// Report artifact, queried after execution on `Reporter`-category transforms only.
    fn tear_sheet(&self) -> Option<TearSheet> {
        None
    }

    /// Selector artifact, queried after execution on every transform; empty/`None` results are
    /// silently dropped.
    fn selector_data(&self) -> Option<SelectorData> {
        None
    }

    fn id(&self) -> &str {
        &self.config().id
    }

    /// Human-readable name; defaults to the id.
    fn name(&self) -> &str {
        self.id()
    }

    fn timeframe(&self) -> &TimeFrame {
        &self.config().timeframe
    }

    /// Ordered upstream handles this transform consumes. Empty means root.
    fn input_handles(&self) -> &[OutputHandle] {
        &self.config().inputs
    }

    /// Globally unique handle of one declared output.
    fn output_handle(&self, output: &str) -> OutputHandle {
        OutputHandle::new(self.id(), output)
    }

    /// Every handle this transform will write, expanded from its declared outputs.
    fn output_handles(&self) -> Vec<OutputHandle> {
        self.metadata()
            .outputs
            .iter()
            .map(|output| self.output_handle(&output.id))
            .collect()
    }

    /// First wired input; the column a cross-sectional transform consumes per asset.
    fn primary_input(&self) -> Option<&OutputHandle> {
        self.input_handles().first()
    }

    /// Handle of the first declared output; the column a cross-sectional transform produces.
    fn primary_output(&self) -> Option<OutputHandle> {
        self.metadata()
            .outputs
            .first()
            .map(|output| self.output_handle(&output.id))
    }
}
