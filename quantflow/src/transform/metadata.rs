use quantflow_frame::DataType;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Behavioral category of a transform. The engine dispatches on a handful of these
/// (`DataSource`, `Scalar`, `Reporter`, `Selector`); the rest classify catalog entries.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub enum TransformCategory {
    /// Produces base-data columns; excluded from final assembly because its values are already
    /// present in the seeded tables.
    DataSource,
    /// Produces broadcastable scalar outputs stored once, not per (timeframe, asset).
    Scalar,
    Executor,
    /// Emits a [`TearSheet`](crate::report::TearSheet) after execution.
    Reporter,
    /// Emits [`SelectorData`](crate::report::SelectorData) after execution.
    Selector,
    Indicator,
    Trend,
    #[default]
    Utility,
    CrossSectional,
    Calendar,
    PriceAction,
}

/// How a plotted output should be rendered by downstream chart builders.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub enum PlotKind {
    #[default]
    None,
    Line,
    Bar,
    Column,
    Flag,
}

/// Logical type of a declared transform output.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub enum IoType {
    Integer,
    Boolean,
    Decimal,
    #[default]
    Number,
    String,
}

impl IoType {
    /// Column [`DataType`] used when materialising values (incl. typed nulls) of this output.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Integer => DataType::Int64,
            Self::Boolean => DataType::Boolean,
            Self::Decimal | Self::Number => DataType::Float64,
            Self::String => DataType::Utf8,
        }
    }
}

/// A declared transform output: local name plus logical type.
///
/// The globally unique handle is derived by prefixing the owning transform id, see
/// [`Transform::output_handle`](super::Transform::output_handle).
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct OutputDescriptor {
    pub id: SmolStr,
    pub io_type: IoType,
}

impl OutputDescriptor {
    pub fn new(id: impl Into<SmolStr>, io_type: IoType) -> Self {
        Self {
            id: id.into(),
            io_type,
        }
    }
}

/// Static description of a transform, fixed per catalog entry.
#[derive(Debug, Clone, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct TransformMetadata {
    pub category: TransformCategory,
    pub plot_kind: PlotKind,
    /// Declared outputs, expanded to globally unique handles at registration.
    pub outputs: Vec<OutputDescriptor>,
    /// Base-data column names joined into the input table in addition to upstream handles.
    pub required_data_sources: Vec<SmolStr>,
    /// Consume one series per asset as columns; run once per execution instead of per asset.
    pub is_cross_sectional: bool,
    /// Skip execution (writing null outputs) at non-intraday timeframes.
    pub intraday_only: bool,
    /// Hand the input table to the transform without the row-wise null drop.
    pub allow_null_inputs: bool,
}

impl TransformMetadata {
    /// Metadata for a single-output transform of the provided category.
    pub fn single_output(
        category: TransformCategory,
        output: impl Into<SmolStr>,
        io_type: IoType,
    ) -> Self {
        Self {
            category,
            outputs: vec![OutputDescriptor::new(output, io_type)],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_type_maps_onto_column_types() {
        assert_eq!(IoType::Integer.data_type(), DataType::Int64);
        assert_eq!(IoType::Decimal.data_type(), DataType::Float64);
        assert_eq!(IoType::Number.data_type(), DataType::Float64);
        assert_eq!(IoType::Boolean.data_type(), DataType::Boolean);
        assert_eq!(IoType::String.data_type(), DataType::Utf8);
    }
}
