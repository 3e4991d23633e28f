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

//! # Quantflow
//! Quantflow core is a Rust dataflow execution engine for tabular time-series analytics over
//! financial market data.
//! * **Declarative**: users describe a DAG of named, pure columnar transforms; the engine
//!   resolves dependencies, schedules execution and routes data.
//! * **Parallel**: the graph drains with unlimited concurrency on the Tokio blocking pool, and
//!   every node additionally fans out across assets.
//! * **Robust**: strongly typed, thread safe, with per-(asset, transform) error isolation and a
//!   single aggregated pipeline failure.
//!
//! ## Overview
//! An external [`TransformManager`](transform::TransformManager) supplies
//! [`Transform`](transform::Transform) instances in producer-before-consumer order. The
//! [`Orchestrator`](engine::Orchestrator) registers each one, wires the execution graph, and on
//! `execute_pipeline` seeds the [`IntermediateStorage`](storage::IntermediateStorage) with the
//! caller's per-(timeframe, asset) tables, drains the graph, caches report/selector artifacts
//! from reporter/selector transforms, and assembles the final output tables with every
//! registered output handle joined in as an additional column.
//!
//! At a high level, it provides a few major components:
//! * `Orchestrator` with plug and play `IntermediateStorage` and `PipelineLogger` components.
//! * Concurrency-safe multi-level `ResultStorage` keyed by (timeframe, asset, output handle),
//!   with a single-copy broadcast cache for scalar outputs.
//! * `Transform` and `TransformManager` interfaces for supplying the transform catalog.
//! * `TearSheet` report artifacts with protobuf-style structural merging, and `SelectorData`
//!   UI artifacts accumulated per asset.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Collection type aliases keyed with the [`fnv`] hasher.
pub mod collection;

/// Transform execution graph `Orchestrator`, and the per-node execution entry points.
///
/// eg/ `Orchestrator`, `ExecutionContext`, `ExecutionLogger`, etc.
pub mod engine;

/// Defines all possible errors in Quantflow core.
pub mod error;

/// Provides default Quantflow core Tracing logging initialisers.
pub mod logging;

/// Report (`TearSheet`) and selector artifacts emitted by reporter/selector transforms.
pub mod report;

/// UTC session windows used to slice intraday tables before transformation.
pub mod session;

/// Concurrency-safe intermediate storage feeding transform inputs and collecting outputs.
pub mod storage;

/// Transform contract: metadata, configuration, and the `Transform`/`TransformManager`
/// interfaces the engine schedules against.
pub mod transform;

use crate::collection::FnvIndexMap;
use quantflow_frame::DataFrame;

/// Per-(timeframe, asset) tables, as seeded into and produced by a pipeline execution.
pub type TimeFrameAssetFrameMap = FnvIndexMap<TimeFrame, FnvIndexMap<AssetId, DataFrame>>;

/// Unique identifier for a tradable asset (eg/ a ticker).
#[derive(
    Debug,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Display,
    From,
    Deserialize,
    Serialize,
)]
pub struct AssetId(SmolStr);

impl AssetId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Named sampling interval with a canonical string key (eg/ `"1D"`, `"1H"`, `"5Min"`).
///
/// Equality is by string. A timeframe is intraday iff its key ends in `"H"` or `"Min"`.
#[derive(
    Debug,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Display,
    From,
    Deserialize,
    Serialize,
)]
pub struct TimeFrame(SmolStr);

impl TimeFrame {
    pub fn new(key: impl Into<SmolStr>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for sub-daily timeframes.
    pub fn is_intraday(&self) -> bool {
        self.0.len() >= 2 && (self.0.ends_with("Min") || self.0.ends_with('H'))
    }
}

impl From<&str> for TimeFrame {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Globally unique identifier of a transform output column: `"{transform_id}#{output_name}"`.
#[derive(
    Debug,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Display,
    Deserialize,
    Serialize,
)]
pub struct OutputHandle(SmolStr);

impl OutputHandle {
    /// Handle for the `output` column produced by the transform with `transform_id`.
    pub fn new(transform_id: &str, output: &str) -> Self {
        Self(SmolStr::new(format!("{transform_id}#{output}")))
    }

    /// Wrap an already-formatted handle string.
    pub fn from_raw(raw: impl Into<SmolStr>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Quantflow core test utilities.
pub mod test_utils {
    use crate::{
        error::TransformError,
        report::{SelectorData, TearSheet},
        transform::{Transform, TransformConfig, TransformMetadata},
    };
    use chrono::{TimeDelta, TimeZone, Utc};
    use quantflow_frame::{DataFrame, DateTimeIndex, Series};
    use std::{fmt, sync::Arc};

    type TransformBody = dyn Fn(DataFrame) -> Result<DataFrame, TransformError> + Send + Sync;

    /// Configurable [`Transform`] double with a pluggable body and canned artifacts.
    pub struct MockTransform {
        config: TransformConfig,
        metadata: TransformMetadata,
        body: Arc<TransformBody>,
        tear_sheet: Option<TearSheet>,
        selector_data: Option<SelectorData>,
    }

    impl fmt::Debug for MockTransform {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("MockTransform")
                .field("config", &self.config)
                .field("metadata", &self.metadata)
                .finish()
        }
    }

    impl MockTransform {
        /// A transform that returns its input unchanged (declared outputs it does not produce
        /// are stored as typed nulls by the engine).
        pub fn new(config: TransformConfig, metadata: TransformMetadata) -> Self {
            Self {
                config,
                metadata,
                body: Arc::new(Ok::<DataFrame, TransformError>),
                tear_sheet: None,
                selector_data: None,
            }
        }

        pub fn with_body(
            mut self,
            body: impl Fn(DataFrame) -> Result<DataFrame, TransformError> + Send + Sync + 'static,
        ) -> Self {
            self.body = Arc::new(body);
            self
        }

        /// Body emitting every declared output as a constant-valued column over the input
        /// index.
        pub fn with_constant_outputs(self, value: f64) -> Self {
            let handles = self
                .metadata
                .outputs
                .iter()
                .map(|output| crate::OutputHandle::new(&self.config.id, &output.id))
                .collect::<Vec<_>>();
            self.with_body(move |frame| {
                let columns = handles
                    .iter()
                    .map(|handle| {
                        Series::f64(handle.as_str(), vec![value; frame.num_rows()])
                    })
                    .collect();
                Ok(DataFrame::new(frame.index().clone(), columns)?)
            })
        }

        pub fn with_tear_sheet(mut self, tear_sheet: TearSheet) -> Self {
            self.tear_sheet = Some(tear_sheet);
            self
        }

        pub fn with_selector_data(mut self, selector_data: SelectorData) -> Self {
            self.selector_data = Some(selector_data);
            self
        }
    }

    impl Transform for MockTransform {
        fn config(&self) -> &TransformConfig {
            &self.config
        }

        fn metadata(&self) -> &TransformMetadata {
            &self.metadata
        }

        fn apply(&self, input: DataFrame) -> Result<DataFrame, TransformError> {
            (self.body)(input)
        }

        fn tear_sheet(&self) -> Option<TearSheet> {
            self.tear_sheet.clone()
        }

        fn selector_data(&self) -> Option<SelectorData> {
            self.selector_data.clone()
        }
    }

    /// Daily UTC index of `days` consecutive days starting 2024-01-01.
    pub fn daily_index(days: usize) -> DateTimeIndex {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        DateTimeIndex::new(
            (0..days)
                .map(|day| start + TimeDelta::days(day as i64))
                .collect(),
        )
        .unwrap()
    }

    /// Single close-column (`"c"`) frame over a daily index.
    pub fn close_frame(values: Vec<f64>) -> DataFrame {
        let index = daily_index(values.len());
        DataFrame::single(index, Series::f64("c", values)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_intraday_classification() {
        assert!(TimeFrame::from("5Min").is_intraday());
        assert!(TimeFrame::from("15Min").is_intraday());
        assert!(TimeFrame::from("1H").is_intraday());
        assert!(!TimeFrame::from("1D").is_intraday());
        assert!(!TimeFrame::from("1W").is_intraday());
        assert!(!TimeFrame::from("H").is_intraday());
    }

    #[test]
    fn test_output_handle_format() {
        let handle = OutputHandle::new("sma_20", "result");
        assert_eq!(handle.as_str(), "sma_20#result");
        assert_eq!(handle, OutputHandle::from_raw("sma_20#result"));
    }
}
