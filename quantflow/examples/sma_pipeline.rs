use chrono::{TimeDelta, TimeZone, Utc};
use quantflow::{
    AssetId, TimeFrame, TimeFrameAssetFrameMap,
    collection::FnvIndexMap,
    engine::Orchestrator,
    error::TransformError,
    logging::init_logging,
    transform::{
        IoType, StaticTransformManager, Transform, TransformCategory, TransformConfig,
        TransformMetadata,
    },
};
use quantflow_frame::{DataFrame, DateTimeIndex, Scalar, Series};
use std::{collections::VecDeque, sync::Arc};

const SMA_WINDOW: usize = 3;

/// Simple moving average over the base close column, with null warmup rows.
#[derive(Debug)]
struct SimpleMovingAverage {
    config: TransformConfig,
    metadata: TransformMetadata,
    window: usize,
}

impl SimpleMovingAverage {
    fn new(id: &str, timeframe: TimeFrame, window: usize) -> Self {
        let mut metadata = TransformMetadata::single_output(
            TransformCategory::Indicator,
            "result",
            IoType::Number,
        );
        metadata.required_data_sources = vec!["c".into()];
        Self {
            config: TransformConfig::new(id, timeframe),
            metadata,
            window,
        }
    }
}

impl Transform for SimpleMovingAverage {
    fn config(&self) -> &TransformConfig {
        &self.config
    }

    fn metadata(&self) -> &TransformMetadata {
        &self.metadata
    }

    fn apply(&self, input: DataFrame) -> Result<DataFrame, TransformError> {
        let closes = input.column("c")?;
        let mut window = VecDeque::with_capacity(self.window);
        let mut values = Vec::with_capacity(closes.len());
        for row in 0..closes.len() {
            if let Scalar::Float64(Some(close)) = closes.get(row) {
                window.push_back(close);
            }
            if window.len() > self.window {
                window.pop_front();
            }
            values.push(
                (window.len() == self.window)
                    .then(|| window.iter().sum::<f64>() / self.window as f64),
            );
        }
        Ok(DataFrame::single(
            input.index().clone(),
            Series::opt_f64(self.output_handle("result").as_str(), values),
        )?)
    }
}

/// Boolean signal: close above its moving average.
#[derive(Debug)]
struct AboveAverage {
    config: TransformConfig,
    metadata: TransformMetadata,
}

impl AboveAverage {
    fn new(id: &str, timeframe: TimeFrame, average: &dyn Transform) -> Self {
        let mut metadata = TransformMetadata::single_output(
            TransformCategory::Trend,
            "signal",
            IoType::Boolean,
        );
        metadata.required_data_sources = vec!["c".into()];
        metadata.allow_null_inputs = true;
        Self {
            config: TransformConfig::new(id, timeframe)
                .with_inputs([average.output_handle("result")]),
            metadata,
        }
    }
}

impl Transform for AboveAverage {
    fn config(&self) -> &TransformConfig {
        &self.config
    }

    fn metadata(&self) -> &TransformMetadata {
        &self.metadata
    }

    fn apply(&self, input: DataFrame) -> Result<DataFrame, TransformError> {
        let average = input.column(self.config.inputs[0].as_str())?;
        let closes = input.column("c")?;
        let signal = (0..input.num_rows())
            .map(|row| match (closes.get(row), average.get(row)) {
                (Scalar::Float64(Some(close)), Scalar::Float64(Some(mean))) => Some(close > mean),
                _ => None,
            })
            .collect::<Vec<_>>();
        Ok(DataFrame::single(
            input.index().clone(),
            Series::opt_bool(self.output_handle("signal").as_str(), signal),
        )?)
    }
}

fn sample_data(timeframe: &TimeFrame) -> Result<TimeFrameAssetFrameMap, Box<dyn std::error::Error>>
{
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let closes = [
        ("AAPL", vec![101.0, 103.0, 102.0, 105.0, 108.0, 104.0]),
        ("MSFT", vec![390.0, 394.0, 389.0, 396.0, 401.0, 398.0]),
    ];

    let mut asset_map = FnvIndexMap::default();
    for (asset, values) in closes {
        let index = DateTimeIndex::new(
            (0..values.len())
                .map(|day| start + TimeDelta::days(day as i64))
                .collect(),
        )?;
        asset_map.insert(
            AssetId::from(asset),
            DataFrame::single(index, Series::f64("c", values))?,
        );
    }

    let mut base = TimeFrameAssetFrameMap::default();
    base.insert(timeframe.clone(), asset_map);
    Ok(base)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let timeframe = TimeFrame::from("1D");
    let sma = SimpleMovingAverage::new("sma", timeframe.clone(), SMA_WINDOW);
    let signal = AboveAverage::new("above_sma", timeframe.clone(), &sma);
    let manager = StaticTransformManager::new(vec![Arc::new(sma), Arc::new(signal)]);

    let assets = [AssetId::from("AAPL"), AssetId::from("MSFT")];
    let orchestrator = Orchestrator::builder(assets, &manager).build()?;

    let output = orchestrator.execute_pipeline(sample_data(&timeframe)?).await?;

    for (timeframe, asset_map) in &output {
        for (asset, frame) in asset_map {
            println!(
                "{timeframe} {asset}: {} rows x {} columns {:?}",
                frame.num_rows(),
                frame.num_cols(),
                frame.column_names().collect::<Vec<_>>(),
            );
        }
    }

    Ok(())
}
