use crate::{
    AssetId, OutputHandle, TimeFrame, TimeFrameAssetFrameMap,
    collection::{FnvHashMap, FnvHashSet, FnvIndexMap, FnvIndexSet},
    error::StorageError,
    transform::{Transform, TransformCategory},
};
use parking_lot::RwLock;
use quantflow_frame::{DataFrame, Scalar, Series};
use smol_str::SmolStr;
use std::{fmt::Debug, sync::Arc};
use tracing::debug;

/// Per-(timeframe, asset, output handle) series cache.
type SeriesCache = FnvHashMap<TimeFrame, FnvHashMap<AssetId, FnvHashMap<OutputHandle, Series>>>;

/// Concurrency-safe multi-level cache feeding inputs into transforms, storing their outputs,
/// and reconstructing the final per-(timeframe, asset) tables.
///
/// All methods take `&self`; implementations provide interior mutability.
pub trait IntermediateStorage: Debug + Send + Sync {
    /// Install the caller's seed tables, seed the cache with their columns for allowed assets
    /// only, and record the ordered asset set.
    fn initialize_base_data(
        &self,
        base: TimeFrameAssetFrameMap,
        allowed_assets: &FnvIndexSet<AssetId>,
    );

    /// Record the transform as producer of every one of its declared output handles.
    /// Idempotent.
    fn register_transform(&self, transform: Arc<dyn Transform>);

    /// Build the input table handed to the transform for one asset.
    fn gather_inputs(
        &self,
        asset: &AssetId,
        transform: &dyn Transform,
    ) -> Result<DataFrame, StorageError>;

    /// Non-throwing pre-check that every input the transform needs is resolvable for the asset.
    fn validate_inputs_available(&self, asset: &AssetId, transform: &dyn Transform) -> bool;

    /// Persist the transform's output for one asset into the appropriate cache tier.
    fn store_output(
        &self,
        asset: &AssetId,
        transform: &dyn Transform,
        result: DataFrame,
    ) -> Result<(), StorageError>;

    /// Assemble the final deliverable: base data with every registered output handle joined in
    /// as an additional column, scalars broadcast over every entry.
    fn build_final_output(&self) -> Result<TimeFrameAssetFrameMap, StorageError>;

    /// Ordered asset set, as recorded by [`Self::initialize_base_data`].
    fn asset_ids(&self) -> Vec<AssetId>;
}

/// Global single-copy store for scalar-category outputs.
///
/// Guarded as one region: the value map and the membership set move together.
#[derive(Debug, Default)]
struct ScalarState {
    values: FnvIndexMap<OutputHandle, Scalar>,
    outputs: FnvIndexSet<OutputHandle>,
}

/// Default [`IntermediateStorage`] implementation.
///
/// Each logical region has an independent reader-writer lock so that concurrent gathers do not
/// serialise against each other. The fixed acquisition order is cache → base data → handle
/// index → asset ids → scalar cache; expensive concatenations run with no lock held.
#[derive(Debug, Default)]
pub struct ResultStorage {
    cache: RwLock<SeriesCache>,
    base_data: RwLock<TimeFrameAssetFrameMap>,
    handle_index: RwLock<FnvIndexMap<OutputHandle, Arc<dyn Transform>>>,
    asset_ids: RwLock<Vec<AssetId>>,
    scalar_cache: RwLock<ScalarState>,
}

impl ResultStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntermediateStorage for ResultStorage {
    fn initialize_base_data(
        &self,
        base: TimeFrameAssetFrameMap,
        allowed_assets: &FnvIndexSet<AssetId>,
    ) {
        let mut cache = self.cache.write();
        let mut base_data = self.base_data.write();
        let mut asset_ids = self.asset_ids.write();

        *base_data = base;

        let mut ordered = FnvIndexSet::default();
        for (timeframe, asset_map) in base_data.iter() {
            for (asset, frame) in asset_map {
                if !allowed_assets.contains(asset) {
                    debug!(%asset, "asset not in the allowed set, skipping base data seed");
                    continue;
                }
                ordered.insert(asset.clone());
                debug!(%asset, %timeframe, "seeding base data columns");
                let asset_cache = cache
                    .entry(timeframe.clone())
                    .or_default()
                    .entry(asset.clone())
                    .or_default();
                for column in frame.columns() {
                    asset_cache.insert(OutputHandle::from_raw(column.name()), column.clone());
                }
            }
        }

        *asset_ids = ordered.into_iter().collect();
    }

    fn register_transform(&self, transform: Arc<dyn Transform>) {
        let mut handle_index = self.handle_index.write();
        for handle in transform.output_handles() {
            handle_index.insert(handle, Arc::clone(&transform));
        }
    }

    fn gather_inputs(
        &self,
        asset: &AssetId,
        transform: &dyn Transform,
    ) -> Result<DataFrame, StorageError> {
        let timeframe = transform.timeframe();
        let inputs = transform.input_handles();

        // Root read path: no upstream handles, hand over the base table directly.
        if inputs.is_empty() {
            debug!(%asset, %timeframe, transform = transform.id(), "gathering base data");
            let base_data = self.base_data.read();
            return base_frame(&base_data, timeframe, asset).cloned();
        }

        let cache = self.cache.read();
        let base_data = self.base_data.read();
        let handle_index = self.handle_index.read();
        let scalars = self.scalar_cache.read();

        let target = base_frame(&base_data, timeframe, asset)?;
        let target_index = target.index();

        let mut columns = Vec::with_capacity(inputs.len());
        let mut seen: FnvHashSet<SmolStr> = FnvHashSet::default();

        for handle in inputs {
            if !seen.insert(SmolStr::new(handle.as_str())) {
                continue;
            }

            // Scalar path: broadcast from the global scalar cache.
            if let Some(scalar) = scalars.values.get(handle) {
                debug!(%handle, %asset, rows = target_index.len(), "broadcasting scalar input");
                columns.push(Series::broadcast(handle.as_str(), scalar, target_index.len()));
                continue;
            }

            let producer = handle_index
                .get(handle)
                .ok_or_else(|| StorageError::UnregisteredHandle(handle.clone()))?;
            let producer_timeframe = producer.timeframe();

            let series = cache
                .get(producer_timeframe)
                .and_then(|asset_map| asset_map.get(asset))
                .and_then(|handle_map| handle_map.get(handle))
                .ok_or_else(|| StorageError::MissingCacheEntry {
                    handle: handle.clone(),
                    asset: asset.clone(),
                })?;

            if producer_timeframe == timeframe {
                columns.push(series.clone());
            } else {
                let source_index = base_frame(&base_data, producer_timeframe, asset)?.index();
                columns.push(series.reindex(source_index, target_index));
            }
        }

        for source in &transform.metadata().required_data_sources {
            if !seen.insert(source.clone()) {
                continue;
            }
            columns.push(target.column(source)?.clone());
        }

        Ok(DataFrame::new(target_index.clone(), columns)?)
    }

    fn validate_inputs_available(&self, asset: &AssetId, transform: &dyn Transform) -> bool {
        let cache = self.cache.read();
        let base_data = self.base_data.read();
        let handle_index = self.handle_index.read();
        let scalars = self.scalar_cache.read();

        let Ok(target) = base_frame(&base_data, transform.timeframe(), asset) else {
            return false;
        };

        let inputs_available = transform.input_handles().iter().all(|handle| {
            if scalars.values.contains_key(handle) {
                return true;
            }
            let Some(producer) = handle_index.get(handle) else {
                return false;
            };
            cache
                .get(producer.timeframe())
                .and_then(|asset_map| asset_map.get(asset))
                .is_some_and(|handle_map| handle_map.contains_key(handle))
        });

        inputs_available
            && transform
                .metadata()
                .required_data_sources
                .iter()
                .all(|source| target.contains(source))
    }

    fn store_output(
        &self,
        asset: &AssetId,
        transform: &dyn Transform,
        result: DataFrame,
    ) -> Result<(), StorageError> {
        let timeframe = transform.timeframe();
        let metadata = transform.metadata();

        if metadata.category == TransformCategory::Scalar {
            // Scalar optimisation: store once globally, not per (timeframe, asset).
            let mut scalars = self.scalar_cache.write();
            for output in &metadata.outputs {
                let handle = transform.output_handle(&output.id);
                if scalars.values.contains_key(&handle) {
                    continue;
                }
                let scalar = match result.get_column(handle.as_str()) {
                    Some(series) if !series.is_empty() => series.first(),
                    _ => Scalar::null(output.io_type.data_type()),
                };
                debug!(%handle, "storing scalar output globally");
                scalars.values.insert(handle.clone(), scalar);
                scalars.outputs.insert(handle);
            }
            return Ok(());
        }

        let mut cache = self.cache.write();
        let base_data = self.base_data.read();
        let index = base_frame(&base_data, timeframe, asset)?.index();

        let asset_cache = cache
            .entry(timeframe.clone())
            .or_default()
            .entry(asset.clone())
            .or_default();

        for output in &metadata.outputs {
            let handle = transform.output_handle(&output.id);
            let series = match result.get_column(handle.as_str()) {
                Some(series) => {
                    debug!(%handle, %asset, %timeframe, "storing output");
                    series.reindex(result.index(), index)
                }
                None => {
                    debug!(%handle, %asset, %timeframe, "storing null output");
                    Series::null(handle.as_str(), output.io_type.data_type(), index.len())
                }
            };
            asset_cache.insert(handle, series);
        }

        Ok(())
    }

    fn build_final_output(&self) -> Result<TimeFrameAssetFrameMap, StorageError> {
        let cache = self.cache.read();
        let base_data = self.base_data.read();
        let handle_index = self.handle_index.read();
        let asset_ids = self.asset_ids.read();
        let scalars = self.scalar_cache.read();

        let mut result = base_data.clone();
        let has_scalars = !scalars.outputs.is_empty();

        // Bucket cached series per (producer timeframe, asset), excluding DataSource
        // producers: their values are already present in the base tables.
        let mut buckets: FnvHashMap<TimeFrame, FnvHashMap<AssetId, Vec<Series>>> =
            FnvHashMap::default();
        for asset in asset_ids.iter() {
            for (handle, producer) in handle_index.iter() {
                if producer.metadata().category == TransformCategory::DataSource {
                    continue;
                }
                let timeframe = producer.timeframe();
                let Some(series) = cache
                    .get(timeframe)
                    .and_then(|asset_map| asset_map.get(asset))
                    .and_then(|handle_map| handle_map.get(handle))
                else {
                    continue;
                };
                buckets
                    .entry(timeframe.clone())
                    .or_default()
                    .entry(asset.clone())
                    .or_default()
                    .push(series.clone());
            }
        }

        // Release every lock before the expensive concatenations.
        drop(cache);
        drop(base_data);
        drop(handle_index);
        drop(asset_ids);
        drop(scalars);

        for (timeframe, asset_map) in result.iter_mut() {
            for (asset, frame) in asset_map.iter_mut() {
                let Some(series_list) = buckets
                    .get_mut(timeframe)
                    .and_then(|asset_buckets| asset_buckets.remove(asset))
                else {
                    continue;
                };
                let mut frames = series_list
                    .into_iter()
                    .map(|series| DataFrame::single(frame.index().clone(), series))
                    .collect::<Result<Vec<_>, _>>()?;
                frames.push(frame.clone());
                *frame = DataFrame::concat_columns(frames)?;
            }
        }

        // Broadcast scalars over every (timeframe, asset) entry.
        if has_scalars {
            let scalars = self.scalar_cache.read();
            for asset_map in result.values_mut() {
                for frame in asset_map.values_mut() {
                    let index = frame.index().clone();
                    let mut frames = scalars
                        .outputs
                        .iter()
                        .filter_map(|handle| {
                            let scalar = scalars.values.get(handle)?;
                            Some(DataFrame::single(
                                index.clone(),
                                Series::broadcast(handle.as_str(), scalar, index.len()),
                            ))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    frames.push(frame.clone());
                    *frame = DataFrame::concat_columns(frames)?;
                }
            }
        }

        Ok(result)
    }

    fn asset_ids(&self) -> Vec<AssetId> {
        self.asset_ids.read().clone()
    }
}

fn base_frame<'a>(
    base_data: &'a TimeFrameAssetFrameMap,
    timeframe: &TimeFrame,
    asset: &AssetId,
) -> Result<&'a DataFrame, StorageError> {
    base_data
        .get(timeframe)
        .ok_or_else(|| StorageError::MissingTimeFrame(timeframe.clone()))?
        .get(asset)
        .ok_or_else(|| StorageError::MissingAsset {
            timeframe: timeframe.clone(),
            asset: asset.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TransformError,
        transform::{IoType, TransformConfig, TransformMetadata},
    };
    use chrono::{DateTime, TimeZone, Utc};
    use quantflow_frame::{DataType, DateTimeIndex};

    #[derive(Debug)]
    struct StubTransform {
        config: TransformConfig,
        metadata: TransformMetadata,
    }

    impl StubTransform {
        fn new(id: &str, timeframe: &str, metadata: TransformMetadata) -> Self {
            Self {
                config: TransformConfig::new(id, TimeFrame::from(timeframe)),
                metadata,
            }
        }

        fn with_inputs(mut self, inputs: impl IntoIterator<Item = OutputHandle>) -> Self {
            self.config = self.config.with_inputs(inputs);
            self
        }
    }

    impl Transform for StubTransform {
        fn config(&self) -> &TransformConfig {
            &self.config
        }

        fn metadata(&self) -> &TransformMetadata {
            &self.metadata
        }

        fn apply(&self, input: DataFrame) -> Result<DataFrame, TransformError> {
            Ok(input)
        }
    }

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn index(hours: &[u32]) -> DateTimeIndex {
        DateTimeIndex::new(hours.iter().map(|&hour| ts(hour)).collect()).unwrap()
    }

    fn daily_base(assets: &[(&str, Vec<f64>)]) -> TimeFrameAssetFrameMap {
        let mut asset_map = FnvIndexMap::default();
        for (asset, closes) in assets {
            let idx = index(&(0..closes.len() as u32).collect::<Vec<_>>());
            let frame = DataFrame::single(idx, Series::f64("c", closes.clone())).unwrap();
            asset_map.insert(AssetId::from(*asset), frame);
        }
        let mut base = TimeFrameAssetFrameMap::default();
        base.insert(TimeFrame::from("1D"), asset_map);
        base
    }

    fn allowed(assets: &[&str]) -> FnvIndexSet<AssetId> {
        assets.iter().map(|&asset| AssetId::from(asset)).collect()
    }

    fn indicator(output: &str) -> TransformMetadata {
        TransformMetadata::single_output(TransformCategory::Indicator, output, IoType::Number)
    }

    #[test]
    fn test_initialize_restricts_asset_set_to_allowed() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(
            daily_base(&[("AAPL", vec![1.0]), ("MSFT", vec![2.0])]),
            &allowed(&["AAPL"]),
        );

        assert_eq!(storage.asset_ids(), vec![AssetId::from("AAPL")]);
    }

    #[test]
    fn test_gather_root_returns_base_table() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(daily_base(&[("AAPL", vec![1.0, 2.0])]), &allowed(&["AAPL"]));

        let root = StubTransform::new("root", "1D", indicator("result"));
        let frame = storage
            .gather_inputs(&AssetId::from("AAPL"), &root)
            .unwrap();

        assert_eq!(frame.num_rows(), 2);
        assert!(frame.contains("c"));
    }

    #[test]
    fn test_gather_missing_asset_is_descriptive() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(daily_base(&[("AAPL", vec![1.0])]), &allowed(&["AAPL"]));

        let root = StubTransform::new("root", "1D", indicator("result"));
        let error = storage
            .gather_inputs(&AssetId::from("GOOG"), &root)
            .unwrap_err();

        assert!(matches!(error, StorageError::MissingAsset { .. }));
    }

    #[test]
    fn test_gather_appends_scalar_and_required_data_sources() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(daily_base(&[("AAPL", vec![1.0, 2.0])]), &allowed(&["AAPL"]));

        let scalar = StubTransform::new(
            "pi",
            "1D",
            TransformMetadata::single_output(TransformCategory::Scalar, "value", IoType::Number),
        );
        storage
            .store_output(
                &AssetId::from("AAPL"),
                &scalar,
                DataFrame::single(index(&[0]), Series::f64("pi#value", [3.14])).unwrap(),
            )
            .unwrap();

        let mut consumer = StubTransform::new("consumer", "1D", indicator("result"))
            .with_inputs([OutputHandle::from_raw("pi#value")]);
        consumer.metadata.required_data_sources = vec![SmolStr::new("c")];

        let frame = storage
            .gather_inputs(&AssetId::from("AAPL"), &consumer)
            .unwrap();

        assert_eq!(
            frame.column_names().collect::<Vec<_>>(),
            vec!["pi#value", "c"]
        );
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(
            frame.column("pi#value").unwrap().get(1),
            Scalar::from(3.14)
        );
    }

    #[test]
    fn test_gather_reindexes_cross_timeframe_inputs() {
        let storage = ResultStorage::new();

        let mut base = daily_base(&[("AAPL", vec![1.0, 2.0, 3.0])]);
        let intraday_index = index(&[0, 12]);
        base.insert(
            TimeFrame::from("1H"),
            [(
                AssetId::from("AAPL"),
                DataFrame::single(intraday_index, Series::f64("c", [10.0, 20.0])).unwrap(),
            )]
            .into_iter()
            .collect(),
        );
        storage.initialize_base_data(base, &allowed(&["AAPL"]));

        let hourly = StubTransform::new("hourly", "1H", indicator("out"));
        storage.register_transform(Arc::new(StubTransform::new(
            "hourly",
            "1H",
            indicator("out"),
        )));
        storage
            .store_output(
                &AssetId::from("AAPL"),
                &hourly,
                DataFrame::single(index(&[0, 12]), Series::f64("hourly#out", [10.0, 20.0]))
                    .unwrap(),
            )
            .unwrap();

        let daily_consumer = StubTransform::new("daily", "1D", indicator("out"))
            .with_inputs([OutputHandle::from_raw("hourly#out")]);
        let frame = storage
            .gather_inputs(&AssetId::from("AAPL"), &daily_consumer)
            .unwrap();

        // Daily index has hours 0, 1, 2: only hour 0 exists at the hourly timeframe.
        let column = frame.column("hourly#out").unwrap();
        assert_eq!(column.len(), 3);
        assert_eq!(column.get(0), Scalar::from(10.0));
        assert!(column.is_null(1));
        assert!(column.is_null(2));
    }

    #[test]
    fn test_store_missing_output_writes_typed_null_series() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(daily_base(&[("AAPL", vec![1.0, 2.0])]), &allowed(&["AAPL"]));

        let transform = StubTransform::new(
            "flag",
            "1D",
            TransformMetadata::single_output(TransformCategory::Indicator, "hit", IoType::Boolean),
        );
        storage
            .store_output(&AssetId::from("AAPL"), &transform, DataFrame::empty())
            .unwrap();

        let cache = storage.cache.read();
        let series = cache
            .get(&TimeFrame::from("1D"))
            .and_then(|assets| assets.get(&AssetId::from("AAPL")))
            .and_then(|handles| handles.get(&OutputHandle::from_raw("flag#hit")))
            .unwrap();
        assert_eq!(series.dtype(), DataType::Boolean);
        assert_eq!(series.len(), 2);
        assert!(series.is_null(0) && series.is_null(1));
    }

    #[test]
    fn test_scalar_output_is_stored_once() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(
            daily_base(&[("AAPL", vec![1.0]), ("MSFT", vec![2.0])]),
            &allowed(&["AAPL", "MSFT"]),
        );

        let scalar = StubTransform::new(
            "one",
            "1D",
            TransformMetadata::single_output(TransformCategory::Scalar, "value", IoType::Number),
        );
        for (asset, value) in [("AAPL", 1.0), ("MSFT", 99.0)] {
            storage
                .store_output(
                    &AssetId::from(asset),
                    &scalar,
                    DataFrame::single(index(&[0]), Series::f64("one#value", [value])).unwrap(),
                )
                .unwrap();
        }

        let scalars = storage.scalar_cache.read();
        assert_eq!(scalars.values.len(), 1);
        // First write wins; later assets must not overwrite.
        assert_eq!(
            scalars.values.get(&OutputHandle::from_raw("one#value")),
            Some(&Scalar::from(1.0))
        );
    }

    #[test]
    fn test_final_output_joins_outputs_and_broadcasts_scalars() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(
            daily_base(&[("AAPL", vec![1.0, 2.0])]),
            &allowed(&["AAPL"]),
        );

        let sma: Arc<dyn Transform> = Arc::new(StubTransform::new("sma", "1D", indicator("out")));
        storage.register_transform(Arc::clone(&sma));
        storage
            .store_output(
                &AssetId::from("AAPL"),
                sma.as_ref(),
                DataFrame::single(index(&[0, 1]), Series::f64("sma#out", [1.5, 2.5])).unwrap(),
            )
            .unwrap();

        let scalar: Arc<dyn Transform> = Arc::new(StubTransform::new(
            "one",
            "1D",
            TransformMetadata::single_output(TransformCategory::Scalar, "value", IoType::Number),
        ));
        storage.register_transform(Arc::clone(&scalar));
        storage
            .store_output(
                &AssetId::from("AAPL"),
                scalar.as_ref(),
                DataFrame::single(index(&[0]), Series::f64("one#value", [1.0])).unwrap(),
            )
            .unwrap();

        let result = storage.build_final_output().unwrap();
        let frame = &result[&TimeFrame::from("1D")][&AssetId::from("AAPL")];

        assert!(frame.contains("c"));
        assert!(frame.contains("sma#out"));
        assert!(frame.contains("one#value"));
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.column("one#value").unwrap().get(1), Scalar::from(1.0));
        assert_eq!(frame.column("sma#out").unwrap().get(0), Scalar::from(1.5));
    }

    #[test]
    fn test_data_source_outputs_excluded_from_final_assembly() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(daily_base(&[("AAPL", vec![1.0])]), &allowed(&["AAPL"]));

        let source: Arc<dyn Transform> = Arc::new(StubTransform::new(
            "bars",
            "1D",
            TransformMetadata::single_output(TransformCategory::DataSource, "c", IoType::Number),
        ));
        storage.register_transform(Arc::clone(&source));
        storage
            .store_output(
                &AssetId::from("AAPL"),
                source.as_ref(),
                DataFrame::single(index(&[0]), Series::f64("bars#c", [1.0])).unwrap(),
            )
            .unwrap();

        let result = storage.build_final_output().unwrap();
        let frame = &result[&TimeFrame::from("1D")][&AssetId::from("AAPL")];

        assert!(!frame.contains("bars#c"));
        assert!(frame.contains("c"));
    }

    #[test]
    fn test_validate_inputs_available() {
        let storage = ResultStorage::new();
        storage.initialize_base_data(daily_base(&[("AAPL", vec![1.0])]), &allowed(&["AAPL"]));

        let producer: Arc<dyn Transform> =
            Arc::new(StubTransform::new("sma", "1D", indicator("out")));
        storage.register_transform(Arc::clone(&producer));

        let consumer = StubTransform::new("momo", "1D", indicator("out"))
            .with_inputs([OutputHandle::from_raw("sma#out")]);

        assert!(!storage.validate_inputs_available(&AssetId::from("AAPL"), &consumer));

        storage
            .store_output(
                &AssetId::from("AAPL"),
                producer.as_ref(),
                DataFrame::single(index(&[0]), Series::f64("sma#out", [1.0])).unwrap(),
            )
            .unwrap();

        assert!(storage.validate_inputs_available(&AssetId::from("AAPL"), &consumer));
    }
}
