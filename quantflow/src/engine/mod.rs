use crate::{
    AssetId, OutputHandle, TimeFrameAssetFrameMap,
    collection::{FnvHashSet, FnvIndexMap, FnvIndexSet},
    engine::node::{apply_cross_section_transform, apply_default_transform},
    error::PipelineError,
    report::{SelectorData, TearSheet},
    transform::{Transform, TransformCategory, TransformManager},
};
use futures::{FutureExt, future::BoxFuture};
use itertools::Itertools;
use parking_lot::Mutex;
use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
};
use smol_str::SmolStr;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinSet};
use tracing::{error, info, warn};

/// Shared per-execution state handed to every graph node.
pub mod context;

/// Thread-safe diagnostic sink for per-(asset, transform) execution errors.
pub mod logger;

/// Per-node execution entry points: the per-asset and cross-sectional drivers.
pub(crate) mod node;

pub use context::ExecutionContext;
pub use logger::{ExecutionLogger, PipelineLogger};

/// Dataflow runtime orchestrator.
///
/// Built once from a [`TransformManager`]'s catalog: registration resolves every input handle
/// to its producer and wires a DAG whose roots are transforms without inputs. Each call to
/// [`Self::execute_pipeline`] seeds storage with the caller's base tables, drains the graph in
/// parallel (edges are the only ordering constraint), aggregates per-(asset, transform)
/// failures, caches report/selector artifacts, and assembles the final output tables.
#[derive(Debug)]
pub struct Orchestrator {
    asset_ids: Vec<AssetId>,
    transforms: Vec<Arc<dyn Transform>>,
    graph: DiGraph<usize, ()>,
    node_indices: Vec<NodeIndex>,
    handle_to_node: FnvIndexMap<OutputHandle, NodeIndex>,
    context: ExecutionContext,
    report_cache: Mutex<FnvIndexMap<AssetId, TearSheet>>,
    selector_cache: Mutex<FnvIndexMap<AssetId, Vec<SelectorData>>>,
}

/// Builder for an [`Orchestrator`], with optional storage/logger replacements.
#[derive(Debug)]
pub struct OrchestratorBuilder<'a> {
    asset_ids: Vec<AssetId>,
    manager: &'a dyn TransformManager,
    storage: Option<Arc<dyn crate::storage::IntermediateStorage>>,
    logger: Option<Arc<dyn PipelineLogger>>,
}

impl<'a> OrchestratorBuilder<'a> {
    /// Inject a custom [`IntermediateStorage`](crate::storage::IntermediateStorage)
    /// implementation.
    pub fn storage(self, storage: Arc<dyn crate::storage::IntermediateStorage>) -> Self {
        Self {
            storage: Some(storage),
            ..self
        }
    }

    /// Inject a custom [`PipelineLogger`] implementation.
    pub fn logger(self, logger: Arc<dyn PipelineLogger>) -> Self {
        Self {
            logger: Some(logger),
            ..self
        }
    }

    /// Register the manager's transforms and wire the execution graph.
    ///
    /// Fails fast on duplicate transform ids and on input handles that no previously
    /// registered transform produces; nothing is partially built on error.
    pub fn build(self) -> Result<Orchestrator, PipelineError> {
        let context = ExecutionContext::new(
            self.storage
                .unwrap_or_else(|| Arc::new(crate::storage::ResultStorage::new())),
            self.logger.unwrap_or_else(|| Arc::new(ExecutionLogger::new())),
        );

        let mut orchestrator = Orchestrator {
            asset_ids: self.asset_ids,
            transforms: Vec::new(),
            graph: DiGraph::new(),
            node_indices: Vec::new(),
            handle_to_node: FnvIndexMap::default(),
            context,
            report_cache: Mutex::new(FnvIndexMap::default()),
            selector_cache: Mutex::new(FnvIndexMap::default()),
        };

        let mut used_ids: FnvHashSet<SmolStr> = FnvHashSet::default();
        for transform in self.manager.build_transforms() {
            if !used_ids.insert(SmolStr::new(transform.id())) {
                return Err(PipelineError::DuplicateTransformId(SmolStr::new(
                    transform.id(),
                )));
            }
            orchestrator.register_transform(transform)?;
        }

        Ok(orchestrator)
    }
}

impl Orchestrator {
    /// Begin building an orchestrator over the provided assets and transform catalog.
    pub fn builder<'a>(
        asset_ids: impl IntoIterator<Item = AssetId>,
        manager: &'a dyn TransformManager,
    ) -> OrchestratorBuilder<'a> {
        OrchestratorBuilder {
            asset_ids: asset_ids.into_iter().collect(),
            manager,
            storage: None,
            logger: None,
        }
    }

    /// Registered transforms, in registration order.
    pub fn transforms(&self) -> &[Arc<dyn Transform>] {
        &self.transforms
    }

    pub fn asset_ids(&self) -> &[AssetId] {
        &self.asset_ids
    }

    fn register_transform(&mut self, transform: Arc<dyn Transform>) -> Result<(), PipelineError> {
        // Resolve inputs before publishing outputs: a transform can never feed itself, and an
        // unresolved handle rejects the registration before any state changes.
        let producers = transform
            .input_handles()
            .iter()
            .map(|handle| {
                self.handle_to_node
                    .get(handle)
                    .copied()
                    .ok_or_else(|| PipelineError::UnresolvedHandle(handle.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.context.storage.register_transform(Arc::clone(&transform));

        let index = self.transforms.len();
        let node = self.graph.add_node(index);
        for producer in producers.into_iter().unique() {
            self.graph.add_edge(producer, node, ());
        }
        for handle in transform.output_handles() {
            self.handle_to_node.insert(handle, node);
        }

        self.transforms.push(transform);
        self.node_indices.push(node);
        Ok(())
    }

    /// Execute the transform graph over the provided base tables.
    ///
    /// Returns the per-(timeframe, asset) tables with every registered output handle present
    /// as an additional column, or a single aggregated error with one line per failed
    /// (asset, transform) pair.
    pub async fn execute_pipeline(
        &self,
        base: TimeFrameAssetFrameMap,
    ) -> Result<TimeFrameAssetFrameMap, PipelineError> {
        let allowed = self.asset_ids.iter().cloned().collect::<FnvIndexSet<_>>();
        self.context.storage.initialize_base_data(base, &allowed);
        self.context.logger.clear();

        info!(transforms = self.transforms.len(), "executing transform graph");
        self.drain_graph().await;

        let log = self.context.logger.contents();
        if !log.is_empty() {
            error!(%log, "transform pipeline failed");
            return Err(PipelineError::ExecutionFailed(log));
        }

        for transform in &self.transforms {
            self.cache_selector_from_transform(transform.as_ref());
            if transform.metadata().category == TransformCategory::Reporter {
                self.cache_report_from_transform(transform.as_ref());
            }
        }

        info!("transform pipeline completed");
        let result = self.context.storage.build_final_output()?;
        self.context.logger.clear();
        Ok(result)
    }

    /// Spawn one task per graph node and wait for the graph to drain.
    ///
    /// Each node waits on a completion flag per producer, runs its body with unlimited
    /// concurrency, then flips its own flag. Transforms are registered producers-first, so
    /// every producer's flag exists before a consumer references it.
    async fn drain_graph(&self) {
        let mut completions: Vec<watch::Receiver<bool>> =
            Vec::with_capacity(self.transforms.len());
        let mut join_set = JoinSet::new();

        for (index, transform) in self.transforms.iter().enumerate() {
            let producers = self
                .graph
                .neighbors_directed(self.node_indices[index], Direction::Incoming)
                .map(|producer| completions[self.graph[producer]].clone())
                .collect::<Vec<_>>();

            let (tx, rx) = watch::channel(false);
            completions.push(rx);

            let body: BoxFuture<'static, ()> = if transform.metadata().is_cross_sectional {
                apply_cross_section_transform(Arc::clone(transform), self.context.clone()).boxed()
            } else {
                apply_default_transform(Arc::clone(transform), self.context.clone()).boxed()
            };

            join_set.spawn(async move {
                for mut producer in producers {
                    // A closed channel means the producer died; its failure is already logged
                    // and holding this consumer back would stall the drain.
                    let _ = producer.wait_for(|done| *done).await;
                }
                body.await;
                let _ = tx.send(true);
            });
        }

        while join_set.join_next().await.is_some() {}
    }

    /// Cache the report artifact of one reporter transform, structurally merging it into any
    /// report already accumulated for each asset.
    fn cache_report_from_transform(&self, transform: &dyn Transform) {
        let Some(report) = transform.tear_sheet() else {
            warn!(transform = transform.id(), "reporter transform produced no report");
            return;
        };
        if report.is_empty() {
            warn!(transform = transform.id(), "reporter transform produced empty report");
            return;
        }

        let mut cache = self.report_cache.lock();
        for asset in &self.asset_ids {
            if let Some(existing) = cache.get_mut(asset) {
                existing.merge_from(&report);
            } else {
                cache.insert(asset.clone(), report.clone());
            }
        }
    }

    /// Cache the selector artifact of one transform. Empty titles/schemas are silently
    /// dropped; valid selectors append per asset and are never merged.
    fn cache_selector_from_transform(&self, transform: &dyn Transform) {
        let Some(selector) = transform.selector_data() else {
            return;
        };
        if selector.title.is_empty() || selector.schemas.is_empty() {
            return;
        }

        let mut cache = self.selector_cache.lock();
        for asset in &self.asset_ids {
            cache.entry(asset.clone()).or_default().push(selector.clone());
        }
    }

    /// Snapshot of the accumulated per-asset report artifacts.
    ///
    /// Reports accumulate across executions on the same orchestrator: repeated fields grow on
    /// every re-run because merging appends without deduplication.
    pub fn generated_reports(&self) -> FnvIndexMap<AssetId, TearSheet> {
        self.report_cache.lock().clone()
    }

    /// Snapshot of the accumulated per-asset selector artifacts.
    pub fn generated_selectors(&self) -> FnvIndexMap<AssetId, Vec<SelectorData>> {
        self.selector_cache.lock().clone()
    }
}
