use crate::{
    AssetId,
    engine::context::ExecutionContext,
    error::NodeError,
    session::slice_session_utc,
    transform::Transform,
};
use futures::future::join_all;
use quantflow_frame::DataFrame;
use std::sync::Arc;
use tracing::warn;

/// Drive one per-asset transform over the current input set.
///
/// Fans out one blocking worker per asset; each worker gathers inputs, applies the null-input
/// and session policies, runs the transform, and stores the result. Worker errors are trapped
/// and appended to the pipeline logger, never propagated: a failing (asset, transform) pair
/// must not kill peer executions already in flight.
pub(crate) async fn apply_default_transform(transform: Arc<dyn Transform>, ctx: ExecutionContext) {
    if skip_non_intraday(&transform, &ctx) {
        return;
    }

    let workers = ctx.storage.asset_ids().into_iter().map(|asset| {
        let transform = Arc::clone(&transform);
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(error) = process_asset(&asset, transform.as_ref(), &ctx) {
                ctx.logger.log(asset_error(&asset, transform.as_ref(), &error));
            }
        })
    });

    // Worker bodies never panic and route their own errors; join results are informational.
    join_all(workers).await;
}

fn process_asset(
    asset: &AssetId,
    transform: &dyn Transform,
    ctx: &ExecutionContext,
) -> Result<(), NodeError> {
    let mut frame = ctx.storage.gather_inputs(asset, transform)?;

    if !transform.metadata().allow_null_inputs {
        frame = frame.drop_null();
    }
    frame = apply_session_policy(frame, transform)?;

    let result = if frame.is_empty() {
        warn!(
            %asset,
            transform = transform.name(),
            "empty input table, skipping transform"
        );
        DataFrame::empty()
    } else {
        transform.apply(frame)?
    };

    ctx.storage.store_output(asset, transform, result)?;
    Ok(())
}

/// Drive one cross-sectional transform: gather one input series per asset, join them into a
/// single wide table, run the transform exactly once, then broadcast or distribute the result.
pub(crate) async fn apply_cross_section_transform(
    transform: Arc<dyn Transform>,
    ctx: ExecutionContext,
) {
    if skip_non_intraday(&transform, &ctx) {
        return;
    }

    if let Err(error) = cross_section(&transform, &ctx).await {
        ctx.logger.log(format!(
            "Transform: {}, Error: {error}.",
            transform.id()
        ));
    }
}

async fn cross_section(
    transform: &Arc<dyn Transform>,
    ctx: &ExecutionContext,
) -> Result<(), NodeError> {
    let input_handle = transform
        .primary_input()
        .cloned()
        .ok_or_else(|| NodeError::Contract("cross-sectional transform declares no input".into()))?;
    let output_handle = transform
        .primary_output()
        .ok_or_else(|| NodeError::Contract("cross-sectional transform declares no output".into()))?;

    let assets = ctx.storage.asset_ids();

    // Parallel per-asset input gathering; each worker yields the transform's input column
    // renamed to its asset id.
    let workers = assets.iter().cloned().map(|asset| {
        let transform = Arc::clone(transform);
        let ctx = ctx.clone();
        let input_handle = input_handle.clone();
        tokio::task::spawn_blocking(move || -> Result<DataFrame, NodeError> {
            let frame = ctx
                .storage
                .gather_inputs(&asset, transform.as_ref())?
                .drop_null();
            let frame = apply_session_policy(frame, transform.as_ref())?;
            let series = frame
                .column(input_handle.as_str())?
                .clone()
                .rename(asset.as_str());
            Ok(DataFrame::single(frame.index().clone(), series)?)
        })
    });

    let mut inputs = Vec::with_capacity(assets.len());
    for joined in join_all(workers).await {
        inputs.push(joined.map_err(|error| NodeError::Task(error.to_string()))??);
    }

    let cross = DataFrame::concat_columns(inputs)?.drop_null();
    let result = if cross.is_empty() {
        warn!(
            transform = transform.name(),
            "empty cross-sectional input table, skipping transform"
        );
        DataFrame::empty()
    } else {
        transform.apply(cross)?
    };

    if result.num_cols() == 1 && result.contains(output_handle.as_str()) {
        // Single-column result named after the output: identical values for every asset.
        for asset in &assets {
            ctx.storage
                .store_output(asset, transform.as_ref(), result.clone())?;
        }
    } else {
        // One column per asset: each asset pulls its own, absent assets get an empty frame.
        for asset in &assets {
            let asset_result = if result.contains(asset.as_str()) {
                DataFrame::single(
                    result.index().clone(),
                    result
                        .column(asset.as_str())?
                        .clone()
                        .rename(output_handle.as_str()),
                )?
            } else {
                DataFrame::empty()
            };
            ctx.storage
                .store_output(asset, transform.as_ref(), asset_result)?;
        }
    }

    Ok(())
}

/// Intraday-only transforms are skipped at non-intraday timeframes: every asset receives an
/// empty result (materialised as typed-null output columns) and the transform never runs.
fn skip_non_intraday(transform: &Arc<dyn Transform>, ctx: &ExecutionContext) -> bool {
    let timeframe = transform.timeframe();
    if !transform.metadata().intraday_only || timeframe.is_intraday() {
        return false;
    }

    warn!(
        transform = transform.name(),
        %timeframe,
        "transform is intraday-only but timeframe is not intraday, writing null outputs"
    );
    for asset in ctx.storage.asset_ids() {
        if let Err(error) = ctx
            .storage
            .store_output(&asset, transform.as_ref(), DataFrame::empty())
        {
            ctx.logger
                .log(asset_error(&asset, transform.as_ref(), &NodeError::from(error)));
        }
    }
    true
}

fn apply_session_policy(
    frame: DataFrame,
    transform: &dyn Transform,
) -> Result<DataFrame, NodeError> {
    if !transform.config().requires_session() {
        return Ok(frame);
    }
    match &transform.config().session {
        Some(range) => Ok(slice_session_utc(&frame, range)?),
        None => {
            warn!(
                transform = transform.name(),
                "session slicing requested but no session range was resolved"
            );
            Ok(frame)
        }
    }
}

fn asset_error(asset: &AssetId, transform: &dyn Transform, error: &NodeError) -> String {
    format!("Asset: {asset}, Transform: {}, Error: {error}.", transform.id())
}
