use crate::error::{PulseError, Result};
use crate::executor::QueryExecutor;
use crate::scanner::{scan_closed, scan_pipeline, ScanContext};
use crate::types::{PipelineDescriptor, TrackedItem};
use crate::window::TimeWindow;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// Items of one run keyed by id.
pub type ItemMap = BTreeMap<String, TrackedItem>;

/// Scan every pipeline and the closed container concurrently and merge the
/// results into one map.
///
/// Fails with the first error any scan reports; no partial map is returned.
/// When an id shows up more than once, the copy from the earliest source in
/// canonical order wins: pipelines in list order, then the closed scan.
pub async fn reconcile(
    exec: Arc<dyn QueryExecutor>,
    ctx: &ScanContext,
    pipelines: &[PipelineDescriptor],
    window: &TimeWindow,
) -> Result<ItemMap> {
    let mut tasks = JoinSet::new();

    for (index, pipeline) in pipelines.iter().cloned().enumerate() {
        let exec = exec.clone();
        let ctx = ctx.clone();
        let window = *window;
        tasks.spawn(async move {
            let result = scan_pipeline(exec.as_ref(), &ctx, &pipeline, &window).await;
            (index, result)
        });
    }

    let closed_index = pipelines.len();
    {
        let exec = exec.clone();
        let ctx = ctx.clone();
        let window = *window;
        tasks.spawn(async move {
            let result = scan_closed(exec.as_ref(), &ctx, &window).await;
            (closed_index, result)
        });
    }

    let mut slots: Vec<Option<Vec<TrackedItem>>> = vec![None; closed_index + 1];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.map_err(|e| PulseError::Task(e.to_string()))?;
        match result {
            Ok(items) => slots[index] = Some(items),
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    let mut map = ItemMap::new();
    let mut duplicates = 0usize;
    for item in slots.into_iter().flatten().flatten() {
        if map.contains_key(&item.id) {
            duplicates += 1;
            continue;
        }
        map.insert(item.id.clone(), item);
    }

    debug!(
        pipelines = pipelines.len(),
        items = map.len(),
        duplicates,
        "reconciled primary scans"
    );
    Ok(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
