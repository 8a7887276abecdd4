//! One aggregation run: scan, discover, enrich, sort.

use crate::cache::Cache;
use crate::detail::{fetch_details, DetailSources};
use crate::discovery::{apply_backfill, backfill, discover};
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::reconcile::{reconcile, ItemMap};
use crate::scanner::{ScanContext, DEFAULT_PAGE_SIZE};
use crate::types::{PipelineDescriptor, RepoDescriptor, TrackedItem, CLOSED_PLACEMENT};
use crate::window::TimeWindow;
use crate::workspace;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Backends and cache used by a run.
#[derive(Clone)]
pub struct ActivitySources {
    pub primary: Arc<dyn QueryExecutor>,
    /// Absent when no secondary host is configured or it could not be set up.
    pub secondary: Option<Arc<dyn QueryExecutor>>,
    /// Why `secondary` is absent, when it was configured but unusable.
    pub secondary_error: Option<String>,
    pub cache: Arc<dyn Cache>,
}

/// Every behavior toggle of a run, built once from the command line.
#[derive(Debug, Clone)]
pub struct ActivityOptions {
    pub workspace_id: String,
    pub window: TimeWindow,
    /// Search the secondary host and merge its timelines.
    pub include_secondary: bool,
    /// Fetch per-item timelines.
    pub detail: bool,
    pub pipeline: Option<String>,
    pub repo: Option<String>,
    pub concurrency: usize,
    pub page_size: u32,
}

impl ActivityOptions {
    pub fn new(workspace_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            window,
            include_secondary: false,
            detail: false,
            pipeline: None,
            repo: None,
            concurrency: DEFAULT_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub item_count: usize,
    pub group_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Sorted by group, then most recent activity first.
    pub items: Vec<TrackedItem>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Run one aggregation.
///
/// Pipeline and repository filters are resolved before anything is scanned.
/// A failing primary scan fails the run; secondary-host problems become
/// report warnings.
pub async fn collect_activity(
    sources: &ActivitySources,
    options: &ActivityOptions,
) -> Result<ActivityReport> {
    let window = options.window;
    let ws = options.workspace_id.as_str();
    let mut warnings = Vec::new();

    let pipelines = workspace::pipelines(sources.primary.as_ref(), sources.cache.as_ref(), ws).await?;
    let scanned: Vec<PipelineDescriptor> = match &options.pipeline {
        Some(name) => vec![workspace::resolve_pipeline(&pipelines, name)?.clone()],
        None => pipelines.clone(),
    };
    let repo_filter: Option<RepoDescriptor> = match &options.repo {
        Some(name) => {
            let repos =
                workspace::repositories(sources.primary.as_ref(), sources.cache.as_ref(), ws)
                    .await?;
            Some(workspace::resolve_repo(&repos, name)?.clone())
        }
        None => None,
    };

    let ctx = ScanContext::new(ws, options.page_size);
    let mut map = reconcile(sources.primary.clone(), &ctx, &scanned, &window).await?;
    info!(items = map.len(), pipelines = scanned.len(), "primary scan complete");

    if options.include_secondary {
        match &sources.secondary {
            Some(secondary) => {
                if let Err(message) = merge_secondary(
                    sources,
                    secondary.as_ref(),
                    options,
                    repo_filter.as_ref(),
                    &mut map,
                )
                .await
                {
                    warn!("{message}");
                    warnings.push(message);
                }
            }
            None => {
                let message = match &sources.secondary_error {
                    Some(reason) => {
                        format!("secondary backend unavailable ({reason}); showing primary activity only")
                    }
                    None => "secondary backend not configured; showing primary activity only"
                        .to_string(),
                };
                warn!("{message}");
                warnings.push(message);
            }
        }
    }

    let mut items: Vec<TrackedItem> = map.into_values().collect();

    if options.pipeline.is_some() {
        // Discovered items may land in pipelines outside the filter.
        let others: HashSet<&str> = pipelines
            .iter()
            .filter(|p| !scanned.iter().any(|s| s.id == p.id))
            .map(|p| p.name.as_str())
            .collect();
        items.retain(|i| !others.contains(i.placement.as_str()));
    }
    if let Some(repo) = &repo_filter {
        items.retain(|i| {
            i.repo_name.eq_ignore_ascii_case(&repo.name)
                && (i.repo_owner.is_empty() || i.repo_owner.eq_ignore_ascii_case(&repo.owner))
        });
    }

    if options.detail {
        let detail_sources = DetailSources {
            primary: sources.primary.clone(),
            secondary: sources.secondary.clone(),
            concurrency: options.concurrency,
        };
        fetch_details(&detail_sources, &mut items, &window, options.include_secondary).await;
    }

    sort_items(&mut items, &pipelines);
    let group_count = items
        .iter()
        .map(|i| i.placement.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    Ok(ActivityReport {
        from: window.from,
        to: window.to,
        summary: Summary {
            item_count: items.len(),
            group_count,
        },
        items,
        warnings,
    })
}

/// Discover secondary-only items and backfill them into `map`. The error
/// value is the warning to report.
async fn merge_secondary(
    sources: &ActivitySources,
    secondary: &dyn QueryExecutor,
    options: &ActivityOptions,
    repo_filter: Option<&RepoDescriptor>,
    map: &mut ItemMap,
) -> std::result::Result<(), String> {
    let ws = options.workspace_id.as_str();
    let repos = match repo_filter {
        Some(repo) => vec![repo.clone()],
        None => workspace::repositories(sources.primary.as_ref(), sources.cache.as_ref(), ws)
            .await
            .map_err(|e| format!("could not list workspace repositories: {e}"))?,
    };

    let existing: HashSet<String> = map.values().map(|i| i.reference.clone()).collect();
    let found = discover(secondary, &repos, &options.window, &existing)
        .await
        .map_err(|e| format!("secondary discovery failed: {e}"))?;
    if found.is_empty() {
        return Ok(());
    }

    for item in &found {
        map.insert(item.id.clone(), item.clone());
    }
    let outcomes = backfill(sources.primary.clone(), ws, found, options.concurrency).await;
    debug!(backfilled = outcomes.len(), "applying backfill");
    apply_backfill(map, outcomes);
    Ok(())
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Canonical pipeline order, then `Closed`, then everything else by name.
fn group_rank<'a>(placement: &'a str, pipelines: &[PipelineDescriptor]) -> (usize, &'a str) {
    if let Some(index) = pipelines.iter().position(|p| p.name == placement) {
        (index, "")
    } else if placement == CLOSED_PLACEMENT {
        (pipelines.len(), "")
    } else {
        (pipelines.len() + 1, placement)
    }
}

/// Group order, then most recent activity first, then `ref`.
pub fn sort_items(items: &mut [TrackedItem], pipelines: &[PipelineDescriptor]) {
    items.sort_by(|a, b| {
        group_rank(&a.placement, pipelines)
            .cmp(&group_rank(&b.placement, pipelines))
            .then_with(|| b.display_updated_at().cmp(&a.display_updated_at()))
            .then_with(|| a.reference.cmp(&b.reference))
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
