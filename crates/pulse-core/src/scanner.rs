use crate::error::Result;
use crate::executor::{decode, Connection, QueryExecutor};
use crate::queries;
use crate::records::IssueRecord;
use crate::types::{PipelineDescriptor, TrackedItem, CLOSED_PLACEMENT};
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// The closed container is read in one page of this size.
pub const CLOSED_PAGE_SIZE: u32 = 100;

/// Per-run parameters shared by every scan.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub workspace_id: String,
    pub page_size: u32,
}

impl ScanContext {
    pub fn new(workspace_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

// ---------------------------------------------------------------------------
// Window tests
// ---------------------------------------------------------------------------

/// Either timestamp falls inside the window.
pub fn in_window(
    window: &TimeWindow,
    primary: DateTime<Utc>,
    secondary: Option<DateTime<Utc>>,
) -> bool {
    window.contains(primary) || secondary.is_some_and(|s| window.contains(s))
}

/// Both timestamps are older than the window start.
pub fn is_past_cutoff(
    window: &TimeWindow,
    primary: DateTime<Utc>,
    secondary: Option<DateTime<Utc>>,
) -> bool {
    primary < window.from && secondary.map_or(true, |s| s < window.from)
}

// ---------------------------------------------------------------------------
// Pipeline scan
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PageOutcome {
    pub items: Vec<TrackedItem>,
    pub past_cutoff: bool,
}

/// Filter one page of records. The whole page is always examined; the cutoff
/// flag only decides whether another page is requested.
pub fn process_page(
    records: Vec<IssueRecord>,
    fallback_placement: &str,
    window: &TimeWindow,
) -> PageOutcome {
    let mut outcome = PageOutcome::default();
    for record in records {
        if is_past_cutoff(window, record.updated_at, record.gh_updated_at) {
            outcome.past_cutoff = true;
        }
        if in_window(window, record.updated_at, record.gh_updated_at) {
            outcome.items.push(record.into_item(fallback_placement));
        }
    }
    outcome
}

/// Page through one pipeline, most recently updated first, until a page
/// reaches items older than the window or the pipeline is exhausted.
pub async fn scan_pipeline(
    exec: &dyn QueryExecutor,
    ctx: &ScanContext,
    pipeline: &PipelineDescriptor,
    window: &TimeWindow,
) -> Result<Vec<TrackedItem>> {
    let mut items = Vec::new();
    let mut after: Option<String> = None;
    let mut pages = 0u32;

    loop {
        let data = exec
            .execute(
                queries::pipeline_issues(),
                json!({
                    "pipelineId": pipeline.id,
                    "workspaceId": ctx.workspace_id,
                    "first": ctx.page_size,
                    "after": after,
                }),
            )
            .await?;
        let page: Connection<IssueRecord> = decode(&data, "/searchIssuesByPipeline")?;
        pages += 1;

        let next = page.next_cursor().map(str::to_string);
        let outcome = process_page(page.nodes, &pipeline.name, window);
        items.extend(outcome.items);

        if outcome.past_cutoff {
            break;
        }
        match next {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    debug!(pipeline = %pipeline.name, pages, items = items.len(), "pipeline scanned");
    Ok(items)
}

// ---------------------------------------------------------------------------
// Closed scan
// ---------------------------------------------------------------------------

/// One bounded fetch of closed items; everything returned is placed in
/// [`CLOSED_PLACEMENT`].
pub async fn scan_closed(
    exec: &dyn QueryExecutor,
    ctx: &ScanContext,
    window: &TimeWindow,
) -> Result<Vec<TrackedItem>> {
    let data = exec
        .execute(
            queries::closed_issues(),
            json!({
                "workspaceId": ctx.workspace_id,
                "first": CLOSED_PAGE_SIZE,
            }),
        )
        .await?;
    let page: Connection<IssueRecord> = decode(&data, "/searchClosedIssues")?;

    let items: Vec<TrackedItem> = page
        .nodes
        .into_iter()
        .filter(|r| in_window(window, r.updated_at, r.gh_updated_at))
        .map(|r| {
            let mut item = r.into_item(CLOSED_PLACEMENT);
            item.placement = CLOSED_PLACEMENT.to_string();
            item
        })
        .collect();

    debug!(items = items.len(), "closed items scanned");
    Ok(items)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
