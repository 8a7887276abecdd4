//! Finds items whose recent activity only the secondary host knows about,
//! then ties them back to primary-tracker records.

use crate::error::Result;
use crate::executor::{decode, decode_optional, Connection, QueryExecutor};
use crate::queries;
use crate::reconcile::ItemMap;
use crate::records::{IssueRecord, SearchNode};
use crate::types::{RepoDescriptor, TrackedItem, UNKNOWN_PLACEMENT};
use crate::window::TimeWindow;
use crate::workspace;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Upper bound on the repo-clause part of one search query.
pub const MAX_SCOPE_LEN: usize = 200;

pub const SEARCH_PAGE_SIZE: u32 = 50;

/// Searches stop paginating after this many pages.
pub const MAX_SEARCH_PAGES: usize = 10;

const SEARCH_KINDS: [&str; 2] = ["is:issue", "is:pr"];

// ---------------------------------------------------------------------------
// Search scoping
// ---------------------------------------------------------------------------

/// Group `repo:owner/name` clauses into space-joined batches no longer than
/// `max_len`. A single clause longer than `max_len` gets a batch of its own.
pub fn batch_repo_clauses(repos: &[RepoDescriptor], max_len: usize) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current = String::new();
    for repo in repos {
        let clause = format!("repo:{}", repo.full_name());
        if !current.is_empty() && current.len() + 1 + clause.len() > max_len {
            batches.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&clause);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

fn search_query(scope: &str, window: &TimeWindow, kind: &str) -> String {
    format!(
        "{scope} updated:>={} {kind}",
        window.from.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Search the secondary host for items updated inside the window that the
/// primary scans did not return. `existing_refs` holds the `repo#number`
/// keys already known. Survivors carry synthetic ids and `Unknown` placement.
pub async fn discover(
    secondary: &dyn QueryExecutor,
    repos: &[RepoDescriptor],
    window: &TimeWindow,
    existing_refs: &HashSet<String>,
) -> Result<Vec<TrackedItem>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut found = Vec::new();

    for scope in batch_repo_clauses(repos, MAX_SCOPE_LEN) {
        for kind in SEARCH_KINDS {
            let query = search_query(&scope, window, kind);
            let mut after: Option<String> = None;

            for page_no in 1..=MAX_SEARCH_PAGES {
                let data = secondary
                    .execute(
                        queries::SEARCH_ACTIVITY,
                        json!({"query": query, "first": SEARCH_PAGE_SIZE, "after": after}),
                    )
                    .await?;
                let page: Connection<SearchNode> = decode(&data, "/search")?;
                let next = page.next_cursor().map(str::to_string);

                for node in page.nodes {
                    let Some(item) = node.into_item(UNKNOWN_PLACEMENT) else {
                        continue;
                    };
                    if item.updated_at > window.to
                        || existing_refs.contains(&item.reference)
                        || !seen.insert(item.reference.clone())
                    {
                        continue;
                    }
                    found.push(item);
                }

                match next {
                    Some(cursor) if page_no < MAX_SEARCH_PAGES => after = Some(cursor),
                    Some(_) => {
                        warn!(%query, "search truncated after {MAX_SEARCH_PAGES} pages");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    debug!(repos = repos.len(), found = found.len(), "secondary discovery done");
    Ok(found)
}

// ---------------------------------------------------------------------------
// Backfill
// ---------------------------------------------------------------------------

/// A discovered item matched to its primary-tracker record.
#[derive(Debug, Clone)]
pub struct BackfillOutcome {
    pub synthetic_id: String,
    pub item: TrackedItem,
}

/// Look up the primary record of each discovered item with at most
/// `concurrency` lookups in flight.
///
/// Items without a record, or whose lookup fails, produce no outcome and keep
/// their synthetic id. The workspace default-PR pipeline is fetched at most
/// once for the whole batch, and only if some record lacks a pipeline.
pub async fn backfill(
    primary: Arc<dyn QueryExecutor>,
    workspace_id: &str,
    items: Vec<TrackedItem>,
    concurrency: usize,
) -> Vec<BackfillOutcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let default_pipeline: Arc<OnceCell<Option<String>>> = Arc::new(OnceCell::new());
    let workspace_id: Arc<str> = Arc::from(workspace_id);
    let mut slots: Vec<Option<BackfillOutcome>> = vec![None; items.len()];
    let mut tasks = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let primary = primary.clone();
        let semaphore = semaphore.clone();
        let default_pipeline = default_pipeline.clone();
        let workspace_id = workspace_id.clone();
        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return (index, None);
            };
            let outcome =
                backfill_one(primary.as_ref(), &workspace_id, &default_pipeline, item).await;
            (index, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = outcome,
            Err(e) => warn!(error = %e, "backfill task failed"),
        }
    }

    let outcomes: Vec<BackfillOutcome> = slots.into_iter().flatten().collect();
    debug!(matched = outcomes.len(), "backfill done");
    outcomes
}

async fn backfill_one(
    primary: &dyn QueryExecutor,
    workspace_id: &str,
    default_pipeline: &OnceCell<Option<String>>,
    mut item: TrackedItem,
) -> Option<BackfillOutcome> {
    let Some(external_id) = item.repo_external_id else {
        debug!(item = %item.reference, "no repository id; cannot backfill");
        return None;
    };

    let record = match lookup(primary, workspace_id, external_id, item.number).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!(item = %item.reference, "not tracked by the primary backend");
            return None;
        }
        Err(e) => {
            warn!(item = %item.reference, error = %e, "backfill lookup failed");
            return None;
        }
    };

    let placement = match record.placement() {
        Some(name) => Some(name.to_string()),
        None => default_pipeline
            .get_or_init(|| async {
                match workspace::default_pr_pipeline(primary, workspace_id).await {
                    Ok(p) => p.map(|p| p.name),
                    Err(e) => {
                        warn!(error = %e, "default PR pipeline lookup failed");
                        None
                    }
                }
            })
            .await
            .clone(),
    };

    let synthetic_id = std::mem::replace(&mut item.id, record.id.clone());
    item.placement = placement.unwrap_or_else(|| UNKNOWN_PLACEMENT.to_string());
    if item.created_at.is_none() {
        item.created_at = record.created_at;
    }
    item.assignees.extend(record.assignees.nodes.into_iter().map(|l| l.login));
    Some(BackfillOutcome { synthetic_id, item })
}

async fn lookup(
    primary: &dyn QueryExecutor,
    workspace_id: &str,
    repository_external_id: i64,
    number: u64,
) -> Result<Option<IssueRecord>> {
    let data = primary
        .execute(
            queries::issue_by_info(),
            json!({
                "repositoryGhId": repository_external_id,
                "issueNumber": number,
                "workspaceId": workspace_id,
            }),
        )
        .await?;
    decode_optional(&data, "/issueByInfo")
}

/// Re-key backfilled items in `map`. When the real id is already present the
/// existing primary-scan entry is kept and the discovered copy dropped.
pub fn apply_backfill(map: &mut ItemMap, outcomes: Vec<BackfillOutcome>) {
    for outcome in outcomes {
        if map.remove(&outcome.synthetic_id).is_none() {
            continue;
        }
        if map.contains_key(&outcome.item.id) {
            debug!(id = %outcome.item.id, "discovered item already scanned; dropped");
            continue;
        }
        map.insert(outcome.item.id.clone(), outcome.item);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
