//! Per-item timeline enrichment.

use crate::error::Result;
use crate::executor::{decode_optional, Connection, QueryExecutor};
use crate::normalize::{normalize_primary, normalize_secondary, RawPrimaryEvent, TimelineItem};
use crate::queries;
use crate::types::{item_ref, merge_events, Event, EventSource, TrackedItem};
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Timelines stop paginating after this many pages.
pub const MAX_TIMELINE_PAGES: usize = 10;

/// Where timelines come from and how hard to hit them.
#[derive(Clone)]
pub struct DetailSources {
    pub primary: Arc<dyn QueryExecutor>,
    pub secondary: Option<Arc<dyn QueryExecutor>>,
    pub concurrency: usize,
}

/// Everything the fetcher learns about one item.
#[derive(Debug, Clone, Default)]
struct Detail {
    events: Vec<Event>,
    is_pr: bool,
    created_at: Option<DateTime<Utc>>,
    cross_reference: Option<String>,
}

/// Fetch and normalize the timeline of every item, writing `events`,
/// `is_pr`, `created_at` and `cross_reference` back in place.
///
/// The secondary timeline is read when `include_secondary` is set or the item
/// was discovered on the secondary host. A failed fetch is logged and leaves
/// that part of the item untouched.
pub async fn fetch_details(
    sources: &DetailSources,
    items: &mut [TrackedItem],
    window: &TimeWindow,
    include_secondary: bool,
) {
    let semaphore = Arc::new(Semaphore::new(sources.concurrency.max(1)));
    let mut slots: Vec<Option<Detail>> = vec![None; items.len()];
    let mut tasks = JoinSet::new();

    for (index, item) in items.iter().enumerate() {
        let sources = sources.clone();
        let semaphore = semaphore.clone();
        let item = item.clone();
        let window = *window;
        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return (index, None);
            };
            let detail = fetch_one(&sources, &item, &window, include_secondary).await;
            (index, Some(detail))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, detail)) => slots[index] = detail,
            Err(e) => warn!(error = %e, "detail task failed"),
        }
    }

    let mut enriched = 0usize;
    for (item, detail) in items.iter_mut().zip(slots) {
        let Some(detail) = detail else { continue };
        item.events = detail.events;
        item.is_pr = detail.is_pr;
        item.created_at = detail.created_at;
        item.cross_reference = detail.cross_reference;
        enriched += 1;
    }
    debug!(items = enriched, "details fetched");
}

async fn fetch_one(
    sources: &DetailSources,
    item: &TrackedItem,
    window: &TimeWindow,
    include_secondary: bool,
) -> Detail {
    let mut detail = Detail {
        events: Vec::new(),
        is_pr: item.is_pr,
        created_at: item.created_at,
        cross_reference: item.cross_reference.clone(),
    };
    let mut lists: Vec<Vec<Event>> = Vec::new();

    if !item.has_synthetic_id() {
        match primary_timeline(sources.primary.as_ref(), &item.id).await {
            Ok(Some(t)) => {
                detail.is_pr |= t.pull_request;
                detail.created_at = detail.created_at.or(t.created_at);
                lists.push(
                    t.timeline_items
                        .nodes
                        .iter()
                        .filter_map(normalize_primary)
                        .filter(|e| window.contains(e.time))
                        .collect(),
                );
            }
            Ok(None) => debug!(item = %item.reference, "primary timeline not found"),
            Err(e) => warn!(item = %item.reference, error = %e, "primary timeline fetch failed"),
        }

        if detail.is_pr && detail.cross_reference.is_none() {
            match connected_issue(sources.primary.as_ref(), &item.id).await {
                Ok(found) => detail.cross_reference = found,
                Err(e) => warn!(item = %item.reference, error = %e, "connected issue lookup failed"),
            }
        }
    }

    if let Some(secondary) = &sources.secondary {
        if include_secondary || item.is_cross_source_item {
            match secondary_timeline(secondary.as_ref(), item, window).await {
                Ok(Some(t)) => {
                    detail.is_pr |= t.typename == "PullRequest";
                    detail.created_at = detail.created_at.or(t.created_at);
                    lists.push(
                        t.timeline_items
                            .nodes
                            .iter()
                            .filter_map(normalize_secondary)
                            .filter(|e| window.contains(e.time))
                            .collect(),
                    );
                }
                Ok(None) => debug!(item = %item.reference, "secondary timeline not found"),
                Err(e) => {
                    warn!(item = %item.reference, error = %e, "secondary timeline fetch failed")
                }
            }
        }
    }

    if let Some(created) = detail.created_at.filter(|t| window.contains(*t)) {
        let source = if item.has_synthetic_id() {
            EventSource::Secondary
        } else {
            EventSource::Primary
        };
        lists.insert(
            0,
            vec![Event {
                time: created,
                source,
                description: "created".to_string(),
                actor: None,
            }],
        );
    }

    detail.events = merge_events(lists);
    detail
}

// ---------------------------------------------------------------------------
// Fetches
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrimaryTimeline {
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pull_request: bool,
    #[serde(default)]
    timeline_items: Connection<RawPrimaryEvent>,
}

async fn primary_timeline(exec: &dyn QueryExecutor, id: &str) -> Result<Option<PrimaryTimeline>> {
    let mut timeline: Option<PrimaryTimeline> = None;
    let mut after: Option<String> = None;

    for page_no in 1..=MAX_TIMELINE_PAGES {
        let data = exec
            .execute(queries::ISSUE_TIMELINE, json!({"issueId": id, "after": after}))
            .await?;
        let page: Option<PrimaryTimeline> = decode_optional(&data, "/node")?;
        let Some(page) = page else { break };
        let next = page.timeline_items.next_cursor().map(str::to_string);

        match timeline.as_mut() {
            Some(t) => t.timeline_items.nodes.extend(page.timeline_items.nodes),
            None => timeline = Some(page),
        }

        match next_page(next, page_no, id) {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    Ok(timeline)
}

/// Cursor to request next, or `None` when the timeline is exhausted or the
/// page cap is reached.
fn next_page(next: Option<String>, page_no: usize, item: &str) -> Option<String> {
    match next {
        Some(cursor) if page_no < MAX_TIMELINE_PAGES => Some(cursor),
        Some(_) => {
            warn!(item, "timeline truncated after {MAX_TIMELINE_PAGES} pages");
            None
        }
        None => None,
    }
}

#[derive(Debug, Deserialize)]
struct ConnectedRepo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ConnectedIssue {
    number: u64,
    repository: ConnectedRepo,
}

/// `repo#number` of the first issue a pull request is connected to.
async fn connected_issue(exec: &dyn QueryExecutor, id: &str) -> Result<Option<String>> {
    let data = exec
        .execute(queries::CONNECTED_ISSUE, json!({"issueId": id}))
        .await?;
    let conn: Option<Connection<ConnectedIssue>> =
        decode_optional(&data, "/node/connectedIssues")?;
    Ok(conn
        .and_then(|c| c.nodes.into_iter().next())
        .map(|i| item_ref(&i.repository.name, i.number)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecondaryTimeline {
    #[serde(rename = "__typename")]
    typename: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    timeline_items: Connection<TimelineItem>,
}

async fn secondary_timeline(
    exec: &dyn QueryExecutor,
    item: &TrackedItem,
    window: &TimeWindow,
) -> Result<Option<SecondaryTimeline>> {
    let mut timeline: Option<SecondaryTimeline> = None;
    let mut after: Option<String> = None;

    for page_no in 1..=MAX_TIMELINE_PAGES {
        let data = exec
            .execute(
                queries::item_timeline(),
                json!({
                    "owner": item.repo_owner,
                    "name": item.repo_name,
                    "number": item.number,
                    "since": window.from.to_rfc3339(),
                    "after": after,
                }),
            )
            .await?;
        let page: Option<SecondaryTimeline> =
            decode_optional(&data, "/repository/issueOrPullRequest")?;
        let Some(page) = page else { break };
        let next = page.timeline_items.next_cursor().map(str::to_string);

        match timeline.as_mut() {
            Some(t) => t.timeline_items.nodes.extend(page.timeline_items.nodes),
            None => timeline = Some(page),
        }

        match next_page(next, page_no, &item.reference) {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    Ok(timeline)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
