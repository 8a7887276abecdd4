//! Shared fixtures for unit tests.

use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::types::{item_ref, TrackedItem};
use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&str, &Value) -> Result<Value> + Send + Sync>;

/// In-process executor that answers every query through a closure and
/// records what it was asked.
pub(crate) struct MockExecutor {
    handler: Handler,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockExecutor {
    pub fn new(handler: impl Fn(&str, &Value) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Operation names of every call so far, in order.
    pub fn operations(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(q, _)| operation(q).to_string())
            .collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.operations().iter().filter(|o| *o == op).count()
    }

    pub fn variables(&self, op: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(q, _)| operation(q) == op)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl QueryExecutor for MockExecutor {
    fn execute<'a>(&'a self, query: &'a str, variables: Value) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), variables.clone()));
            // Let sibling tasks interleave the way a real transport would.
            tokio::task::yield_now().await;
            (self.handler)(query, &variables)
        })
    }
}

/// `query Foo(...)` → `Foo`.
pub(crate) fn operation(query: &str) -> &str {
    query
        .split_whitespace()
        .skip_while(|w| *w != "query")
        .nth(1)
        .map(|w| w.split('(').next().unwrap_or(w))
        .unwrap_or("")
}

/// Serve `nodes` as a cursor-paginated connection. The cursor is the next
/// start index.
pub(crate) fn paged(nodes: &[Value], vars: &Value) -> Value {
    let first = vars["first"].as_u64().unwrap_or(50) as usize;
    let start = vars["after"]
        .as_str()
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(0);
    let end = (start + first).min(nodes.len());
    let has_next = end < nodes.len();
    let page = &nodes[start.min(end)..end];
    let cursor = has_next.then(|| end.to_string());
    json!({
        "nodes": page,
        "pageInfo": {"hasNextPage": has_next, "endCursor": cursor}
    })
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

pub(crate) fn hours_ago(h: i64) -> DateTime<Utc> {
    now() - chrono::TimeDelta::hours(h)
}

/// A primary-tracker issue node as the GraphQL API returns it.
pub(crate) fn issue_node(
    id: &str,
    repo: &str,
    number: u64,
    updated_at: DateTime<Utc>,
    pipeline: Option<&str>,
) -> Value {
    json!({
        "id": id,
        "number": number,
        "title": format!("{repo} issue {number}"),
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": updated_at.to_rfc3339(),
        "ghUpdatedAt": null,
        "pullRequest": false,
        "repository": {"ghId": 1000, "name": repo, "ownerName": "acme"},
        "assignees": {"nodes": [{"login": "octo"}]},
        "pipelineIssue": pipeline.map(|p| json!({"pipeline": {"id": format!("pid-{p}"), "name": p}})),
    })
}

pub(crate) fn item(id: &str, repo: &str, number: u64, updated_at: DateTime<Utc>) -> TrackedItem {
    TrackedItem {
        id: id.to_string(),
        number,
        title: format!("{repo} issue {number}"),
        reference: item_ref(repo, number),
        placement: "Backlog".to_string(),
        updated_at,
        secondary_updated_at: None,
        created_at: None,
        assignees: BTreeSet::new(),
        repo_name: repo.to_string(),
        repo_owner: "acme".to_string(),
        repo_external_id: Some(1000),
        is_pr: false,
        is_cross_source_item: false,
        cross_reference: None,
        events: Vec::new(),
    }
}

#[test]
fn operation_name_is_extracted() {
    assert_eq!(operation(crate::queries::pipeline_issues()), "PipelineIssues");
    assert_eq!(operation(crate::queries::WORKSPACE_PIPELINES), "WorkspacePipelines");
}
