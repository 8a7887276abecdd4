//! Wire shapes returned by the two backends and their conversion into
//! [`TrackedItem`]s.

use crate::executor::{Connection, Login};
use crate::types::{item_ref, synthetic_id, PipelineDescriptor, TrackedItem};
use chrono::{DateTime, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Primary tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRepository {
    #[serde(default)]
    pub gh_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub owner_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineMembership {
    #[serde(default)]
    pub pipeline: Option<PipelineDescriptor>,
}

/// An issue or pull request as the primary tracker reports it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Last activity on the secondary host, as mirrored by the tracker.
    #[serde(default)]
    pub gh_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: bool,
    pub repository: IssueRepository,
    #[serde(default)]
    pub assignees: Connection<Login>,
    #[serde(default)]
    pub pipeline_issue: Option<PipelineMembership>,
}

impl IssueRecord {
    /// Pipeline the record currently sits in, per its own membership data.
    pub fn placement(&self) -> Option<&str> {
        self.pipeline_issue
            .as_ref()
            .and_then(|m| m.pipeline.as_ref())
            .map(|p| p.name.as_str())
    }

    pub fn into_item(self, fallback_placement: &str) -> TrackedItem {
        let placement = self
            .placement()
            .unwrap_or(fallback_placement)
            .to_string();
        TrackedItem {
            reference: item_ref(&self.repository.name, self.number),
            id: self.id,
            number: self.number,
            title: self.title,
            placement,
            updated_at: self.updated_at,
            secondary_updated_at: self.gh_updated_at,
            created_at: self.created_at,
            assignees: self.assignees.nodes.into_iter().map(|l| l.login).collect(),
            repo_name: self.repository.name,
            repo_owner: self.repository.owner_name,
            repo_external_id: self.repository.gh_id,
            is_pr: self.pull_request,
            is_cross_source_item: false,
            cross_reference: None,
            events: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Secondary host
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRepository {
    pub name: String,
    #[serde(default)]
    pub database_id: Option<i64>,
    pub owner: Login,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub repository: SearchRepository,
    #[serde(default)]
    pub assignees: Connection<Login>,
}

/// One search hit. Discussions and other result kinds decode as `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum SearchNode {
    Issue(SearchItem),
    PullRequest(SearchItem),
    #[serde(other)]
    Other,
}

impl SearchNode {
    /// Convert a hit into an item placed in `placement` under a synthetic id.
    pub fn into_item(self, placement: &str) -> Option<TrackedItem> {
        let (hit, is_pr) = match self {
            SearchNode::Issue(hit) => (hit, false),
            SearchNode::PullRequest(hit) => (hit, true),
            SearchNode::Other => return None,
        };
        let owner = hit.repository.owner.login;
        Some(TrackedItem {
            id: synthetic_id(&owner, &hit.repository.name, hit.number),
            reference: item_ref(&hit.repository.name, hit.number),
            number: hit.number,
            title: hit.title,
            placement: placement.to_string(),
            updated_at: hit.updated_at,
            secondary_updated_at: Some(hit.updated_at),
            created_at: hit.created_at,
            assignees: hit.assignees.nodes.into_iter().map(|l| l.login).collect(),
            repo_name: hit.repository.name,
            repo_owner: owner,
            repo_external_id: hit.repository.database_id,
            is_pr,
            is_cross_source_item: true,
            cross_reference: None,
            events: Vec::new(),
        })
    }
}
