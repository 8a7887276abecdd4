use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Placement for items found by the closed-item scan.
pub const CLOSED_PLACEMENT: &str = "Closed";

/// Placement for items whose pipeline could not be determined.
pub const UNKNOWN_PLACEMENT: &str = "Unknown";

/// Prefix of ids assigned to items seen only on the secondary backend.
pub const SYNTHETIC_ID_PREFIX: &str = "gh:";

// ---------------------------------------------------------------------------
// EventSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Primary,
    Secondary,
}

impl EventSource {
    pub fn as_str(self) -> &'static str {
        match self {
            EventSource::Primary => "primary",
            EventSource::Secondary => "secondary",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One normalized timeline entry, regardless of which backend produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub time: DateTime<Utc>,
    pub source: EventSource,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// Merge event lists into one sequence ordered by time.
///
/// The sort is stable, so events sharing a timestamp keep the order in which
/// their lists were passed.
pub fn merge_events(lists: impl IntoIterator<Item = Vec<Event>>) -> Vec<Event> {
    let mut merged: Vec<Event> = lists.into_iter().flatten().collect();
    merged.sort_by_key(|e| e.time);
    merged
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub id: String,
    /// Repository id on the secondary host.
    pub external_id: i64,
    pub name: String,
    pub owner: String,
}

impl RepoDescriptor {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// TrackedItem
// ---------------------------------------------------------------------------

/// An issue or pull request observed during one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub placement: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignees: BTreeSet<String>,
    pub repo_name: String,
    pub repo_owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_external_id: Option<i64>,
    #[serde(default)]
    pub is_pr: bool,
    #[serde(default)]
    pub is_cross_source_item: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

impl TrackedItem {
    /// The most recent activity across both backends.
    pub fn display_updated_at(&self) -> DateTime<Utc> {
        match self.secondary_updated_at {
            Some(s) if s > self.updated_at => s,
            _ => self.updated_at,
        }
    }

    /// True until backfill replaces the secondary-source placeholder id.
    pub fn has_synthetic_id(&self) -> bool {
        is_synthetic_id(&self.id)
    }
}

/// Natural key shared by both backends: `repo#number`.
pub fn item_ref(repo_name: &str, number: u64) -> String {
    format!("{repo_name}#{number}")
}

pub fn synthetic_id(owner: &str, repo_name: &str, number: u64) -> String {
    format!("{SYNTHETIC_ID_PREFIX}{owner}/{repo_name}#{number}")
}

pub fn is_synthetic_id(id: &str) -> bool {
    id.starts_with(SYNTHETIC_ID_PREFIX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
