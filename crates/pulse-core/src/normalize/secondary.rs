use super::{truncate, BODY_LIMIT, TITLE_LIMIT};
use crate::types::{Event, EventSource};
use chrono::{DateTime, Utc};
use serde::Deserialize;

// ─── Nested shapes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

/// A user, bot or team. Teams carry `name` instead of `login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Principal {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Principal {
    fn display(&self) -> Option<&str> {
        self.login.as_deref().or(self.name.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoName {
    pub name: String,
}

/// An issue or pull request referenced from another item's timeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemRef {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub repository: Option<RepoName>,
}

impl ItemRef {
    fn display(&self) -> String {
        match (&self.repository, self.number) {
            (Some(r), Some(n)) => format!("{}#{n}", r.name),
            (None, Some(n)) => format!("#{n}"),
            _ => "another item".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub abbreviated_oid: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<Actor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDetail {
    pub committed_date: DateTime<Utc>,
    pub abbreviated_oid: String,
    #[serde(default)]
    pub message_headline: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoWithOwner {
    pub name_with_owner: String,
}

// ─── TimelineItem ─────────────────────────────────────────────────────────

/// Every timeline record the secondary host can return.
/// Discriminated by the GraphQL `__typename` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename", rename_all_fields = "camelCase")]
pub enum TimelineItem {
    LabeledEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        label: Label,
    },
    UnlabeledEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        label: Label,
    },
    AssignedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        assignee: Option<Principal>,
    },
    UnassignedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        assignee: Option<Principal>,
    },
    ClosedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    ReopenedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    IssueComment {
        created_at: DateTime<Utc>,
        author: Option<Actor>,
        #[serde(default)]
        body: String,
    },
    PullRequestReview {
        created_at: DateTime<Utc>,
        author: Option<Actor>,
        state: String,
        #[serde(default)]
        body: String,
    },
    /// The only record without a top-level timestamp; both time and actor
    /// live on the nested commit.
    PullRequestCommit { commit: CommitDetail },
    MergedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        merge_ref_name: Option<String>,
    },
    RenamedTitleEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        previous_title: String,
        current_title: String,
    },
    MilestonedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        milestone_title: String,
    },
    DemilestonedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        milestone_title: String,
    },
    CrossReferencedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        source: ItemRef,
    },
    ReferencedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        commit: Option<CommitRef>,
    },
    ReviewRequestedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        requested_reviewer: Option<Principal>,
    },
    ReviewRequestRemovedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        requested_reviewer: Option<Principal>,
    },
    ReadyForReviewEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    ConvertToDraftEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    HeadRefForcePushedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    HeadRefDeletedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        head_ref_name: Option<String>,
    },
    LockedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    UnlockedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    PinnedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    UnpinnedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    TransferredEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        from_repository: Option<RepoWithOwner>,
    },
    ConnectedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        subject: ItemRef,
    },
    DisconnectedEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
        #[serde(default)]
        subject: ItemRef,
    },
    MarkedAsDuplicateEvent {
        created_at: DateTime<Utc>,
        actor: Option<Actor>,
    },
    /// Any record type without a user-facing rendering.
    #[serde(other)]
    Unknown,
}

// ─── Normalization ────────────────────────────────────────────────────────

pub fn normalize_secondary(item: &TimelineItem) -> Option<Event> {
    use TimelineItem::*;

    let (time, actor, description) = match item {
        LabeledEvent { created_at, actor, label } => {
            (created_at, login(actor), format!("added label {}", label.name))
        }
        UnlabeledEvent { created_at, actor, label } => {
            (created_at, login(actor), format!("removed label {}", label.name))
        }
        AssignedEvent { created_at, actor, assignee } => (
            created_at,
            login(actor),
            with_subject("assigned", assignee.as_ref().and_then(Principal::display)),
        ),
        UnassignedEvent { created_at, actor, assignee } => (
            created_at,
            login(actor),
            with_subject("unassigned", assignee.as_ref().and_then(Principal::display)),
        ),
        ClosedEvent { created_at, actor } => (created_at, login(actor), "closed".to_string()),
        ReopenedEvent { created_at, actor } => (created_at, login(actor), "reopened".to_string()),
        IssueComment { created_at, author, body } => {
            (created_at, login(author), quote_body("commented", body))
        }
        PullRequestReview { created_at, author, state, body } => {
            let verb = match state.as_str() {
                "APPROVED" => "approved",
                "CHANGES_REQUESTED" => "requested changes",
                "DISMISSED" => "review dismissed",
                "PENDING" => return None,
                _ => "reviewed",
            };
            (created_at, login(author), quote_body(verb, body))
        }
        PullRequestCommit { commit } => {
            let actor = commit.author.as_ref().and_then(|a| {
                a.user
                    .as_ref()
                    .map(|u| u.login.clone())
                    .or_else(|| a.name.clone())
            });
            let description = if commit.message_headline.trim().is_empty() {
                format!("committed {}", commit.abbreviated_oid)
            } else {
                format!(
                    "committed {}: {}",
                    commit.abbreviated_oid,
                    truncate(&commit.message_headline, TITLE_LIMIT)
                )
            };
            return Some(Event {
                time: commit.committed_date,
                source: EventSource::Secondary,
                description,
                actor,
            });
        }
        MergedEvent { created_at, actor, merge_ref_name } => (
            created_at,
            login(actor),
            match merge_ref_name {
                Some(base) => format!("merged into {base}"),
                None => "merged".to_string(),
            },
        ),
        RenamedTitleEvent { created_at, actor, previous_title, current_title } => (
            created_at,
            login(actor),
            format!(
                "renamed from \"{}\" to \"{}\"",
                truncate(previous_title, TITLE_LIMIT),
                truncate(current_title, TITLE_LIMIT)
            ),
        ),
        MilestonedEvent { created_at, actor, milestone_title } => (
            created_at,
            login(actor),
            format!("added to milestone {milestone_title}"),
        ),
        DemilestonedEvent { created_at, actor, milestone_title } => (
            created_at,
            login(actor),
            format!("removed from milestone {milestone_title}"),
        ),
        CrossReferencedEvent { created_at, actor, source } => (
            created_at,
            login(actor),
            format!("referenced from {}", source.display()),
        ),
        ReferencedEvent { created_at, actor, commit } => (
            created_at,
            login(actor),
            match commit {
                Some(c) => format!("referenced in commit {}", c.abbreviated_oid),
                None => "referenced in a commit".to_string(),
            },
        ),
        ReviewRequestedEvent { created_at, actor, requested_reviewer } => (
            created_at,
            login(actor),
            with_subject(
                "requested review from",
                requested_reviewer.as_ref().and_then(Principal::display),
            ),
        ),
        ReviewRequestRemovedEvent { created_at, actor, requested_reviewer } => (
            created_at,
            login(actor),
            with_subject(
                "removed review request for",
                requested_reviewer.as_ref().and_then(Principal::display),
            ),
        ),
        ReadyForReviewEvent { created_at, actor } => {
            (created_at, login(actor), "marked ready for review".to_string())
        }
        ConvertToDraftEvent { created_at, actor } => {
            (created_at, login(actor), "converted to draft".to_string())
        }
        HeadRefForcePushedEvent { created_at, actor } => {
            (created_at, login(actor), "force-pushed".to_string())
        }
        HeadRefDeletedEvent { created_at, actor, head_ref_name } => (
            created_at,
            login(actor),
            with_subject("deleted branch", head_ref_name.as_deref()),
        ),
        LockedEvent { created_at, actor } => {
            (created_at, login(actor), "locked conversation".to_string())
        }
        UnlockedEvent { created_at, actor } => {
            (created_at, login(actor), "unlocked conversation".to_string())
        }
        PinnedEvent { created_at, actor } => (created_at, login(actor), "pinned".to_string()),
        UnpinnedEvent { created_at, actor } => (created_at, login(actor), "unpinned".to_string()),
        TransferredEvent { created_at, actor, from_repository } => (
            created_at,
            login(actor),
            with_subject(
                "transferred from",
                from_repository.as_ref().map(|r| r.name_with_owner.as_str()),
            ),
        ),
        ConnectedEvent { created_at, actor, subject } => {
            (created_at, login(actor), format!("linked {}", subject.display()))
        }
        DisconnectedEvent { created_at, actor, subject } => {
            (created_at, login(actor), format!("unlinked {}", subject.display()))
        }
        MarkedAsDuplicateEvent { created_at, actor } => {
            (created_at, login(actor), "marked as duplicate".to_string())
        }
        Unknown => return None,
    };

    Some(Event {
        time: *time,
        source: EventSource::Secondary,
        description,
        actor,
    })
}

fn login(actor: &Option<Actor>) -> Option<String> {
    actor.as_ref().map(|a| a.login.clone())
}

fn with_subject(verb: &str, subject: Option<&str>) -> String {
    match subject {
        Some(s) => format!("{verb} {s}"),
        None => verb.to_string(),
    }
}

fn quote_body(verb: &str, body: &str) -> String {
    if body.trim().is_empty() {
        verb.to_string()
    } else {
        format!("{verb}: \"{}\"", truncate(body, BODY_LIMIT))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
