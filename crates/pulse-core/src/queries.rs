//! GraphQL documents sent to the two backends.
//!
//! Operation names are stable; tests dispatch on them.

use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Primary tracker
// ---------------------------------------------------------------------------

const TRACKED_ISSUE_FRAGMENT: &str = r#"
fragment TrackedIssue on Issue {
  id
  number
  title
  createdAt
  updatedAt
  ghUpdatedAt
  pullRequest
  repository { ghId name ownerName }
  assignees(first: 10) { nodes { login } }
  pipelineIssue(workspaceId: $workspaceId) { pipeline { id name } }
}
"#;

pub const WORKSPACE_PIPELINES: &str = r#"
query WorkspacePipelines($workspaceId: ID!) {
  workspace(id: $workspaceId) {
    pipelinesConnection(first: 100) { nodes { id name } }
  }
}
"#;

pub const WORKSPACE_REPOSITORIES: &str = r#"
query WorkspaceRepositories($workspaceId: ID!) {
  workspace(id: $workspaceId) {
    repositoriesConnection(first: 100) { nodes { id ghId name ownerName } }
  }
}
"#;

pub const DEFAULT_PR_PIPELINE: &str = r#"
query DefaultPrPipeline($workspaceId: ID!) {
  workspace(id: $workspaceId) {
    defaultPrPipeline { id name }
  }
}
"#;

pub const ISSUE_TIMELINE: &str = r#"
query IssueTimeline($issueId: ID!, $after: String) {
  node(id: $issueId) {
    ... on Issue {
      createdAt
      pullRequest
      timelineItems(first: 100, after: $after) {
        nodes { key data createdAt }
        pageInfo { hasNextPage endCursor }
      }
    }
  }
}
"#;

pub const CONNECTED_ISSUE: &str = r#"
query PullRequestConnectedIssue($issueId: ID!) {
  node(id: $issueId) {
    ... on Issue {
      connectedIssues(first: 1) { nodes { number repository { name } } }
    }
  }
}
"#;

static PIPELINE_ISSUES: OnceLock<String> = OnceLock::new();
static CLOSED_ISSUES: OnceLock<String> = OnceLock::new();
static ISSUE_BY_INFO: OnceLock<String> = OnceLock::new();

pub fn pipeline_issues() -> &'static str {
    PIPELINE_ISSUES.get_or_init(|| {
        format!(
            r#"
query PipelineIssues($pipelineId: ID!, $workspaceId: ID!, $first: Int!, $after: String) {{
  searchIssuesByPipeline(
    pipelineId: $pipelineId
    filters: {{}}
    order: {{ field: updated_at, direction: DESC }}
    first: $first
    after: $after
  ) {{
    nodes {{ ...TrackedIssue }}
    pageInfo {{ hasNextPage endCursor }}
  }}
}}
{TRACKED_ISSUE_FRAGMENT}"#
        )
    })
}

pub fn closed_issues() -> &'static str {
    CLOSED_ISSUES.get_or_init(|| {
        format!(
            r#"
query ClosedIssues($workspaceId: ID!, $first: Int!) {{
  searchClosedIssues(workspaceId: $workspaceId, filters: {{}}, first: $first) {{
    nodes {{ ...TrackedIssue }}
  }}
}}
{TRACKED_ISSUE_FRAGMENT}"#
        )
    })
}

pub fn issue_by_info() -> &'static str {
    ISSUE_BY_INFO.get_or_init(|| {
        format!(
            r#"
query IssueByInfo($repositoryGhId: Int!, $issueNumber: Int!, $workspaceId: ID!) {{
  issueByInfo(repositoryGhId: $repositoryGhId, issueNumber: $issueNumber) {{
    ...TrackedIssue
  }}
}}
{TRACKED_ISSUE_FRAGMENT}"#
        )
    })
}

// ---------------------------------------------------------------------------
// Secondary host
// ---------------------------------------------------------------------------

pub const SEARCH_ACTIVITY: &str = r#"
query SearchActivity($query: String!, $first: Int!, $after: String) {
  search(query: $query, type: ISSUE, first: $first, after: $after) {
    nodes {
      __typename
      ... on Issue {
        number title createdAt updatedAt
        repository { name databaseId owner { login } }
        assignees(first: 10) { nodes { login } }
      }
      ... on PullRequest {
        number title createdAt updatedAt
        repository { name databaseId owner { login } }
        assignees(first: 10) { nodes { login } }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
"#;

const TIMELINE_FRAGMENTS: &str = r#"
fragment Actor on Actor { login }
fragment ItemRef on ReferencedSubject {
  ... on Issue { number repository { name } }
  ... on PullRequest { number repository { name } }
}
fragment Labeled on LabeledEvent { createdAt actor { ...Actor } label { name } }
fragment Unlabeled on UnlabeledEvent { createdAt actor { ...Actor } label { name } }
fragment Assigned on AssignedEvent { createdAt actor { ...Actor } assignee { ... on User { login } ... on Bot { login } } }
fragment Unassigned on UnassignedEvent { createdAt actor { ...Actor } assignee { ... on User { login } ... on Bot { login } } }
fragment Closed on ClosedEvent { createdAt actor { ...Actor } }
fragment Reopened on ReopenedEvent { createdAt actor { ...Actor } }
fragment Comment on IssueComment { createdAt author { ...Actor } body }
fragment Renamed on RenamedTitleEvent { createdAt actor { ...Actor } previousTitle currentTitle }
fragment Milestoned on MilestonedEvent { createdAt actor { ...Actor } milestoneTitle }
fragment Demilestoned on DemilestonedEvent { createdAt actor { ...Actor } milestoneTitle }
fragment CrossReferenced on CrossReferencedEvent { createdAt actor { ...Actor } source { ...ItemRef } }
fragment Referenced on ReferencedEvent { createdAt actor { ...Actor } commit { abbreviatedOid } }
fragment Locked on LockedEvent { createdAt actor { ...Actor } }
fragment Unlocked on UnlockedEvent { createdAt actor { ...Actor } }
fragment Pinned on PinnedEvent { createdAt actor { ...Actor } }
fragment Unpinned on UnpinnedEvent { createdAt actor { ...Actor } }
fragment Transferred on TransferredEvent { createdAt actor { ...Actor } fromRepository { nameWithOwner } }
fragment Connected on ConnectedEvent { createdAt actor { ...Actor } subject { ...ItemRef } }
fragment Disconnected on DisconnectedEvent { createdAt actor { ...Actor } subject { ...ItemRef } }
fragment Duplicate on MarkedAsDuplicateEvent { createdAt actor { ...Actor } }
fragment Review on PullRequestReview { createdAt author { ...Actor } state body }
fragment Commit on PullRequestCommit { commit { committedDate abbreviatedOid messageHeadline author { name user { login } } } }
fragment Merged on MergedEvent { createdAt actor { ...Actor } mergeRefName }
fragment ReviewRequested on ReviewRequestedEvent { createdAt actor { ...Actor } requestedReviewer { ... on User { login } ... on Team { name } } }
fragment ReviewRequestRemoved on ReviewRequestRemovedEvent { createdAt actor { ...Actor } requestedReviewer { ... on User { login } ... on Team { name } } }
fragment ReadyForReview on ReadyForReviewEvent { createdAt actor { ...Actor } }
fragment ConvertToDraft on ConvertToDraftEvent { createdAt actor { ...Actor } }
fragment ForcePushed on HeadRefForcePushedEvent { createdAt actor { ...Actor } }
fragment HeadRefDeleted on HeadRefDeletedEvent { createdAt actor { ...Actor } headRefName }
"#;

const SHARED_SPREADS: &str = "__typename ...Labeled ...Unlabeled ...Assigned ...Unassigned \
    ...Closed ...Reopened ...Comment ...Renamed ...Milestoned ...Demilestoned \
    ...CrossReferenced ...Referenced ...Locked ...Unlocked ...Connected ...Disconnected \
    ...Duplicate";

const ISSUE_ONLY_SPREADS: &str = "...Pinned ...Unpinned ...Transferred";

const PR_ONLY_SPREADS: &str = "...Review ...Commit ...Merged ...ReviewRequested \
    ...ReviewRequestRemoved ...ReadyForReview ...ConvertToDraft ...ForcePushed ...HeadRefDeleted";

static ITEM_TIMELINE: OnceLock<String> = OnceLock::new();

pub fn item_timeline() -> &'static str {
    ITEM_TIMELINE.get_or_init(|| {
        format!(
            r#"
query ItemTimeline($owner: String!, $name: String!, $number: Int!, $since: DateTime, $after: String) {{
  repository(owner: $owner, name: $name) {{
    issueOrPullRequest(number: $number) {{
      __typename
      ... on Issue {{
        createdAt
        timelineItems(first: 100, since: $since, after: $after) {{
          nodes {{ {SHARED_SPREADS} {ISSUE_ONLY_SPREADS} }}
          pageInfo {{ hasNextPage endCursor }}
        }}
      }}
      ... on PullRequest {{
        createdAt
        timelineItems(first: 100, since: $since, after: $after) {{
          nodes {{ {SHARED_SPREADS} {PR_ONLY_SPREADS} }}
          pageInfo {{ hasNextPage endCursor }}
        }}
      }}
    }}
  }}
}}
{TIMELINE_FRAGMENTS}"#
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_queries_include_fragment_once() {
        for q in [pipeline_issues(), closed_issues(), issue_by_info()] {
            assert_eq!(q.matches("fragment TrackedIssue").count(), 1);
            assert!(q.contains("...TrackedIssue"));
        }
    }

    #[test]
    fn timeline_query_spreads_every_fragment() {
        let q = item_timeline();
        for name in ["Labeled", "Comment", "Commit", "Review", "Transferred"] {
            assert!(q.contains(&format!("...{name}")), "missing spread {name}");
            assert!(q.contains(&format!("fragment {name} on")), "missing fragment {name}");
        }
    }

    #[test]
    fn timeline_queries_are_paged() {
        for q in [ISSUE_TIMELINE, item_timeline()] {
            assert!(q.contains("$after: String"));
            assert!(q.contains("after: $after"));
            assert!(q.contains("pageInfo { hasNextPage endCursor }"));
        }
    }
}
