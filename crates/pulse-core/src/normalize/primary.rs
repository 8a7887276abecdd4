use super::{truncate, TITLE_LIMIT};
use crate::types::{Event, EventSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// Keys that only reorder items and are never shown.
const SUPPRESSED_KEYS: &[&str] = &["issue.change_pipeline_position", "issue.reorder"];

/// One raw timeline record from the primary tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrimaryEvent {
    /// Dot-namespaced event type, e.g. `issue.set_estimate`.
    pub key: String,
    /// Key-specific payload; some tracker versions send it JSON-encoded.
    #[serde(default)]
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

pub fn normalize_primary(raw: &RawPrimaryEvent) -> Option<Event> {
    let key = raw.key.trim();
    if key.is_empty() || SUPPRESSED_KEYS.contains(&key) {
        return None;
    }
    let data = payload(&raw.data);
    Some(Event {
        time: raw.created_at,
        source: EventSource::Primary,
        description: describe(key, &data),
        actor: text_at(&data, "/github_user/login"),
    })
}

/// The tracker sometimes ships `data` as a JSON-encoded string.
fn payload(data: &Value) -> Cow<'_, Value> {
    match data {
        Value::String(s) => serde_json::from_str::<Value>(s)
            .map(Cow::Owned)
            .unwrap_or(Cow::Borrowed(data)),
        _ => Cow::Borrowed(data),
    }
}

fn describe(key: &str, data: &Value) -> String {
    match key {
        "issue.set_estimate" => match (
            text_at(data, "/current_value"),
            text_at(data, "/previous_value"),
        ) {
            (Some(current), _) => format!("set estimate to {current}"),
            (None, Some(previous)) => format!("cleared estimate (was {previous})"),
            (None, None) => "cleared estimate".to_string(),
        },
        "issue.change_pipeline" => match (
            text_at(data, "/from_pipeline/name"),
            text_at(data, "/to_pipeline/name"),
        ) {
            (Some(from), Some(to)) => format!("moved from {from} to {to}"),
            (None, Some(to)) => format!("moved to {to}"),
            _ => "changed pipeline".to_string(),
        },
        "issue.add_blocking_issue" => {
            format!("marked as blocking {}", ref_or(data, "/blocked_issue", "another issue"))
        }
        "issue.remove_blocking_issue" => {
            format!("no longer blocking {}", ref_or(data, "/blocked_issue", "another issue"))
        }
        "issue.add_blocked_by_issue" => format!(
            "marked as blocked by {}",
            ref_or(data, "/blocking_issue", "another issue")
        ),
        "issue.remove_blocked_by_issue" => format!(
            "no longer blocked by {}",
            ref_or(data, "/blocking_issue", "another issue")
        ),
        "issue.connect_issue_to_pr" => {
            format!("connected to PR {}", ref_or(data, "/pull_request", "(unknown)"))
        }
        "issue.disconnect_issue_from_pr" => {
            format!("disconnected from PR {}", ref_or(data, "/pull_request", "(unknown)"))
        }
        "issue.connect_pr_to_issue" => {
            format!("connected to issue {}", ref_or(data, "/issue", "(unknown)"))
        }
        "issue.disconnect_pr_from_issue" => {
            format!("disconnected from issue {}", ref_or(data, "/issue", "(unknown)"))
        }
        "issue.set_priority" => match text_at(data, "/priority/name") {
            Some(p) => format!("set priority to {p}"),
            None => "set priority".to_string(),
        },
        "issue.remove_priority" => match text_at(data, "/previous_priority/name") {
            Some(p) => format!("removed priority (was {p})"),
            None => "removed priority".to_string(),
        },
        "issue.add_to_epic" => quoted("added to epic", text_at(data, "/epic/title")),
        "issue.remove_from_epic" => quoted("removed from epic", text_at(data, "/epic/title")),
        "issue.add_to_sprint" => named("added to sprint", text_at(data, "/sprint/name")),
        "issue.remove_from_sprint" => named("removed from sprint", text_at(data, "/sprint/name")),
        "issue.add_to_release" => quoted("added to release", text_at(data, "/release/title")),
        "issue.remove_from_release" => {
            quoted("removed from release", text_at(data, "/release/title"))
        }
        "issue.transfer_issue" => match (
            text_at(data, "/from_repository/name"),
            text_at(data, "/to_repository/name"),
        ) {
            (Some(from), Some(to)) => format!("transferred from {from} to {to}"),
            _ => "transferred".to_string(),
        },
        "issue.convert_to_epic" => "converted to epic".to_string(),
        other => humanize(other),
    }
}

/// `issue.some_unknown_event` → `some unknown event`.
fn humanize(key: &str) -> String {
    let stripped = key.strip_prefix("issue.").unwrap_or(key);
    stripped
        .replace(['_', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn quoted(prefix: &str, title: Option<String>) -> String {
    match title {
        Some(t) => format!("{prefix} \"{}\"", truncate(&t, TITLE_LIMIT)),
        None => prefix.to_string(),
    }
}

fn named(prefix: &str, name: Option<String>) -> String {
    match name {
        Some(n) => format!("{prefix} {n}"),
        None => prefix.to_string(),
    }
}

/// Scalar at a JSON pointer, rendered as text. Numbers keep their JSON form.
fn text_at(data: &Value, pointer: &str) -> Option<String> {
    match data.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `repo#number` for a nested issue object.
fn ref_or(data: &Value, pointer: &str, fallback: &str) -> String {
    let Some(issue) = data.pointer(pointer) else {
        return fallback.to_string();
    };
    let number = issue.get("number").and_then(Value::as_u64);
    let repo = text_at(issue, "/repository/name");
    match (repo, number) {
        (Some(repo), Some(n)) => format!("{repo}#{n}"),
        (None, Some(n)) => format!("#{n}"),
        _ => fallback.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(key: &str, data: Value) -> RawPrimaryEvent {
        RawPrimaryEvent {
            key: key.to_string(),
            data,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    fn describe_raw(key: &str, data: Value) -> String {
        normalize_primary(&raw(key, data)).unwrap().description
    }

    #[test]
    fn set_estimate_current_value() {
        assert_eq!(
            describe_raw("issue.set_estimate", json!({"current_value": "5.0"})),
            "set estimate to 5.0"
        );
    }

    #[test]
    fn set_estimate_cleared() {
        assert_eq!(
            describe_raw("issue.set_estimate", json!({"previous_value": "3.0"})),
            "cleared estimate (was 3.0)"
        );
    }

    #[test]
    fn set_estimate_numeric_value() {
        assert_eq!(
            describe_raw("issue.set_estimate", json!({"current_value": 8})),
            "set estimate to 8"
        );
    }

    #[test]
    fn change_pipeline_names_both_ends() {
        let d = describe_raw(
            "issue.change_pipeline",
            json!({"from_pipeline": {"name": "Backlog"}, "to_pipeline": {"name": "In Progress"}}),
        );
        assert!(d.contains("Backlog"));
        assert!(d.contains("In Progress"));
    }

    #[test]
    fn unknown_key_is_humanized() {
        assert_eq!(
            describe_raw("issue.some_unknown_event", json!({})),
            "some unknown event"
        );
        assert_eq!(describe_raw("epic.add_issue", json!({})), "epic add issue");
    }

    #[test]
    fn blocking_and_connection_refs() {
        assert_eq!(
            describe_raw(
                "issue.add_blocking_issue",
                json!({"blocked_issue": {"number": 12, "repository": {"name": "web"}}})
            ),
            "marked as blocking web#12"
        );
        assert_eq!(
            describe_raw(
                "issue.connect_issue_to_pr",
                json!({"pull_request": {"number": 40, "repository": {"name": "api"}}})
            ),
            "connected to PR api#40"
        );
        assert_eq!(
            describe_raw("issue.add_blocked_by_issue", json!({})),
            "marked as blocked by another issue"
        );
    }

    #[test]
    fn epic_title_is_truncated() {
        let long = "x".repeat(200);
        let d = describe_raw("issue.add_to_epic", json!({"epic": {"title": long}}));
        assert!(d.starts_with("added to epic \""));
        assert!(d.ends_with("…\""));
        assert!(d.chars().count() < 90);
    }

    #[test]
    fn actor_comes_from_github_user() {
        let e = normalize_primary(&raw(
            "issue.set_priority",
            json!({"priority": {"name": "High"}, "github_user": {"login": "octo"}}),
        ))
        .unwrap();
        assert_eq!(e.description, "set priority to High");
        assert_eq!(e.actor.as_deref(), Some("octo"));
        assert_eq!(e.source, EventSource::Primary);

        let e = normalize_primary(&raw("issue.convert_to_epic", json!({}))).unwrap();
        assert!(e.actor.is_none());
    }

    #[test]
    fn string_encoded_payload_is_parsed() {
        let d = describe_raw(
            "issue.add_to_sprint",
            Value::String(r#"{"sprint": {"name": "Sprint 14"}}"#.into()),
        );
        assert_eq!(d, "added to sprint Sprint 14");
    }

    #[test]
    fn reorder_keys_are_suppressed() {
        assert!(normalize_primary(&raw("issue.change_pipeline_position", json!({}))).is_none());
        assert!(normalize_primary(&raw("", json!({}))).is_none());
    }

    #[test]
    fn raw_event_deserializes_camel_case() {
        let e: RawPrimaryEvent = serde_json::from_value(json!({
            "key": "issue.transfer_issue",
            "data": {"from_repository": {"name": "a"}, "to_repository": {"name": "b"}},
            "createdAt": "2024-03-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(normalize_primary(&e).unwrap().description, "transferred from a to b");
    }
}
