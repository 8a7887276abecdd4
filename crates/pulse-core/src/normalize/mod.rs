//! Conversion of backend-specific timeline records into [`Event`]s.
//!
//! Each backend has its own taxonomy. Both normalizers return `None` for
//! records that carry no user-facing meaning.
//!
//! [`Event`]: crate::types::Event

pub mod primary;
pub mod secondary;

pub use primary::{normalize_primary, RawPrimaryEvent};
pub use secondary::{normalize_secondary, TimelineItem};

/// Maximum characters kept from comment and review bodies.
pub const BODY_LIMIT: usize = 80;

/// Maximum characters kept from titles quoted inside a description.
pub const TITLE_LIMIT: usize = 60;

/// Collapse whitespace to single spaces and cut to `max` characters,
/// ending with an ellipsis when anything was dropped.
pub fn truncate(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let kept: String = collapsed.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_text() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_collapses_newlines() {
        assert_eq!(truncate("line one\n\n  line two", 80), "line one line two");
    }

    #[test]
    fn truncate_cuts_with_ellipsis() {
        let out = truncate("abcdefghijkl", 6);
        assert_eq!(out, "abcde…");
        assert_eq!(out.chars().count(), 6);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let out = truncate("ééééééé", 4);
        assert_eq!(out, "ééé…");
    }
}
