//! Locating result fragments inside raw timeline responses.
//!
//! Timeline-style endpoints deliver results inside a recursively nested
//! instruction tree whose wrapper keys vary by endpoint and have changed
//! historically. The walker performs a depth-first search over the decoded
//! JSON, recognizes addressable entries by shape, classifies them by the
//! prefix of their entry id, and yields them in document order. Node shapes
//! it does not recognize are skipped rather than rejected: staying functional
//! across minor upstream schema additions is worth more here than strict
//! validation, at the documented cost of silently dropping content the
//! walker does not understand.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

/// Position discriminator of a pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    Top,
    Bottom,
    ShowMore,
}

/// Classification of an addressable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Tweet,
    User,
    Cursor(CursorPosition),
    /// Removed or withheld content; carries only an id and a reason.
    Tombstone { reason: Option<String> },
    Trend,
}

/// One addressable node extracted from an instruction tree.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Full entry id as delivered (e.g. "tweet-123")
    pub entry_id: String,
    /// Trailing id segment (e.g. "123")
    pub id: String,
    pub kind: EntryKind,
    /// The entry's content payload
    pub content: Value,
}

impl Entry {
    /// Continuation token of a cursor entry. The platform nests the token
    /// under different wrappers per endpoint, so this searches the content.
    pub fn cursor_token(&self) -> Option<&str> {
        matches!(self.kind, EntryKind::Cursor(_))
            .then(|| find_first(&self.content, "value").and_then(Value::as_str))
            .flatten()
    }
}

/// Collect every recognized entry from an instruction tree, in document
/// order, with duplicates (by kind and id) removed keeping the first
/// occurrence. Promoted/ad entries are excluded by policy.
pub fn collect_entries(tree: &Value) -> Vec<Entry> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut skipped = 0usize;
    walk(tree, &mut out, &mut seen, &mut skipped);
    if skipped > 0 {
        debug!(skipped, "unrecognized entry shapes skipped during walk");
    }
    out
}

/// Collect entries whose entry id starts with the given prefix.
pub fn entries_with_prefix(tree: &Value, prefix: &str) -> Vec<Entry> {
    collect_entries(tree)
        .into_iter()
        .filter(|e| e.entry_id.starts_with(prefix))
        .collect()
}

fn walk(node: &Value, out: &mut Vec<Entry>, seen: &mut HashSet<(u8, String)>, skipped: &mut usize) {
    match node {
        Value::Object(map) => {
            if let Some(entry_id) = map.get("entryId").and_then(Value::as_str) {
                let content = map.get("content").or_else(|| map.get("item"));
                if let Some(content) = content.filter(|c| c.is_object()) {
                    match classify(entry_id, content) {
                        Classified::Entry(kind) => {
                            let id = trailing_id(entry_id);
                            if seen.insert((kind_tag(&kind), id.clone())) {
                                out.push(Entry {
                                    entry_id: entry_id.to_string(),
                                    id,
                                    kind,
                                    content: content.clone(),
                                });
                            }
                            return;
                        }
                        Classified::Promoted => return,
                        Classified::Unrecognized => {
                            *skipped += 1;
                            // A module-style wrapper can still hold real
                            // entries below it.
                            walk(content, out, seen, skipped);
                            return;
                        }
                    }
                }
            }
            for value in map.values() {
                walk(value, out, seen, skipped);
            }
        }
        Value::Array(values) => {
            for value in values {
                walk(value, out, seen, skipped);
            }
        }
        _ => {}
    }
}

enum Classified {
    Entry(EntryKind),
    Promoted,
    Unrecognized,
}

fn classify(entry_id: &str, content: &Value) -> Classified {
    if entry_id.contains("promoted")
        || entry_id.contains("Promoted")
        || find_first(content, "promotedMetadata").is_some()
    {
        return Classified::Promoted;
    }

    if entry_id.starts_with("tweet") || entry_id.starts_with("search-grid") {
        if is_tombstone(content) {
            return Classified::Entry(EntryKind::Tombstone {
                reason: tombstone_reason(content),
            });
        }
        return Classified::Entry(EntryKind::Tweet);
    }
    if entry_id.starts_with("user") {
        return Classified::Entry(EntryKind::User);
    }
    if entry_id.starts_with("cursor-top") {
        return Classified::Entry(EntryKind::Cursor(CursorPosition::Top));
    }
    if entry_id.starts_with("cursor-bottom") {
        return Classified::Entry(EntryKind::Cursor(CursorPosition::Bottom));
    }
    if entry_id.starts_with("cursor-showmore") {
        return Classified::Entry(EntryKind::Cursor(CursorPosition::ShowMore));
    }
    if entry_id.starts_with("trend") {
        return Classified::Entry(EntryKind::Trend);
    }
    Classified::Unrecognized
}

fn is_tombstone(content: &Value) -> bool {
    if find_first(content, "tweetDisplayType").and_then(Value::as_str) == Some("Tombstone") {
        return true;
    }
    // Tombstoned results replace the result object wholesale.
    find_first(content, "result")
        .and_then(|r| r.get("__typename"))
        .and_then(Value::as_str)
        == Some("TweetTombstone")
}

fn tombstone_reason(content: &Value) -> Option<String> {
    find_first(content, "tombstoneInfo")
        .or_else(|| find_first(content, "tombstone"))
        .and_then(|info| find_first(info, "text"))
        .and_then(|text| {
            // Either a bare string or a rich-text object with a "text" field.
            text.as_str()
                .or_else(|| text.get("text").and_then(Value::as_str))
        })
        .map(str::to_string)
}

fn trailing_id(entry_id: &str) -> String {
    entry_id.rsplit('-').next().unwrap_or(entry_id).to_string()
}

// Cursors at different positions share trailing id segments (e.g.
// "cursor-top-0" and "cursor-bottom-0"), so each position gets its own tag.
fn kind_tag(kind: &EntryKind) -> u8 {
    match kind {
        EntryKind::Tweet => 0,
        EntryKind::User => 1,
        EntryKind::Cursor(CursorPosition::Top) => 2,
        EntryKind::Cursor(CursorPosition::Bottom) => 3,
        EntryKind::Cursor(CursorPosition::ShowMore) => 4,
        EntryKind::Tombstone { .. } => 5,
        EntryKind::Trend => 6,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extract-or-default accessors
//
// Upstream payload omissions are common and non-fatal; every hydrator funnels
// field access through these so the degrade-not-fail policy lives in one
// place.
// ─────────────────────────────────────────────────────────────────────────────

/// Follow a fixed key path into a JSON object tree.
pub(crate) fn path<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in keys {
        current = current.get(key)?;
    }
    Some(current)
}

/// Depth-first search for the first occurrence of a key, in document order.
/// Used where the platform moves a field between wrappers across endpoint
/// versions.
pub(crate) fn find_first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                return Some(found);
            }
            map.values().find_map(|v| find_first(v, key))
        }
        Value::Array(values) => values.iter().find_map(|v| find_first(v, key)),
        _ => None,
    }
}

/// String at a fixed path, or `None`.
pub(crate) fn str_at<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    path(value, keys).and_then(Value::as_str)
}

/// Count at a fixed path; absent or non-numeric degrades to 0. Accepts
/// numeric strings, which the platform uses for some counters.
pub(crate) fn count_at(value: &Value, keys: &[&str]) -> u64 {
    match path(value, keys) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Bool at a fixed path; absent degrades to false.
pub(crate) fn bool_at(value: &Value, keys: &[&str]) -> bool {
    path(value, keys).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tweet_entry(id: &str) -> Value {
        json!({
            "entryId": format!("tweet-{id}"),
            "content": {
                "itemContent": {
                    "tweet_results": {
                        "result": {
                            "rest_id": id,
                            "legacy": {"full_text": "hi"}
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn finds_entries_regardless_of_wrapper_names() {
        // The same three entries under three different nesting conventions.
        let trees = [
            json!({"instructions": [{"entries": [tweet_entry("1"), tweet_entry("2"), tweet_entry("3")]}]}),
            json!({"data": {"timeline_v2": {"timeline": {"instructions": [{"type": "TimelineAddEntries", "entries": [tweet_entry("1"), tweet_entry("2"), tweet_entry("3")]}]}}}}),
            json!({"wrapped": [{"oddly": {"named": [tweet_entry("1"), tweet_entry("2"), tweet_entry("3")]}}]}),
        ];
        for tree in &trees {
            let entries = collect_entries(tree);
            assert_eq!(entries.len(), 3);
            let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
            assert_eq!(ids, ["1", "2", "3"]);
            assert!(entries.iter().all(|e| e.kind == EntryKind::Tweet));
        }
    }

    #[test]
    fn spec_shape_yields_single_tweet_entry() {
        let tree = json!({"instructions": [{"entries": [{
            "entryId": "tweet-123",
            "content": {"itemContent": {"tweet_results": {"result": {
                "rest_id": "123",
                "legacy": {"full_text": "hi"}
            }}}}
        }]}]});

        let entries = collect_entries(&tree);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "123");
        assert_eq!(entries[0].kind, EntryKind::Tweet);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let tree = json!({"entries": [tweet_entry("9"), tweet_entry("9"), tweet_entry("10")]});
        let entries = collect_entries(&tree);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "9");
        assert_eq!(entries[1].id, "10");
    }

    #[test]
    fn promoted_entries_are_excluded() {
        let tree = json!({"entries": [
            {"entryId": "promoted-tweet-55", "content": {"itemContent": {}}},
            tweet_entry("56"),
            {"entryId": "tweet-57", "content": {"itemContent": {"promotedMetadata": {"advertiserId": "1"}}}},
        ]});
        let entries = collect_entries(&tree);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "56");
    }

    #[test]
    fn tombstone_yields_tombstone_variant() {
        let tree = json!({"entries": [{
            "entryId": "tweet-999",
            "content": {"itemContent": {"tweetDisplayType": "Tombstone"}}
        }]});
        let entries = collect_entries(&tree);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "999");
        assert!(matches!(entries[0].kind, EntryKind::Tombstone { .. }));
    }

    #[test]
    fn tombstone_reason_is_extracted() {
        let tree = json!({"entries": [{
            "entryId": "tweet-999",
            "content": {"itemContent": {
                "tweetDisplayType": "Tombstone",
                "tombstoneInfo": {"richText": {"text": "You're unable to view this Tweet."}}
            }}
        }]});
        let entries = collect_entries(&tree);
        match &entries[0].kind {
            EntryKind::Tombstone { reason } => {
                assert_eq!(reason.as_deref(), Some("You're unable to view this Tweet."));
            }
            other => panic!("expected tombstone, got {other:?}"),
        }
    }

    #[test]
    fn cursors_classify_by_position_and_expose_tokens() {
        let tree = json!({"entries": [
            {"entryId": "cursor-top-1", "content": {"value": "PREV_TOKEN"}},
            tweet_entry("5"),
            {"entryId": "cursor-bottom-2", "content": {"itemContent": {"value": "NEXT_TOKEN"}}},
        ]});
        let entries = collect_entries(&tree);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, EntryKind::Cursor(CursorPosition::Top));
        assert_eq!(entries[0].cursor_token(), Some("PREV_TOKEN"));
        assert_eq!(entries[2].kind, EntryKind::Cursor(CursorPosition::Bottom));
        assert_eq!(entries[2].cursor_token(), Some("NEXT_TOKEN"));
    }

    #[test]
    fn cursors_with_shared_index_are_not_deduplicated() {
        // Both positions commonly carry the same trailing segment.
        let tree = json!({"entries": [
            {"entryId": "cursor-top-0", "content": {"value": "PREV"}},
            tweet_entry("5"),
            {"entryId": "cursor-bottom-0", "content": {"value": "NEXT"}},
        ]});
        let entries = collect_entries(&tree);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, EntryKind::Cursor(CursorPosition::Top));
        assert_eq!(entries[2].kind, EntryKind::Cursor(CursorPosition::Bottom));
        assert_eq!(entries[2].cursor_token(), Some("NEXT"));
    }

    #[test]
    fn module_wrappers_are_descended_into() {
        // A module entry with an unrecognized id still exposes its items.
        let tree = json!({"entries": [{
            "entryId": "profile-conversation-1",
            "content": {"items": [tweet_entry("71"), tweet_entry("72")]}
        }]});
        let entries = collect_entries(&tree);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "71");
    }

    #[test]
    fn unrecognized_shapes_are_skipped_silently() {
        let tree = json!({"entries": [
            {"entryId": "who-to-follow-module", "content": {"displayType": "Vertical"}},
            tweet_entry("88"),
            {"someOtherShape": true},
        ]});
        let entries = collect_entries(&tree);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "88");
    }

    #[test]
    fn entries_with_prefix_filters() {
        let tree = json!({"entries": [
            tweet_entry("1"),
            {"entryId": "user-42", "content": {"itemContent": {"user_results": {"result": {"rest_id": "42"}}}}},
        ]});
        let tweets = entries_with_prefix(&tree, "tweet");
        assert_eq!(tweets.len(), 1);
        let users = entries_with_prefix(&tree, "user");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].kind, EntryKind::User);
    }

    #[test]
    fn accessors_degrade_to_defaults() {
        let value = json!({"legacy": {"favorite_count": 3, "reply_count": "12", "favorited": true}});
        assert_eq!(count_at(&value, &["legacy", "favorite_count"]), 3);
        assert_eq!(count_at(&value, &["legacy", "reply_count"]), 12);
        assert_eq!(count_at(&value, &["legacy", "retweet_count"]), 0);
        assert!(bool_at(&value, &["legacy", "favorited"]));
        assert!(!bool_at(&value, &["legacy", "bookmarked"]));
        assert_eq!(str_at(&value, &["legacy", "full_text"]), None);
    }

    #[test]
    fn find_first_is_document_order() {
        let value = json!({"a": [{"k": "first"}], "z": {"k": "second"}});
        assert_eq!(
            find_first(&value, "k").and_then(Value::as_str),
            Some("first")
        );
    }
}
