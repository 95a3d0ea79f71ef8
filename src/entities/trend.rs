//! Trending topic entity.

use serde_json::Value;

use crate::raw::{self, str_at};

/// One trending topic.
///
/// The volume indicator is served as display text (e.g. "12.3K posts"), so
/// it is kept verbatim rather than parsed into a number.
#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    pub name: String,
    /// Context line, e.g. "Trending in United States"
    pub domain_context: String,
    /// Display-formatted volume, when present
    pub meta_description: Option<String>,
    /// Names of trends grouped under this one
    pub grouped_trends: Vec<String>,
}

impl Trend {
    /// Hydrate from a trend entry's content payload. Trends have no id
    /// field upstream; a missing name yields `None` and the entry is
    /// skipped.
    pub(crate) fn from_entry_content(content: &Value) -> Option<Self> {
        let item = raw::find_first(content, "trend").unwrap_or(content);
        let name = str_at(item, &["name"])?.to_string();
        let grouped_trends = item
            .get("groupedTrends")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            name,
            domain_context: str_at(item, &["trendMetadata", "domainContext"])
                .unwrap_or_default()
                .to_string(),
            meta_description: str_at(item, &["trendMetadata", "metaDescription"])
                .map(str::to_string),
            grouped_trends,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hydrates_from_entry_content() {
        let content = json!({"itemContent": {"trend": {
            "name": "#RustLang",
            "trendMetadata": {
                "domainContext": "Trending in Technology",
                "metaDescription": "35.4K posts"
            },
            "groupedTrends": [{"name": "cargo"}, {"name": "borrowck"}]
        }}});
        let trend = Trend::from_entry_content(&content).unwrap();
        assert_eq!(trend.name, "#RustLang");
        assert_eq!(trend.meta_description.as_deref(), Some("35.4K posts"));
        assert_eq!(trend.grouped_trends, vec!["cargo", "borrowck"]);
    }

    #[test]
    fn nameless_trend_is_skipped() {
        assert!(Trend::from_entry_content(&json!({"trend": {}})).is_none());
    }
}
