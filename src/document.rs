//! Activity documents returned by the extraction API.
//!
//! The upstream payload is schema-less, so every field is optional and any
//! unexpected shape degrades to an empty value instead of failing the decode.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// A single activity entry (a post, repost, ...) as an ordered field map.
pub type ActivityItem = Map<String, Value>;

pub const CREDITS_PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Post,
    Repost,
    CommentedPost,
    ReactedPost,
}

impl ActivityKind {
    /// Kinds in the order their rows are emitted.
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::Post,
        ActivityKind::Repost,
        ActivityKind::CommentedPost,
        ActivityKind::ReactedPost,
    ];

    /// Value written to the `type` column.
    pub fn tag(self) -> &'static str {
        match self {
            ActivityKind::Post => "post",
            ActivityKind::Repost => "repost",
            ActivityKind::CommentedPost => "commented_post",
            ActivityKind::ReactedPost => "reacted_post",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivityDocument {
    #[serde(default, deserialize_with = "lenient_map")]
    pub profile: Map<String, Value>,

    #[serde(default, deserialize_with = "lenient_items")]
    pub posts: Vec<ActivityItem>,

    #[serde(default, deserialize_with = "lenient_items")]
    pub reposts: Vec<ActivityItem>,

    #[serde(default, deserialize_with = "lenient_items")]
    pub commented_posts: Vec<ActivityItem>,

    #[serde(default, deserialize_with = "lenient_items")]
    pub reacted_posts: Vec<ActivityItem>,

    #[serde(default)]
    pub credits_used: Option<Value>,
}

impl ActivityDocument {
    pub fn items(&self, kind: ActivityKind) -> &[ActivityItem] {
        match kind {
            ActivityKind::Post => &self.posts,
            ActivityKind::Repost => &self.reposts,
            ActivityKind::CommentedPost => &self.commented_posts,
            ActivityKind::ReactedPost => &self.reacted_posts,
        }
    }

    /// Number of rows this document flattens into.
    pub fn activity_count(&self) -> usize {
        ActivityKind::ALL
            .iter()
            .map(|kind| self.items(*kind).len())
            .sum()
    }

    pub fn credits_display(&self) -> String {
        match &self.credits_used {
            None | Some(Value::Null) => CREDITS_PLACEHOLDER.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

fn lenient_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<ActivityItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> ActivityDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_object_decodes_to_empty_document() {
        let doc = decode(json!({}));
        assert!(doc.profile.is_empty());
        assert_eq!(doc.activity_count(), 0);
        assert_eq!(doc.credits_display(), "N/A");
    }

    #[test]
    fn decodes_all_four_lists() {
        let doc = decode(json!({
            "profile": {"name": "Ada"},
            "posts": [{"id": 1}, {"id": 2}],
            "reposts": [{"id": 3}],
            "commented_posts": [{"id": 4}],
            "reacted_posts": [{"id": 5}, {"id": 6}, {"id": 7}],
        }));
        assert_eq!(doc.items(ActivityKind::Post).len(), 2);
        assert_eq!(doc.items(ActivityKind::Repost).len(), 1);
        assert_eq!(doc.items(ActivityKind::CommentedPost).len(), 1);
        assert_eq!(doc.items(ActivityKind::ReactedPost).len(), 3);
        assert_eq!(doc.activity_count(), 7);
    }

    #[test]
    fn malformed_fields_degrade_to_empty() {
        let doc = decode(json!({
            "profile": "not a map",
            "posts": null,
            "reposts": {"id": 1},
            "commented_posts": [1, "two", {"id": 3}, null],
        }));
        assert!(doc.profile.is_empty());
        assert!(doc.posts.is_empty());
        assert!(doc.reposts.is_empty());
        assert_eq!(doc.commented_posts.len(), 1);
        assert_eq!(doc.commented_posts[0]["id"], json!(3));
    }

    #[test]
    fn non_object_document_is_a_decode_error() {
        let result = serde_json::from_value::<ActivityDocument>(json!([1, 2]));
        assert!(result.is_err());
    }

    #[test]
    fn credits_display_renders_scalars() {
        assert_eq!(decode(json!({"credits_used": 3})).credits_display(), "3");
        assert_eq!(decode(json!({"credits_used": "12"})).credits_display(), "12");
        assert_eq!(decode(json!({"credits_used": null})).credits_display(), "N/A");
    }

    #[test]
    fn profile_field_order_is_preserved() {
        let doc: ActivityDocument =
            serde_json::from_str(r#"{"profile": {"zeta": 1, "alpha": 2, "mid": 3}}"#).unwrap();
        let keys: Vec<&str> = doc.profile.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn kind_tags() {
        let tags: Vec<&str> = ActivityKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(tags, vec!["post", "repost", "commented_post", "reacted_post"]);
    }
}
