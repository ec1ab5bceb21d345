use serde_json::{Map, Value};

use crate::document::{ActivityDocument, ActivityItem, ActivityKind};
use crate::input::USERNAME_COLUMN;

/// One denormalized output record, keyed by column name in insertion order.
pub type FlatRow = Map<String, Value>;

pub const TYPE_COLUMN: &str = "type";
pub const COMMENTS_FIELD: &str = "comments";
pub const COMMENT_SEPARATOR: &str = ", ";

/// Flatten one identifier's document into rows.
///
/// Rows come out kind by kind (`post`, `repost`, `commented_post`,
/// `reacted_post`), each kind in source order. Columns are written as
/// identifier, tag, profile, item; a later field of the same name wins, so a
/// profile `username` or an item `type` replaces the seeded value.
pub fn flatten(identifier: &str, document: &ActivityDocument) -> Vec<FlatRow> {
    ActivityKind::ALL
        .iter()
        .flat_map(|&kind| {
            document
                .items(kind)
                .iter()
                .map(move |item| flat_row(identifier, kind, &document.profile, item))
        })
        .collect()
}

fn flat_row(
    identifier: &str,
    kind: ActivityKind,
    profile: &Map<String, Value>,
    item: &ActivityItem,
) -> FlatRow {
    let mut row = FlatRow::new();
    row.insert(USERNAME_COLUMN.to_string(), Value::from(identifier));
    row.insert(TYPE_COLUMN.to_string(), Value::from(kind.tag()));

    // Map::insert keeps the original position of an existing key.
    for (key, value) in profile.iter().chain(item.iter()) {
        row.insert(key.clone(), value.clone());
    }

    if kind == ActivityKind::Post {
        let joined = item
            .get(COMMENTS_FIELD)
            .map(join_comments)
            .unwrap_or_default();
        row.insert(COMMENTS_FIELD.to_string(), Value::String(joined));
    }

    row
}

fn join_comments(comments: &Value) -> String {
    match comments {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| match entry {
                Value::Null => None,
                Value::String(text) => Some(text.clone()),
                other => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(COMMENT_SEPARATOR),
        Value::String(text) => text.clone(),
        _ => String::new(),
    }
}
