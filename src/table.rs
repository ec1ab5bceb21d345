use std::collections::HashSet;

use serde_json::Value;

use crate::document::ActivityDocument;
use crate::flatten::{flatten, FlatRow};

/// Rectangular view over flat rows: every row has a cell for every column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<FlatRow>,
}

impl Table {
    /// Build a table whose columns are the union of row keys in first-seen order.
    pub fn from_rows(rows: Vec<FlatRow>) -> Self {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for key in rows.iter().flat_map(|row| row.keys()) {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rendered cells of one row, aligned to `columns()`.
    pub fn cells(&self, row: &FlatRow) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| row.get(column).map(render_cell).unwrap_or_default())
            .collect()
    }

    /// All rows rendered as text, in table order.
    pub fn rendered_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| self.cells(row)).collect()
    }

    /// Serialize as CSV with a header row.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(self.cells(row))?;
        }
        writer.flush()?;
        writer.into_inner().map_err(|e| e.into_error().into())
    }
}

/// Flatten every (identifier, document) pair in order and union the result.
pub fn aggregate<'a, I>(pairs: I) -> Table
where
    I: IntoIterator<Item = (&'a str, &'a ActivityDocument)>,
{
    let rows = pairs
        .into_iter()
        .flat_map(|(identifier, document)| flatten(identifier, document))
        .collect();
    Table::from_rows(rows)
}

/// Text form of a cell. Nulls are empty; nested values are compact JSON.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        nested => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> ActivityDocument {
        serde_json::from_value(value).unwrap()
    }

    fn csv_text(table: &Table) -> String {
        String::from_utf8(table.to_csv().unwrap()).unwrap()
    }

    #[test]
    fn columns_are_union_in_first_seen_order() {
        let alice = doc(json!({
            "profile": {"name": "Alice"},
            "posts": [{"id": 1}],
        }));
        let bob = doc(json!({
            "reposts": [{"id": 2, "original_author": "Carol"}],
        }));

        let table = aggregate([("alice", &alice), ("bob", &bob)]);

        assert_eq!(
            table.columns(),
            ["username", "type", "name", "id", "comments", "original_author"]
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn missing_keys_render_as_empty_cells() {
        let alice = doc(json!({"posts": [{"id": 1}]}));
        let bob = doc(json!({"reposts": [{"id": 2, "extra": "x"}]}));
        let table = aggregate([("alice", &alice), ("bob", &bob)]);

        let rendered = table.rendered_rows();
        for row in &rendered {
            assert_eq!(row.len(), table.columns().len());
        }
        assert_eq!(rendered[0], vec!["alice", "post", "1", "", ""]);
        assert_eq!(rendered[1], vec!["bob", "repost", "2", "", "x"]);
    }

    #[test]
    fn rows_follow_identifier_order() {
        let a = doc(json!({"reacted_posts": [{"n": 1}]}));
        let b = doc(json!({"posts": [{"n": 2}]}));
        let table = aggregate([("b-user", &b), ("a-user", &a)]);
        let users: Vec<&str> = table
            .rows()
            .iter()
            .map(|r| r["username"].as_str().unwrap())
            .collect();
        assert_eq!(users, vec!["b-user", "a-user"]);
    }

    #[test]
    fn zero_rows_is_an_empty_table() {
        let empty = doc(json!({"profile": {"name": "X"}}));
        let table = aggregate([("alice", &empty)]);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert_eq!(table, Table::default());
    }

    #[test]
    fn csv_has_header_and_quoted_cells() {
        let alice = doc(json!({
            "profile": {"name": "Alice"},
            "posts": [{"text": "hello, world", "comments": ["a", "b"]}],
        }));
        let table = aggregate([("alice", &alice)]);

        assert_eq!(
            csv_text(&table),
            "username,type,name,text,comments\n\
             alice,post,Alice,\"hello, world\",\"a, b\"\n"
        );
    }

    #[test]
    fn render_cell_formats() {
        assert_eq!(render_cell(&Value::Null), "");
        assert_eq!(render_cell(&json!("text")), "text");
        assert_eq!(render_cell(&json!(42)), "42");
        assert_eq!(render_cell(&json!(1.5)), "1.5");
        assert_eq!(render_cell(&json!(true)), "true");
        assert_eq!(render_cell(&json!(["a", 1])), r#"["a",1]"#);
        assert_eq!(render_cell(&json!({"k": "v"})), r#"{"k":"v"}"#);
    }

    #[test]
    fn total_rows_is_sum_of_activity_counts() {
        let docs = [
            doc(json!({"posts": [{}, {}], "reacted_posts": [{}]})),
            doc(json!({"reposts": [{}], "commented_posts": [{}, {}]})),
            doc(json!({})),
        ];
        let expected: usize = docs.iter().map(|d| d.activity_count()).sum();
        let table = aggregate(docs.iter().map(|d| ("u", d)));
        assert_eq!(table.len(), expected);
    }
}
