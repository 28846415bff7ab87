//! Small builders for the filter documents every repository writes.

use chrono::NaiveDate;
use mongodb::bson::{Bson, Document, doc, to_bson};
use uuid::Uuid;

/// BSON form of an entity id, matching how the id field is serialized.
pub fn id_bson(id: Uuid) -> Bson {
    to_bson(&id).unwrap_or(Bson::Null)
}

/// `{ "_id": id }`
pub fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id_bson(id) }
}

/// `{ "$in": [ids] }` operand for a uuid-valued field.
pub fn ids_in(ids: &[Uuid]) -> Document {
    let values: Vec<Bson> = ids.iter().copied().map(id_bson).collect();
    doc! { "$in": values }
}

/// Escape user input for use inside a `$regex`.
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive "contains" match.
pub fn contains_ci(input: &str) -> Document {
    doc! { "$regex": escape_regex(input.trim()), "$options": "i" }
}

/// Bounds on an RFC 3339 timestamp field covering whole days, `from` and `to`
/// inclusive.
///
/// Timestamps are stored as strings, so comparing against bare dates works:
/// `"2024-05-01T09:30:00Z"` sorts after `"2024-05-01"` and before `"2024-05-02"`.
pub fn day_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<Document> {
    let mut range = Document::new();
    if let Some(from) = from {
        range.insert("$gte", from.format("%Y-%m-%d").to_string());
    }
    if let Some(to) = to.and_then(|d| d.succ_opt()) {
        range.insert("$lt", to.format("%Y-%m-%d").to_string());
    }
    (!range.is_empty()).then_some(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("ORD-2024"), "ORD-2024");
        assert_eq!(escape_regex("(x)"), "\\(x\\)");
    }

    #[test]
    fn test_day_range() {
        let from = NaiveDate::from_ymd_opt(2024, 5, 1);
        let to = NaiveDate::from_ymd_opt(2024, 5, 31);

        let range = day_range(from, to).unwrap();
        assert_eq!(range.get_str("$gte").unwrap(), "2024-05-01");
        assert_eq!(range.get_str("$lt").unwrap(), "2024-06-01");

        assert!(day_range(None, None).is_none());
        let open = day_range(from, None).unwrap();
        assert!(!open.contains_key("$lt"));
    }

    #[test]
    fn test_ids_in() {
        let ids = [Uuid::now_v7(), Uuid::now_v7()];
        let operand = ids_in(&ids);
        assert_eq!(operand.get_array("$in").unwrap().len(), 2);
    }
}
