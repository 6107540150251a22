//! Request bodies for `_count` and `_search`

use docline_core::{Cursor, CursorFields};
use serde_json::{Map, Value, json};

fn match_all() -> Value {
    json!({"match_all": {}})
}

/// `_count` body: the base filter only (sort, size and paging are not
/// accepted by the count API).
pub fn count_body(base: &Value) -> Value {
    let query = base.get("query").cloned().unwrap_or_else(match_all);
    json!({ "query": query })
}

/// Ascending sort on both cursor fields, the only order `search_after` can
/// resume from.
pub fn cursor_sort(fields: &CursorFields) -> Value {
    json!([
        { fields.order_field.as_str(): "asc" },
        { fields.unique_field.as_str(): "asc" },
    ])
}

/// `_search` body for the page strictly after `after`.
///
/// Starts from the base body, fills in `size` when it is absent and always
/// replaces `sort` with [`cursor_sort`]. `search_after` is present only when
/// a cursor exists.
pub fn search_body(
    base: &Value,
    page_size: usize,
    fields: &CursorFields,
    after: Option<&Cursor>,
) -> Value {
    let mut body = base.as_object().cloned().unwrap_or_else(Map::new);
    body.entry("query").or_insert_with(match_all);
    body.entry("size").or_insert_with(|| json!(page_size));
    body.insert("sort".to_string(), cursor_sort(fields));
    match after {
        Some(cursor) => {
            body.insert("search_after".to_string(), cursor.search_after());
        }
        None => {
            body.remove("search_after");
        }
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> Cursor {
        Cursor {
            sort_value: json!("2024-01-01T00:00:00Z"),
            tiebreak: json!("CR-1"),
        }
    }

    #[test]
    fn count_body_keeps_only_query() {
        let base = json!({"query": {"term": {"status": "OPEN"}}, "size": 10, "sort": ["x"]});
        assert_eq!(
            count_body(&base),
            json!({"query": {"term": {"status": "OPEN"}}})
        );
        assert_eq!(count_body(&json!({})), json!({"query": {"match_all": {}}}));
    }

    #[test]
    fn first_page_has_no_search_after() {
        let body = search_body(&json!({}), 1000, &CursorFields::default(), None);
        assert_eq!(body["size"], 1000);
        assert_eq!(
            body["sort"],
            json!([{"auditProcessedDateTimeUtc": "asc"}, {"claimRequestId": "asc"}])
        );
        assert!(body.get("search_after").is_none());
        assert_eq!(body["query"], json!({"match_all": {}}));
    }

    #[test]
    fn later_pages_carry_cursor() {
        let body = search_body(&json!({}), 10, &CursorFields::default(), Some(&cursor()));
        assert_eq!(
            body["search_after"],
            json!(["2024-01-01T00:00:00Z", "CR-1"])
        );
    }

    #[test]
    fn base_size_is_respected() {
        let base = json!({
            "query": {"range": {"amount": {"gt": 0}}},
            "size": 50,
            "_source": ["id"],
        });
        let body = search_body(&base, 1000, &CursorFields::default(), Some(&cursor()));
        assert_eq!(body["size"], 50);
        assert_eq!(body["query"], base["query"]);
        assert_eq!(body["_source"], json!(["id"]));
    }

    #[test]
    fn base_sort_is_replaced_by_cursor_sort() {
        let base = json!({"sort": [{"updatedAt": "asc"}, {"id": "asc"}]});
        let body = search_body(&base, 10, &CursorFields::default(), Some(&cursor()));
        assert_eq!(
            body["sort"],
            json!([{"auditProcessedDateTimeUtc": "asc"}, {"claimRequestId": "asc"}])
        );
        assert_eq!(
            body["search_after"],
            json!(["2024-01-01T00:00:00Z", "CR-1"])
        );
    }

    #[test]
    fn stale_search_after_in_base_is_dropped() {
        let base = json!({"search_after": [1, 2]});
        let body = search_body(&base, 5, &CursorFields::default(), None);
        assert!(body.get("search_after").is_none());
    }
}
