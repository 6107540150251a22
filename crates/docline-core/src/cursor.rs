//! Two-field pagination cursor taken from the last document of a page

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{Document, value_to_string};

/// Fields that order the result set: a sort key plus a unique tie-breaker.
///
/// The backend must sort on exactly these two fields, or successive cursors
/// are not guaranteed to advance. Dotted names reach into nested objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorFields {
    pub order_field: String,
    pub unique_field: String,
}

impl Default for CursorFields {
    fn default() -> Self {
        Self {
            order_field: "auditProcessedDateTimeUtc".to_string(),
            unique_field: "claimRequestId".to_string(),
        }
    }
}

/// Resume point: results strictly after `(sort_value, tiebreak)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub sort_value: Value,
    pub tiebreak: Value,
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.sort_value, self.tiebreak)
    }
}

fn field<'a>(doc: &'a Document, name: &str) -> Option<&'a Value> {
    let mut parts = name.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    (!current.is_null()).then_some(current)
}

impl Cursor {
    /// Read the cursor from `doc`; `Err` names the first missing (or null) field.
    pub fn from_document(doc: &Document, fields: &CursorFields) -> Result<Self, String> {
        let sort_value = field(doc, &fields.order_field)
            .ok_or_else(|| fields.order_field.clone())?
            .clone();
        let tiebreak = field(doc, &fields.unique_field)
            .ok_or_else(|| fields.unique_field.clone())?
            .clone();
        Ok(Self {
            sort_value,
            tiebreak,
        })
    }

    /// Cursor from the sort values a backend reports for a hit
    /// (`[sort_value, tiebreak]`); anything else is `None`.
    pub fn from_sort_values(values: &Value) -> Option<Self> {
        match values.as_array()?.as_slice() {
            [sort_value, tiebreak] if !sort_value.is_null() && !tiebreak.is_null() => Some(Self {
                sort_value: sort_value.clone(),
                tiebreak: tiebreak.clone(),
            }),
            _ => None,
        }
    }

    /// `search_after` array for the next request
    pub fn search_after(&self) -> Value {
        Value::Array(vec![self.sort_value.clone(), self.tiebreak.clone()])
    }

    /// Tie-breaker value made safe for use in a file name
    pub fn file_label(&self) -> String {
        let label: String = value_to_string(&self.tiebreak)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '-'
                }
            })
            .take(64)
            .collect();
        if label.is_empty() {
            "batch".to_string()
        } else {
            label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn from_document_reads_both_fields() {
        let d = doc(json!({
            "auditProcessedDateTimeUtc": "2024-05-01T10:00:00Z",
            "claimRequestId": "CR-17",
            "other": 1
        }));
        let cursor = Cursor::from_document(&d, &CursorFields::default()).unwrap();
        assert_eq!(cursor.sort_value, json!("2024-05-01T10:00:00Z"));
        assert_eq!(cursor.tiebreak, json!("CR-17"));
        assert_eq!(
            cursor.search_after(),
            json!(["2024-05-01T10:00:00Z", "CR-17"])
        );
    }

    #[test]
    fn missing_or_null_field_is_named() {
        let fields = CursorFields::default();
        let d = doc(json!({"auditProcessedDateTimeUtc": 1}));
        assert_eq!(
            Cursor::from_document(&d, &fields).unwrap_err(),
            "claimRequestId"
        );
        let d = doc(json!({"auditProcessedDateTimeUtc": null, "claimRequestId": 2}));
        assert_eq!(
            Cursor::from_document(&d, &fields).unwrap_err(),
            "auditProcessedDateTimeUtc"
        );
    }

    #[test]
    fn dotted_fields_reach_nested_values() {
        let fields = CursorFields {
            order_field: "audit.ts".into(),
            unique_field: "id".into(),
        };
        let d = doc(json!({"audit": {"ts": 5}, "id": 9}));
        let cursor = Cursor::from_document(&d, &fields).unwrap();
        assert_eq!(cursor.sort_value, json!(5));
        assert_eq!(cursor.to_string(), "[5, 9]");
    }

    #[test]
    fn sort_values_need_exactly_two_non_null_entries() {
        let cursor = Cursor::from_sort_values(&json!([1704067200000i64, "CR-3"])).unwrap();
        assert_eq!(cursor.sort_value, json!(1704067200000i64));
        assert_eq!(cursor.tiebreak, json!("CR-3"));
        assert!(Cursor::from_sort_values(&json!([1])).is_none());
        assert!(Cursor::from_sort_values(&json!([1, null])).is_none());
        assert!(Cursor::from_sort_values(&json!({"a": 1})).is_none());
    }

    #[test]
    fn file_label_is_sanitized() {
        let cursor = Cursor {
            sort_value: json!(1),
            tiebreak: json!("CR/17 a"),
        };
        assert_eq!(cursor.file_label(), "CR-17-a");
        let cursor = Cursor {
            sort_value: json!(1),
            tiebreak: json!(""),
        };
        assert_eq!(cursor.file_label(), "batch");
    }
}
