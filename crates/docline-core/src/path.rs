//! Path codec: flatten nested JSON documents into column paths and back.
//!
//! A column path joins PascalCase key segments with [`SEPARATOR`]. Lists of
//! objects are exploded per element with a literal index segment, so
//! `{"lines": [{"amt": 10}]}` yields the column `Lines_0_Amt`. Everything else
//! (primitives, lists of primitives, empty lists) is a single column whose
//! value is serialized whole.
//!
//! The forward direction is not injective: `status` and `Status` both map to
//! `Status`, and a key containing `_` can collide with a nested path. Two ways
//! back are offered:
//!
//! - [`extract_by_path`] guesses the original key from the column name
//!   (camelCase, lower, verbatim, capitalized; first match wins).
//! - [`discover_key_paths`] keeps the original keys for every column, and
//!   [`resolve_key_path`] follows them exactly.
//!
//! Collisions seen by either direction are reported as [`Ambiguity`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};

/// A single search hit's `_source`.
pub type Document = Map<String, Value>;

/// Joins key segments and list indices inside a column path.
pub const SEPARATOR: char = '_';

/// Nesting depth after which a subtree becomes one opaque JSON column.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// One step of an original-key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Original keys and list indices that produced a column.
pub type KeyPath = Vec<PathSegment>;

/// Render a key path as `lines.0.amt` for log messages.
pub fn display_key_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|seg| match seg {
            PathSegment::Key(k) => k.clone(),
            PathSegment::Index(i) => i.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Two or more source keys competing for the same column.
///
/// Non-fatal: the first candidate wins and the rest are recorded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub column: String,
    pub chosen: String,
    pub shadowed: Vec<String>,
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column {} resolved to '{}', shadowing [{}]",
            self.column,
            self.chosen,
            self.shadowed.join(", ")
        )
    }
}

/// First character upper-cased, rest unchanged.
pub fn to_pascal_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First character lower-cased, rest unchanged.
pub fn to_camel_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First character upper-cased, rest lower-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{segment}")
    }
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

// === Forward: document -> columns ===

/// Columns of one document with the original keys behind each.
#[derive(Debug, Default)]
pub struct Discovery {
    pub columns: BTreeMap<String, KeyPath>,
    pub ambiguities: Vec<Ambiguity>,
}

struct Walker {
    max_depth: usize,
    out: Discovery,
}

impl Walker {
    fn record(&mut self, column: &str, key_path: &[PathSegment]) {
        if column.is_empty() {
            // An empty document reaches here with no key path
            if !key_path.is_empty() {
                log::warn!(
                    "Key path {:?} has an empty column name, dropping it",
                    display_key_path(key_path)
                );
            }
            return;
        }
        match self.out.columns.get(column) {
            None => {
                self.out
                    .columns
                    .insert(column.to_string(), key_path.to_vec());
            }
            Some(existing) if existing.as_slice() != key_path => {
                self.out.ambiguities.push(Ambiguity {
                    column: column.to_string(),
                    chosen: display_key_path(existing),
                    shadowed: vec![display_key_path(key_path)],
                });
            }
            Some(_) => {}
        }
    }

    fn walk_object(&mut self, obj: &Document, prefix: &str, key_path: &mut KeyPath, depth: usize) {
        // Oversized nesting and empty objects stay visible as one JSON column
        if depth > self.max_depth || obj.is_empty() {
            self.record(prefix, key_path);
            return;
        }
        for (key, value) in obj {
            let column = join(prefix, &to_pascal_case(key));
            key_path.push(PathSegment::Key(key.clone()));
            self.walk_value(value, &column, key_path, depth);
            key_path.pop();
        }
    }

    fn walk_value(&mut self, value: &Value, column: &str, key_path: &mut KeyPath, depth: usize) {
        match value {
            Value::Object(obj) => self.walk_object(obj, column, key_path, depth + 1),
            Value::Array(items) if matches!(items.first(), Some(Value::Object(_))) => {
                for (i, item) in items.iter().enumerate() {
                    let indexed = format!("{column}{SEPARATOR}{i}");
                    key_path.push(PathSegment::Index(i));
                    match item {
                        Value::Object(obj) => {
                            self.walk_object(obj, &indexed, key_path, depth + 1);
                        }
                        // Mixed list: a stray primitive is its own column
                        _ => self.record(&indexed, key_path),
                    }
                    key_path.pop();
                }
            }
            // Primitives, null, empty lists, lists of primitives
            _ => self.record(column, key_path),
        }
    }
}

/// Walk `doc` and return every column with its original key path.
///
/// When two key paths normalize to the same column, the first in document
/// order is kept and the collision lands in [`Discovery::ambiguities`].
pub fn discover_key_paths(doc: &Document, max_depth: usize) -> Discovery {
    let mut walker = Walker {
        max_depth,
        out: Discovery::default(),
    };
    let mut key_path = Vec::new();
    for (key, value) in doc {
        let column = to_pascal_case(key);
        key_path.push(PathSegment::Key(key.clone()));
        walker.walk_value(value, &column, &mut key_path, 0);
        key_path.pop();
    }
    walker.out
}

/// All column paths present in `doc`, sorted.
pub fn discover_paths(doc: &Document, max_depth: usize) -> BTreeSet<String> {
    discover_key_paths(doc, max_depth)
        .columns
        .into_keys()
        .collect()
}

// === Reverse: column -> value ===

/// Match one path segment against an object's keys.
///
/// Tries camelCase, lower-case, verbatim, capitalized. More than one distinct
/// hit is an ambiguity; the first still wins.
fn match_key<'a>(
    obj: &'a Document,
    segment: &str,
    path: &str,
    ambiguities: &mut Vec<Ambiguity>,
) -> Option<&'a Value> {
    let candidates = [
        to_camel_case(segment),
        segment.to_lowercase(),
        segment.to_string(),
        capitalize(segment),
    ];
    let mut hits: Vec<&str> = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        if obj.contains_key(candidate.as_str()) && !hits.contains(&candidate.as_str()) {
            hits.push(candidate.as_str());
        }
    }
    let (chosen, shadowed) = hits.split_first()?;
    if !shadowed.is_empty() {
        ambiguities.push(Ambiguity {
            column: path.to_string(),
            chosen: (*chosen).to_string(),
            shadowed: shadowed.iter().map(|s| (*s).to_string()).collect(),
        });
    }
    obj.get(*chosen)
}

/// Heuristic walk of `path` through `doc`.
///
/// Digit segments index into lists; other segments are matched against
/// object keys by [`match_key`]. Returns `None` as soon as the shape does not
/// fit (missing key, index out of range, primitive before the end).
pub fn lookup<'a>(
    doc: &'a Document,
    path: &str,
    ambiguities: &mut Vec<Ambiguity>,
) -> Option<&'a Value> {
    if path.is_empty() || doc.is_empty() {
        return None;
    }
    // None = still at the document root
    let mut current: Option<&'a Value> = None;
    for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
        if is_index(segment) {
            let Some(Value::Array(items)) = current else {
                return None;
            };
            let idx: usize = segment.parse().ok()?;
            current = Some(items.get(idx)?);
        } else {
            let obj = match current {
                None => doc,
                Some(Value::Object(obj)) => obj,
                Some(_) => return None,
            };
            current = Some(match_key(obj, segment, path, ambiguities)?);
        }
    }
    current
}

/// Extract the value at `path` as text, or `default` when absent or null.
///
/// Ambiguous key matches are logged at warn level.
pub fn extract_by_path(doc: &Document, path: &str, default: &str) -> String {
    let mut ambiguities = Vec::new();
    let value = lookup(doc, path, &mut ambiguities);
    for a in &ambiguities {
        log::warn!("Ambiguous key match: {a}");
    }
    match value {
        Some(v) if !v.is_null() => value_to_string(v),
        _ => default.to_string(),
    }
}

/// Follow original keys exactly; no case guessing.
pub fn resolve_key_path<'a>(doc: &'a Document, key_path: &[PathSegment]) -> Option<&'a Value> {
    let (first, rest) = key_path.split_first()?;
    let PathSegment::Key(key) = first else {
        return None;
    };
    let mut current = doc.get(key)?;
    for segment in rest {
        current = match (segment, current) {
            (PathSegment::Key(k), Value::Object(obj)) => obj.get(k)?,
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Cell text for a JSON value: null is empty, compounds are compact JSON.
///
/// Booleans are `true`/`false` and compounds carry no spaces after `:` or
/// `,`, unlike Python's `str(True)` and `json.dumps` output that earlier
/// exports of the same tables contain.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        compound => compound.to_string(),
    }
}
