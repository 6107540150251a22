//! Batch transcoder: union the column paths of a page, project every document

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Deserialize;

use crate::batch::Batch;
use crate::path::{
    self, Ambiguity, DEFAULT_MAX_DEPTH, Discovery, Document, KeyPath, display_key_path, lookup,
    resolve_key_path, value_to_string,
};

/// How a column name is mapped back to a value inside each document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Follow the original keys recorded during discovery
    #[default]
    KeyTable,
    /// Guess keys from the column name (see [`path::extract_by_path`])
    Heuristic,
}

impl Resolution {
    /// Parse CLI/config string into enum
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "key-table" => Some(Self::KeyTable),
            "heuristic" => Some(Self::Heuristic),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::KeyTable => "key-table",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Turns a page of heterogeneous documents into one rectangular [`Batch`].
#[derive(Debug, Clone, Copy)]
pub struct Transcoder {
    pub max_depth: usize,
    pub resolution: Resolution,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            resolution: Resolution::default(),
        }
    }
}

impl Transcoder {
    pub fn new(max_depth: usize, resolution: Resolution) -> Self {
        Self {
            max_depth,
            resolution,
        }
    }

    /// Build a batch whose columns are the sorted union of every document's
    /// column paths. Documents lacking a column get `""` in that cell.
    pub fn to_batch(&self, documents: &[Document]) -> Batch {
        if documents.is_empty() {
            return Batch::empty();
        }

        let discoveries: Vec<Discovery> = documents
            .iter()
            .map(|doc| path::discover_key_paths(doc, self.max_depth))
            .collect();

        let mut ambiguities: Vec<Ambiguity> = discoveries
            .iter()
            .flat_map(|d| d.ambiguities.iter().cloned())
            .collect();

        // Batch-wide key table: a document that lacks a column of its own
        // (`"u": null` next to `"u": {"a": 1}`) is still resolved through it.
        let mut key_table: BTreeMap<&str, &KeyPath> = BTreeMap::new();
        for discovery in &discoveries {
            for (column, key_path) in &discovery.columns {
                match key_table.get(column.as_str()) {
                    None => {
                        key_table.insert(column, key_path);
                    }
                    Some(&existing) if existing != key_path => ambiguities.push(Ambiguity {
                        column: column.clone(),
                        chosen: display_key_path(existing),
                        shadowed: vec![display_key_path(key_path)],
                    }),
                    Some(_) => {}
                }
            }
        }
        let columns: Vec<String> = key_table.keys().map(|c| c.to_string()).collect();

        let rows: Vec<Vec<String>> = documents
            .iter()
            .zip(&discoveries)
            .map(|(doc, discovery)| match self.resolution {
                Resolution::KeyTable => columns
                    .iter()
                    .map(|col| {
                        discovery
                            .columns
                            .get(col)
                            .or_else(|| key_table.get(col.as_str()).copied())
                            .and_then(|key_path| resolve_key_path(doc, key_path))
                            .map(value_to_string)
                            .unwrap_or_default()
                    })
                    .collect(),
                Resolution::Heuristic => columns
                    .iter()
                    .map(|col| {
                        lookup(doc, col, &mut ambiguities)
                            .map(value_to_string)
                            .unwrap_or_default()
                    })
                    .collect(),
            })
            .collect();

        let ambiguities = first_per_column(ambiguities);
        for a in &ambiguities {
            log::warn!("Ambiguous key match: {a}");
        }
        log::debug!(
            "Transcoded {} documents into {} columns ({})",
            documents.len(),
            columns.len(),
            self.resolution
        );

        Batch::new(columns, rows, ambiguities)
    }
}

/// Keep one ambiguity per column so a collision repeated on every row is
/// reported once.
fn first_per_column(ambiguities: Vec<Ambiguity>) -> Vec<Ambiguity> {
    let mut by_column: BTreeMap<String, Ambiguity> = BTreeMap::new();
    for a in ambiguities {
        by_column.entry(a.column.clone()).or_insert(a);
    }
    by_column.into_values().collect()
}
