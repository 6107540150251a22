//! Elasticsearch search backend for docline
//!
//! Implements [`docline_core::SearchBackend`] over the `_count` and `_search`
//! REST endpoints, paging with `search_after` on the configured cursor fields.

pub mod client;
pub mod config;
pub mod query;

pub use client::ElasticBackend;
pub use config::{Auth, ElasticConfig};
pub use query::{count_body, cursor_sort, search_body};
