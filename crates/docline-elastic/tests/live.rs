//! Tests against a running cluster.
//!
//! Run with `DOCLINE_ES_URL=http://localhost:9200 DOCLINE_ES_INDEX=claims cargo test -- --ignored`.

use docline_core::{CursorFields, SearchBackend};
use docline_elastic::{ElasticBackend, ElasticConfig};

fn live_backend(page_size: usize) -> Option<ElasticBackend> {
    let url = std::env::var("DOCLINE_ES_URL").ok()?;
    let index = std::env::var("DOCLINE_ES_INDEX").ok()?;
    let config = ElasticConfig {
        url,
        index,
        page_size,
        ..ElasticConfig::default()
    };
    Some(ElasticBackend::new(&config, CursorFields::default()).unwrap())
}

#[test]
#[ignore]
fn count_and_first_page() {
    let Some(backend) = live_backend(5) else {
        eprintln!("DOCLINE_ES_URL / DOCLINE_ES_INDEX not set, skipping");
        return;
    };
    let total = backend.count().unwrap();
    let page = backend.search(None).unwrap();
    assert!(page.documents.len() as u64 <= total.min(5));
}

#[test]
#[ignore]
fn second_page_starts_after_first() {
    let Some(backend) = live_backend(2) else {
        eprintln!("DOCLINE_ES_URL / DOCLINE_ES_INDEX not set, skipping");
        return;
    };
    let first = backend.search(None).unwrap();
    let Some(last) = first.documents.last() else {
        return;
    };
    let cursor = docline_core::Cursor::from_document(last, &CursorFields::default()).unwrap();
    let second = backend.search(Some(&cursor)).unwrap();
    for doc in &second.documents {
        assert_ne!(doc.get("claimRequestId"), last.get("claimRequestId"));
    }
}
