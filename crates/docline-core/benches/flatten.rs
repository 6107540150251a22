use docline_core::path::{DEFAULT_MAX_DEPTH, Document, discover_paths};
use docline_core::{Resolution, Transcoder};
use serde_json::{Value, json};

fn synthetic_claim(i: usize, lines: usize) -> Document {
    let lines: Vec<Value> = (0..lines)
        .map(|l| {
            json!({
                "lineNo": l,
                "amount": (i * 10 + l) as f64 / 3.0,
                "codes": ["A1", "B2"],
                "provider": {"npi": format!("NPI{i:06}"), "taxonomy": {"code": "207Q"}},
            })
        })
        .collect();
    match json!({
        "claimRequestId": format!("CR-{i:08}"),
        "auditProcessedDateTimeUtc": "2024-01-01T00:00:00Z",
        "claimId": i,
        "status": if i % 2 == 0 { "OPEN" } else { "CLOSED" },
        "member": {"memberId": i, "address": {"zipCode": "12345"}},
        "lines": lines,
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn synthetic_page(n: usize) -> Vec<Document> {
    (0..n).map(|i| synthetic_claim(i, 1 + i % 5)).collect()
}

#[divan::bench(args = [1, 10, 50])]
fn discover(bencher: divan::Bencher, lines: usize) {
    let doc = synthetic_claim(7, lines);
    bencher.bench(|| discover_paths(divan::black_box(&doc), DEFAULT_MAX_DEPTH));
}

#[divan::bench(args = [Resolution::KeyTable, Resolution::Heuristic])]
fn to_batch_1000(bencher: divan::Bencher, resolution: Resolution) {
    let page = synthetic_page(1000);
    let transcoder = Transcoder::new(DEFAULT_MAX_DEPTH, resolution);
    bencher.bench(|| transcoder.to_batch(divan::black_box(&page)));
}

fn main() {
    divan::main();
}
