use serde_json::json;
use wigle_core::{Record, records_from_value};
use wigle_export::flatten;

/// Detail-style records: a handful of parent fields plus nested points.
fn detail_records(n: usize, points: usize) -> Vec<Record> {
    let items: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            let locs: Vec<serde_json::Value> = (0..points)
                .map(|p| {
                    json!({
                        "latitude": 45.0 + p as f64 * 1e-4,
                        "longitude": -122.0 - i as f64 * 1e-4,
                        "time": format!("2024-01-{:02}T00:00:00.000Z", p % 28 + 1),
                        "signal": -60 - (p as i64 % 30)
                    })
                })
                .collect();
            json!({
                "netid": format!("00:11:22:33:{:02X}:{:02X}", i / 256, i % 256),
                "ssid": format!("net-{i}"),
                "encryption": "wpa2",
                "rcois": ["a", "b"],
                "locationData": locs
            })
        })
        .collect();
    records_from_value(serde_json::Value::Array(items))
}

#[divan::bench(args = [100, 1_000])]
fn flatten_detail(bencher: divan::Bencher, n: usize) {
    let records = detail_records(n, 20);
    bencher.bench(|| flatten(&records));
}

#[divan::bench]
fn flatten_search_page(bencher: divan::Bencher) {
    let records = detail_records(100, 0);
    bencher.bench(|| flatten(&records));
}

fn main() {
    divan::main();
}
