//! Response shapes of the MCC/MNC endpoint → flat record list

use serde_json::Value;
use wigle_core::Record;

fn objects(items: &[Value]) -> Vec<Record> {
    items.iter().filter_map(Value::as_object).cloned().collect()
}

/// Flatten any of the known response shapes into records.
///
/// - a list of records
/// - `{"results": [...]}` or `{"result": {...}}`
/// - a two-level mapping `{mcc: {mnc: record}}`: the exact entry for the
///   queried `mcc`/`mnc` when present, otherwise every leaf record
///
/// `query` is the query that produced `data`; its `mcc`/`mnc` drive the
/// exact match.
pub fn normalize(data: &Value, query: &[(String, String)]) -> Vec<Record> {
    let map = match data {
        Value::Array(items) => return objects(items),
        Value::Object(map) => map,
        _ => return Vec::new(),
    };

    if let Some(Value::Array(items)) = map.get("results") {
        return objects(items);
    }
    if let Some(Value::Object(result)) = map.get("result") {
        return vec![result.clone()];
    }

    let param = |key: &str| {
        query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    };
    if let (Some(mcc), Some(mnc)) = (param("mcc"), param("mnc")) {
        if let Some(Value::Object(exact)) = map.get(mcc).and_then(|m| m.get(mnc)) {
            return vec![exact.clone()];
        }
    }

    map.values()
        .filter_map(Value::as_object)
        .flat_map(|by_mnc| by_mnc.values().filter_map(Value::as_object).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn q(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn list_shape() {
        let data = json!([{"brand": "A"}, "noise", {"brand": "B"}]);
        assert_eq!(normalize(&data, &[]).len(), 2);
    }

    #[test]
    fn results_and_result_shapes() {
        assert_eq!(normalize(&json!({"results": [{"brand": "A"}]}), &[]).len(), 1);
        let single = normalize(&json!({"result": {"brand": "A"}}), &[]);
        assert_eq!(single[0]["brand"], json!("A"));
    }

    #[test]
    fn nested_mapping_exact_match() {
        let data = json!({
            "310": {"410": {"brand": "AT&T"}, "260": {"brand": "T-Mobile"}},
            "311": {"480": {"brand": "Verizon"}}
        });
        let recs = normalize(&data, &q(&[("mcc", "310"), ("mnc", "260")]));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0]["brand"], json!("T-Mobile"));
    }

    #[test]
    fn nested_mapping_without_match_yields_all_leaves() {
        let data = json!({
            "310": {"410": {"brand": "AT&T"}, "260": {"brand": "T-Mobile"}},
            "311": {"480": {"brand": "Verizon"}, "x": 5},
            "meta": "ignored"
        });
        let recs = normalize(&data, &q(&[("mccmnc", "310999")]));
        assert_eq!(recs.len(), 3);
        let recs = normalize(&data, &q(&[("mcc", "310"), ("mnc", "999")]));
        assert_eq!(recs.len(), 3);
    }

    #[test]
    fn scalars_are_empty() {
        assert!(normalize(&json!("nope"), &[]).is_empty());
        assert!(normalize(&Value::Null, &[]).is_empty());
        assert!(normalize(&json!({}), &[]).is_empty());
    }
}
