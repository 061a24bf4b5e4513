//! Record → row projection with a first-seen column union

use std::collections::HashSet;

use serde_json::Value;
use wigle_core::{
    LOCATION_FIELDS, Record, coordinate_values, point_coordinate_values, raw_points, scalar_text,
};

/// One flattened row: parent fields merged with at most one location point.
pub type ExportRow = Record;

/// `(lat, lon)` text of a row with a valid coordinate pair.
pub type RowCoordinates = (String, String);

/// Rows plus the ordered union of every key seen across them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Flattened {
    pub columns: Vec<String>,
    pub rows: Vec<ExportRow>,
    /// Parallel to `rows`. A point row takes coordinates from its point
    /// only; a pointless row may use the record's `trilat`/`trilong`.
    pub coordinates: Vec<Option<RowCoordinates>>,
}

impl Flattened {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with a valid coordinate pair, alongside their coordinates.
    pub fn located(&self) -> impl Iterator<Item = (&ExportRow, &RowCoordinates)> {
        self.rows
            .iter()
            .zip(&self.coordinates)
            .filter_map(|(row, coords)| Some((row, coords.as_ref()?)))
    }

    fn push(
        &mut self,
        row: ExportRow,
        coords: Option<RowCoordinates>,
        seen: &mut HashSet<String>,
    ) {
        for key in row.keys() {
            if seen.insert(key.clone()) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
        self.coordinates.push(coords);
    }
}

fn coordinate_text((lat, lon): (&Value, &Value)) -> RowCoordinates {
    (
        scalar_text(lat).trim().to_string(),
        scalar_text(lon).trim().to_string(),
    )
}

/// Flatten records into rows.
///
/// A record with nested location points yields one row per point, the
/// point's fields overriding the parent's on collision. A record without
/// points yields a single row. Rows are not coordinate-gated here; each
/// row's coordinates are recorded for the KML writer.
pub fn flatten(records: &[Record]) -> Flattened {
    let mut out = Flattened::default();
    let mut seen = HashSet::new();

    for record in records {
        let parent: Record = record
            .iter()
            .filter(|(k, _)| !LOCATION_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let points = raw_points(record);
        if points.is_empty() {
            let coords = coordinate_values(&parent).map(coordinate_text);
            out.push(parent, coords, &mut seen);
            continue;
        }
        for point in points {
            let mut row = parent.clone();
            for (k, v) in point {
                row.insert(k.clone(), v.clone());
            }
            let coords = point_coordinate_values(point).map(coordinate_text);
            out.push(row, coords, &mut seen);
        }
    }
    out
}

/// Cell text for tabular output: nested maps/lists as compact JSON,
/// missing and null as empty.
pub fn cell_text(value: Option<&Value>) -> String {
    value.map(scalar_text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wigle_core::records_from_value;

    #[test]
    fn columns_are_first_seen_union() {
        let flat = flatten(&records_from_value(json!([
            {"netid": "A", "ssid": "x"},
            {"netid": "B", "channel": 6, "ssid": "y"},
            {"encryption": "wpa2"}
        ])));
        assert_eq!(flat.columns, vec!["netid", "ssid", "channel", "encryption"]);
        assert_eq!(flat.rows.len(), 3);
    }

    #[test]
    fn one_row_per_point_with_point_precedence() {
        let flat = flatten(&records_from_value(json!([{
            "netid": "A",
            "lastupdt": "parent",
            "locationData": [
                {"latitude": 1.0, "longitude": 2.0, "lastupdt": "p1"},
                {"latitude": 3.0, "longitude": 4.0}
            ]
        }])));
        assert_eq!(flat.rows.len(), 2);
        assert_eq!(flat.rows[0]["lastupdt"], json!("p1"));
        assert_eq!(flat.rows[1]["lastupdt"], json!("parent"));
        assert_eq!(
            flat.columns,
            vec!["netid", "lastupdt", "latitude", "longitude"]
        );
        assert!(!flat.columns.iter().any(|c| c == "locationData"));
    }

    #[test]
    fn points_without_coordinates_still_flatten() {
        let flat = flatten(&records_from_value(json!([
            {"netid": "A", "locations": [{"time": "t1"}, {"time": "t2"}]},
            {"netid": "B"}
        ])));
        assert_eq!(flat.rows.len(), 3);
    }

    #[test]
    fn point_rows_never_borrow_parent_coordinates() {
        let flat = flatten(&records_from_value(json!([
            {"netid": "A", "trilat": 45, "trilong": -122, "locationData": [
                {"time": "t1"},
                {"latitude": 10, "time": "t2"},
                {"latitude": 11.5, "longitude": "-121.5"}
            ]},
            {"netid": "B", "trilat": 1, "trilong": 2}
        ])));
        assert_eq!(flat.rows.len(), 4);
        assert_eq!(flat.coordinates.len(), 4);
        assert_eq!(flat.coordinates[0], None);
        assert_eq!(flat.coordinates[1], None);
        assert_eq!(
            flat.coordinates[2],
            Some(("11.5".to_string(), "-121.5".to_string()))
        );
        assert_eq!(flat.coordinates[3], Some(("1".to_string(), "2".to_string())));
        assert_eq!(flat.located().count(), 2);
    }

    #[test]
    fn flatten_is_deterministic() {
        let input = records_from_value(json!([
            {"b": 1, "a": 2},
            {"c": 3, "locationData": [{"z": 1, "lat": 0}]}
        ]));
        assert_eq!(flatten(&input).columns, flatten(&input).columns);
        assert_eq!(flatten(&input).columns, vec!["b", "a", "c", "z", "lat"]);
    }

    #[test]
    fn cell_text_serializes_nested_values() {
        let v = json!({"rcois": ["a", "b"]});
        assert_eq!(cell_text(v.get("rcois")), r#"["a","b"]"#);
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!(null))), "");
        assert_eq!(cell_text(Some(&json!(6))), "6");
    }
}
