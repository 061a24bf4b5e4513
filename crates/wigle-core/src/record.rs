//! Schema-less record model shared by the fetch, store and export stages.
//!
//! The API returns open JSON objects whose shape varies per endpoint, so a
//! [`Record`] is just an insertion-ordered JSON map. Helpers here know the
//! handful of field names that carry coordinates and nested location points.

use serde_json::{Map, Value};

/// One API entity: field name → JSON value, in the order the API sent them.
pub type Record = Map<String, Value>;

/// Fields that may hold a record's nested location points, in lookup order.
pub const LOCATION_FIELDS: [&str; 2] = ["locationData", "locations"];

/// Latitude aliases; point-level names come before the record-level `trilat`.
pub const LAT_FIELDS: [&str; 3] = ["lat", "latitude", "trilat"];

/// Longitude aliases, same precedence as [`LAT_FIELDS`].
pub const LON_FIELDS: [&str; 3] = ["lon", "longitude", "trilong"];

/// Coordinate names a nested location point carries itself.
pub const POINT_LAT_FIELDS: [&str; 2] = ["lat", "latitude"];
pub const POINT_LON_FIELDS: [&str; 2] = ["lon", "longitude"];

const TIME_FIELDS: [&str; 3] = ["time", "lasttime", "lastupdt"];

/// A single observation of a device.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPoint {
    pub lat: f64,
    pub lon: f64,
    pub time: Option<String>,
}

impl LocationPoint {
    /// `(lat, lon)` rendered with six decimals, as shown in the live view.
    pub fn display_coords(&self) -> (String, String) {
        (format!("{:.6}", self.lat), format!("{:.6}", self.lon))
    }
}

/// Null and empty strings count as absent.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// First non-blank value among `keys`.
pub fn first_present<'a>(map: &'a Record, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !is_blank(v))
}

/// Numeric reading of a coordinate value (number or numeric string).
pub fn coordinate(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Raw `(lat, lon)` values from `lat_keys`/`lon_keys`, when they form a
/// valid pair.
///
/// Zero is a valid coordinate; values outside ±90 / ±180 are not.
fn valid_values<'a>(
    map: &'a Record,
    lat_keys: &[&str],
    lon_keys: &[&str],
) -> Option<(&'a Value, &'a Value)> {
    let lat_value = first_present(map, lat_keys)?;
    let lon_value = first_present(map, lon_keys)?;
    let lat = coordinate(lat_value)?;
    let lon = coordinate(lon_value)?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
        .then_some((lat_value, lon_value))
}

/// Coordinate values of a record, falling back to `trilat`/`trilong`.
pub fn coordinate_values(map: &Record) -> Option<(&Value, &Value)> {
    valid_values(map, &LAT_FIELDS, &LON_FIELDS)
}

/// Coordinate values a location point carries itself; the parent record's
/// `trilat`/`trilong` never stand in for them.
pub fn point_coordinate_values(point: &Record) -> Option<(&Value, &Value)> {
    valid_values(point, &POINT_LAT_FIELDS, &POINT_LON_FIELDS)
}

/// Valid `(lat, lon)` pair from the first present latitude/longitude fields.
pub fn coordinate_pair(map: &Record) -> Option<(f64, f64)> {
    let (lat, lon) = coordinate_values(map)?;
    Some((coordinate(lat)?, coordinate(lon)?))
}

/// Nested point objects of a record.
///
/// The first non-empty location field wins; a lone object counts as one
/// point and non-object array entries are skipped.
pub fn raw_points(record: &Record) -> Vec<&Record> {
    let nested = LOCATION_FIELDS
        .iter()
        .filter_map(|k| record.get(*k))
        .find(|v| match v {
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            _ => false,
        });
    match nested {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(point)) => vec![point],
        _ => Vec::new(),
    }
}

/// Location points of a record that carry a usable coordinate pair.
///
/// A point without its own timestamp inherits the record's `lastupdt`.
pub fn location_points(record: &Record) -> Vec<LocationPoint> {
    raw_points(record)
        .into_iter()
        .filter_map(|point| {
            let (lat, lon) = point_coordinate_values(point)?;
            let (lat, lon) = (coordinate(lat)?, coordinate(lon)?);
            let time = first_present(point, &TIME_FIELDS)
                .or_else(|| first_present(record, &["lastupdt"]))
                .map(scalar_text);
            Some(LocationPoint { lat, lon, time })
        })
        .collect()
}

/// Plain text of a value: strings unquoted, null empty, everything else as
/// compact JSON.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Records held by a parsed JSON document.
///
/// Accepts a bare array, an object wrapping a `results` array, or a single
/// object. Non-object entries are dropped.
pub fn records_from_value(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(into_object).collect(),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items.into_iter().filter_map(into_object).collect(),
            Some(other) => {
                map.insert("results".to_string(), other);
                vec![map]
            }
            None => vec![map],
        },
        _ => Vec::new(),
    }
}

fn into_object(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
