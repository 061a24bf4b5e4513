//! KML export: one placemark per row with a valid coordinate pair

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use wigle_core::{first_present, scalar_text};
use wigle_store::load_all;

use crate::ExportOutcome;
use crate::flatten::{ExportRow, Flattened, RowCoordinates, cell_text, flatten};

const KML_NS: &str = "http://www.opengis.net/kml/2.2";

/// Label fields tried before falling back to identifiers
const NAME_FIELDS: [&str; 2] = ["ssid", "name"];
const ID_FIELDS: [&str; 2] = ["netid", "id"];

/// Flatten the records of `sources` and write placemarks to `path`.
pub fn export_kml(sources: &[PathBuf], path: &Path) -> Result<ExportOutcome> {
    if sources.is_empty() {
        return Ok(ExportOutcome::Empty("no JSON pages"));
    }
    let flat = flatten(&load_all(sources));
    write_kml(&flat, path)
}

/// Best human label for a row: a name-like field, else an identifier.
pub fn placemark_name(row: &ExportRow) -> String {
    first_present(row, &NAME_FIELDS)
        .or_else(|| first_present(row, &ID_FIELDS))
        .map(scalar_text)
        .unwrap_or_default()
}

/// Write a KML document; rows without a valid coordinate pair are skipped.
///
/// When no row qualifies nothing is written and the outcome is
/// [`ExportOutcome::Empty`].
pub fn write_kml(flat: &Flattened, path: &Path) -> Result<ExportOutcome> {
    let placemarks: Vec<(&ExportRow, &RowCoordinates)> = flat.located().collect();
    if placemarks.is_empty() {
        return Ok(ExportOutcome::Empty("no points with lat/lon"));
    }

    let tmp_path = path.with_extension("kml.tmp");
    let written = (|| -> Result<()> {
        let file = File::create(&tmp_path)
            .with_context(|| format!("failed to create {}", tmp_path.display()))?;
        let mut writer = Writer::new(BufWriter::new(file));
        write_document(&mut writer, &flat.columns, &placemarks)?;
        writer.into_inner().flush()?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename {} → {}", tmp_path.display(), path.display()))?;

    Ok(ExportOutcome::Written {
        path: path.to_path_buf(),
        items: placemarks.len(),
    })
}

fn write_document<W: Write>(
    writer: &mut Writer<W>,
    columns: &[String],
    placemarks: &[(&ExportRow, &RowCoordinates)],
) -> Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut kml = BytesStart::new("kml");
    kml.push_attribute(("xmlns", KML_NS));
    writer.write_event(Event::Start(kml))?;
    writer.write_event(Event::Start(BytesStart::new("Document")))?;

    for (row, (lat, lon)) in placemarks.iter().copied() {
        writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
        text_element(writer, "name", &placemark_name(row))?;

        writer.write_event(Event::Start(BytesStart::new("ExtendedData")))?;
        for column in columns {
            let mut data = BytesStart::new("Data");
            data.push_attribute(("name", column.as_str()));
            writer.write_event(Event::Start(data))?;
            text_element(writer, "value", &cell_text(row.get(column)))?;
            writer.write_event(Event::End(BytesEnd::new("Data")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("ExtendedData")))?;

        writer.write_event(Event::Start(BytesStart::new("Point")))?;
        text_element(writer, "coordinates", &format!("{lon},{lat},0"))?;
        writer.write_event(Event::End(BytesEnd::new("Point")))?;
        writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    writer.write_event(Event::End(BytesEnd::new("kml")))?;
    Ok(())
}

fn text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wigle_core::records_from_value;

    fn flat(v: serde_json::Value) -> Flattened {
        flatten(&records_from_value(v))
    }

    #[test]
    fn name_falls_back_to_identifier() {
        let rows = flat(json!([
            {"ssid": "", "name": "Beacon", "netid": "A"},
            {"ssid": null, "netid": "AA:BB"},
            {"id": 42},
            {"channel": 1}
        ]))
        .rows;
        assert_eq!(placemark_name(&rows[0]), "Beacon");
        assert_eq!(placemark_name(&rows[1]), "AA:BB");
        assert_eq!(placemark_name(&rows[2]), "42");
        assert_eq!(placemark_name(&rows[3]), "");
    }

    #[test]
    fn writes_placemarks_for_valid_coordinates_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.kml");
        let data = flat(json!([
            {"netid": "A", "ssid": "Cafe & Bar", "trilat": 45.5, "trilong": -122.25},
            {"netid": "B", "ssid": "nowhere"},
            {"netid": "C", "trilat": "", "trilong": 3}
        ]));

        let outcome = write_kml(&data, &path).unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Written {
                path: path.clone(),
                items: 1
            }
        );

        let kml = fs::read_to_string(&path).unwrap();
        assert!(kml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(kml.contains(r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#));
        assert_eq!(kml.matches("<Placemark>").count(), 1);
        assert!(kml.contains("<name>Cafe &amp; Bar</name>"));
        assert!(kml.contains(r#"<Data name="netid"><value>A</value></Data>"#));
        assert!(kml.contains("<coordinates>-122.25,45.5,0</coordinates>"));
    }

    #[test]
    fn extended_data_lists_every_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.kml");
        let data = flat(json!([
            {"netid": "A", "trilat": 1, "trilong": 2, "rcois": ["x"]},
            {"netid": "B", "channel": 11}
        ]));
        write_kml(&data, &path).unwrap();

        let kml = fs::read_to_string(&path).unwrap();
        assert_eq!(kml.matches("<Data name=").count(), data.columns.len());
        assert!(kml.contains(r#"<Data name="channel"><value></value></Data>"#));
        assert!(kml.contains("[&quot;x&quot;]") || kml.contains(r#"["x"]"#));
    }

    #[test]
    fn record_whose_points_lack_coordinates_yields_no_placemark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.kml");
        let data = flat(json!([
            {"netid": "A", "locationData": [{"time": "t1"}, {"latitude": 5}]}
        ]));
        assert_eq!(data.rows.len(), 2);
        assert_eq!(
            write_kml(&data, &path).unwrap(),
            ExportOutcome::Empty("no points with lat/lon")
        );
        assert!(!path.exists());
    }

    #[test]
    fn point_without_coordinates_ignores_record_trilat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detail.kml");
        let data = flat(json!([
            {"netid": "A", "trilat": 45, "trilong": -122, "locationData": [
                {"time": "t1"},
                {"latitude": 10, "time": "t2"}
            ]}
        ]));
        assert_eq!(
            write_kml(&data, &path).unwrap(),
            ExportOutcome::Empty("no points with lat/lon")
        );
        assert!(!path.exists());
    }

    #[test]
    fn point_coordinates_win_over_record_trilat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detail.kml");
        let data = flat(json!([
            {"netid": "A", "trilat": 45, "trilong": -122, "locationData": [
                {"latitude": 10, "longitude": 20}
            ]}
        ]));
        write_kml(&data, &path).unwrap();
        let kml = fs::read_to_string(&path).unwrap();
        assert!(kml.contains("<coordinates>20,10,0</coordinates>"));
        assert!(!kml.contains("-122"));
    }

    #[test]
    fn detail_points_become_placemarks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detail.kml");
        let data = flat(json!([
            {"netid": "A", "ssid": "home", "locationData": [
                {"latitude": 1.5, "longitude": 2.5},
                {"latitude": 3.5, "longitude": 4.5}
            ]},
            {"netid": "B"}
        ]));
        assert!(matches!(
            write_kml(&data, &path).unwrap(),
            ExportOutcome::Written { items: 2, .. }
        ));
        let kml = fs::read_to_string(&path).unwrap();
        assert!(kml.contains("<coordinates>2.5,1.5,0</coordinates>"));
        assert!(kml.contains("<coordinates>4.5,3.5,0</coordinates>"));
    }
}
