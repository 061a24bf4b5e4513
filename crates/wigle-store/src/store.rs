//! Page files: atomic write, ordered listing, loading, merging, deletion
//!
//! Directory layout for one run:
//! ```text
//! {output_dir}/
//! ├── {stem}-page_1.json    # raw API page, compact JSON array
//! ├── {stem}-page_2.json
//! ├── {stem}.json           # merged pages (detail runs with "keep JSON")
//! ├── {stem}.csv
//! └── {stem}.kml
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use wigle_core::{Record, records_from_value};

/// Failure to persist or read back a page.
#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Json { path, source } => write!(f, "{}: invalid JSON: {source}", path.display()),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

/// Page files of one output directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/{stem}-page_{page}.json`
    pub fn page_path(&self, stem: &str, page: u32) -> PathBuf {
        self.dir.join(format!("{stem}-page_{page}.json"))
    }

    /// `{dir}/{stem}.json`
    pub fn merged_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.json"))
    }

    /// Persist one page. The file appears complete or not at all.
    pub fn write_page(
        &self,
        stem: &str,
        page: u32,
        records: &[Record],
    ) -> Result<PathBuf, StoreError> {
        let path = self.page_path(stem, page);
        write_json_atomic(&path, records)?;
        Ok(path)
    }

    /// Existing page files for `stem`, ordered by page number.
    pub fn list_pages(&self, stem: &str) -> Vec<PathBuf> {
        let pattern = format!(
            "{}/{}-page_*.json",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            glob::Pattern::escape(stem)
        );
        let Ok(paths) = glob::glob(&pattern) else {
            log::warn!("invalid page pattern: {pattern}");
            return Vec::new();
        };

        let mut pages: Vec<(u32, PathBuf)> = paths
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .filter_map(|p| page_number(&p, stem).map(|n| (n, p)))
            .collect();
        pages.sort_by_key(|(n, _)| *n);
        pages.into_iter().map(|(_, p)| p).collect()
    }

    /// Stems with stored JSON in this directory, sorted.
    ///
    /// `{stem}-page_{n}.json` and merged `{stem}.json` both count.
    pub fn stems(&self) -> Vec<String> {
        let pattern = format!("{}/*.json", glob::Pattern::escape(&self.dir.to_string_lossy()));
        let Ok(paths) = glob::glob(&pattern) else {
            return Vec::new();
        };

        let mut stems: Vec<String> = paths
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .filter_map(|p| {
                let name = p.file_name()?.to_str()?.strip_suffix(".json")?.to_string();
                Some(match name.rsplit_once("-page_") {
                    Some((stem, n)) if n.parse::<u32>().is_ok() => stem.to_string(),
                    _ => name,
                })
            })
            .collect();
        stems.sort();
        stems.dedup();
        stems
    }

    /// Files an export of `stem` should read: the merged file when one
    /// exists, otherwise the individual pages.
    pub fn source_files(&self, stem: &str) -> Vec<PathBuf> {
        let merged = self.merged_path(stem);
        if merged.is_file() {
            return vec![merged];
        }
        self.list_pages(stem)
    }

    /// Delete `{stem}.json` if present. Returns whether a file was removed.
    pub fn remove_merged(&self, stem: &str) -> Result<bool, StoreError> {
        let path = self.merged_path(stem);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Concatenate `pages` into `{stem}.json`. The pages are left in place.
    pub fn merge(&self, stem: &str, pages: &[PathBuf]) -> Result<PathBuf, StoreError> {
        let mut all = Vec::new();
        for page in pages {
            all.extend(load_records(page)?);
        }
        let path = self.merged_path(stem);
        write_json_atomic(&path, &all)?;
        Ok(path)
    }
}

/// Page number encoded in `{stem}-page_{n}.json`.
fn page_number(path: &Path, stem: &str) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix(stem)?
        .strip_prefix("-page_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// Serialize `value` compactly to `path` via a `.tmp` sibling and rename.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = (|| {
        let io_err = |source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        };
        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value).map_err(|source| StoreError::Json {
            path: tmp_path.clone(),
            source,
        })?;
        writer.flush().map_err(io_err)?;
        fs::rename(&tmp_path, path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    })();

    if result.is_err() && tmp_path.exists() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Read the records held by one page or merged file.
pub fn load_records(path: &Path) -> Result<Vec<Record>, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(records_from_value(value))
}

/// Records of every readable file, in order. Unreadable files are logged
/// and skipped.
pub fn load_all(paths: &[PathBuf]) -> Vec<Record> {
    let mut records = Vec::new();
    for path in paths {
        match load_records(path) {
            Ok(r) => records.extend(r),
            Err(e) => log::warn!("skipping unreadable page {e}"),
        }
    }
    records
}

/// Best-effort removal; missing or locked files are skipped.
///
/// Returns how many files were actually removed.
pub fn delete_files(paths: &[PathBuf]) -> usize {
    paths
        .iter()
        .filter(|p| match fs::remove_file(p) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("could not remove {}: {e}", p.display());
                false
            }
        })
        .count()
}
