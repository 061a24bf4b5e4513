//! Run naming scope: output directory + run tag

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::store::RecordStore;

/// Output directory and run tag shared by every page and export of one run.
///
/// A search run with prefix `wifi-basic` started at epoch 1700000000 lives in
/// `<parent>/wifi-basic-1700000000/` and its run tag is
/// `wifi-basic-1700000000`.
#[derive(Debug, Clone)]
pub struct RunContext {
    output_dir: PathBuf,
    prefix: String,
    run_tag: String,
    created_at: DateTime<Utc>,
}

impl RunContext {
    /// Create a fresh `<parent>/<prefix>-<epoch>` directory.
    ///
    /// If two runs start within the same second, the later one gets a
    /// `_2`, `_3`, ... suffix so runs never share a directory.
    pub fn create(parent: &Path, prefix: &str) -> Result<Self> {
        let created_at = Utc::now();
        let base_tag = format!("{prefix}-{}", created_at.timestamp());

        let mut run_tag = base_tag.clone();
        let mut n = 1;
        while parent.join(&run_tag).exists() {
            n += 1;
            run_tag = format!("{base_tag}_{n}");
        }

        let output_dir = parent.join(&run_tag);
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

        Ok(Self {
            output_dir,
            prefix: prefix.to_string(),
            run_tag,
            created_at,
        })
    }

    /// Context over an existing directory (no filesystem access).
    pub fn existing(output_dir: impl Into<PathBuf>, prefix: &str, run_tag: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.to_string(),
            run_tag: run_tag.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn run_tag(&self) -> &str {
        &self.run_tag
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// File stem shared by this run's search pages and exports:
    /// `{prefix}-{runTag}`.
    pub fn stem(&self) -> String {
        format!("{}-{}", self.prefix, self.run_tag)
    }

    /// `{output_dir}/{stem}.{ext}`
    pub fn artifact_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.{ext}"))
    }

    pub fn store(&self) -> RecordStore {
        RecordStore::new(&self.output_dir)
    }
}

/// Make a lookup key safe for file names: `:` is dropped and every run of
/// characters outside `[A-Za-z0-9_-]` becomes a single `_`.
pub fn sanitize_basename(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars().filter(|&c| c != ':') {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}
