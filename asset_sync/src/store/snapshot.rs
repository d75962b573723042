//! Per-day option chain snapshots.
//!
//! Each `(symbol, as-of date)` pair gets its own file:
//! `<root>/<YYYY-MM-DD>/OMON_<symbol>_<YYYY-MM-DD>.csv`. Files are written to a
//! sibling `*.tmp` path and renamed into place, so readers never observe a
//! partial snapshot. A rerun on the same day replaces that day's file; earlier
//! days are never touched.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Serialize;

use crate::store::{StoreError, StoreResult};

/// Writes option snapshots under a root directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    root: PathBuf,
}

impl SnapshotWriter {
    /// Writer rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the per-day folders.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path of the snapshot for `symbol` on `as_of`.
    pub fn path_for(&self, symbol: &str, as_of: NaiveDate) -> PathBuf {
        let day = as_of.format("%Y-%m-%d").to_string();
        self.root.join(&day).join(format!("OMON_{symbol}_{day}.csv"))
    }

    /// Serializes `rows` (with a header, no index column) and atomically
    /// publishes the file. Returns the final path.
    pub fn write<T: Serialize>(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        rows: &[T],
    ) -> StoreResult<PathBuf> {
        let path = self.path_for(symbol, as_of);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }

        let mut w = csv::Writer::from_writer(Vec::new());
        for row in rows {
            w.serialize(row)
                .map_err(|e| StoreError::corrupt(&path, format!("unserializable row: {e}")))?;
        }
        let bytes = w
            .into_inner()
            .map_err(|e| StoreError::io(&path, e.into_error()))?;

        let tmp = path.with_extension("csv.tmp");
        fs::write(&tmp, &bytes).map_err(|e| StoreError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&path, e));
        }
        tracing::debug!(
            symbol,
            %as_of,
            rows = rows.len(),
            path = %path.display(),
            "snapshot written"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Row {
        strike: f64,
        #[serde(rename = "optionType")]
        option_type: &'static str,
    }

    #[test]
    fn writes_header_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(dir.path());
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let path = writer
            .write("AAPL", day, &[Row { strike: 90.0, option_type: "C" }])
            .unwrap();

        assert_eq!(path, dir.path().join("2024-06-03").join("OMON_AAPL_2024-06-03.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "strike,optionType\n90.0,C\n");
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn separate_days_stay_separate() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(dir.path());
        let d1 = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let d2 = d1.succ_opt().unwrap();
        let p1 = writer.write("AAPL", d1, &[Row { strike: 1.0, option_type: "C" }]).unwrap();
        let p2 = writer.write("AAPL", d2, &[Row { strike: 2.0, option_type: "P" }]).unwrap();

        assert_ne!(p1, p2);
        assert_eq!(fs::read_to_string(&p1).unwrap(), "strike,optionType\n1.0,C\n");
        assert_eq!(fs::read_to_string(&p2).unwrap(), "strike,optionType\n2.0,P\n");
    }
}
