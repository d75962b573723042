//! Append-only, date-indexed price series stored as one CSV file per symbol.
//!
//! Layout: `<root>/<SYMBOL>.csv`, header
//! `Date,Open,High,Low,Close,Volume,Dividends,Stock Splits`, one row per period.
//! Committed rows are never rewritten; new rows are only ever appended.

use std::{
    fs::{self, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset};
use market_data_ingestor::models::bar::PriceBar;

use crate::{
    store::{StoreError, StoreResult},
    tz::{format_bar_ts, parse_bar_ts},
};

/// Column names, in file order.
pub const HEADER: [&str; 8] = [
    "Date",
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "Dividends",
    "Stock Splits",
];

/// Per-symbol CSV datasets under a single root directory.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    /// Store rooted at `root`. The directory is created on first append.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the datasets.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<SYMBOL>.csv`
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{symbol}.csv"))
    }

    /// Reads every persisted row for `symbol`.
    ///
    /// A missing or zero-length file yields an empty vector. Anything that does
    /// not look like a dataset written by [`DatasetStore::append`] is reported
    /// as [`StoreError::Corrupt`].
    pub fn load(&self, symbol: &str) -> StoreResult<Vec<PriceBar>> {
        let path = self.path_for(symbol);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        parse_dataset(&path, &bytes)
    }

    /// Timestamp of the most recent stored row, `None` when nothing is stored.
    pub fn last_timestamp(&self, symbol: &str) -> StoreResult<Option<DateTime<FixedOffset>>> {
        Ok(self.load(symbol)?.last().map(|bar| bar.timestamp))
    }

    /// Appends `rows` to the end of the dataset and returns how many were written.
    ///
    /// The header is written first when the file is new or empty. Rows are
    /// rendered up front and flushed with a single write so a failure cannot
    /// leave half a batch behind. Callers are responsible for ordering; the
    /// store does not reorder or deduplicate.
    pub fn append(&self, symbol: &str, rows: &[PriceBar]) -> StoreResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let path = self.path_for(symbol);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        let len = file.metadata().map_err(|e| StoreError::io(&path, e))?.len();
        let needs_header = len == 0;
        let needs_newline =
            len > 0 && !ends_with_newline(&mut file).map_err(|e| StoreError::io(&path, e))?;

        let mut buf = Vec::new();
        if needs_newline {
            buf.push(b'\n');
        }
        buf.extend(render_rows(rows, needs_header).map_err(|e| StoreError::io(&path, e))?);
        file.write_all(&buf)
            .and_then(|_| file.sync_data())
            .map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(symbol, rows = rows.len(), path = %path.display(), "appended rows");
        Ok(rows.len())
    }
}

fn ends_with_newline(file: &mut fs::File) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn render_rows(rows: &[PriceBar], header: bool) -> io::Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    if header {
        w.write_record(HEADER)?;
    }
    for bar in rows {
        w.write_record([
            format_bar_ts(&bar.timestamp),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
            bar.dividends.to_string(),
            bar.stock_splits.to_string(),
        ])?;
    }
    w.into_inner().map_err(|e| e.into_error())
}

fn parse_dataset(path: &Path, bytes: &[u8]) -> StoreResult<Vec<PriceBar>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| StoreError::corrupt(path, format!("unreadable header: {e}")))?;
    if !headers.iter().eq(HEADER) {
        return Err(StoreError::corrupt(
            path,
            format!("unexpected header {:?}", headers.iter().collect::<Vec<_>>()),
        ));
    }

    let mut out: Vec<PriceBar> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = record.map_err(|e| StoreError::corrupt(path, format!("line {line}: {e}")))?;
        let bar = parse_record(&record)
            .map_err(|reason| StoreError::corrupt(path, format!("line {line}: {reason}")))?;
        if let Some(prev) = out.last() {
            if bar.timestamp <= prev.timestamp {
                return Err(StoreError::corrupt(
                    path,
                    format!(
                        "line {line}: timestamp {} does not follow {}",
                        bar.timestamp, prev.timestamp
                    ),
                ));
            }
        }
        out.push(bar);
    }
    Ok(out)
}

fn parse_record(record: &csv::StringRecord) -> Result<PriceBar, String> {
    if record.len() != HEADER.len() {
        return Err(format!(
            "expected {} fields, found {}",
            HEADER.len(),
            record.len()
        ));
    }
    let num = |idx: usize| -> Result<f64, String> {
        let raw = record[idx].trim();
        raw.parse::<f64>()
            .map_err(|_| format!("{} is not a number: {raw:?}", HEADER[idx]))
    };
    Ok(PriceBar {
        timestamp: parse_bar_ts(&record[0]).map_err(|e| e.to_string())?,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
        dividends: num(6)?,
        stock_splits: num(7)?,
    })
}
