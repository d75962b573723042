//! Long-running dominance ratio series: `YYYY-MM-DD HH:MM,ratio`, no header.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::{
    store::{StoreError, StoreResult},
    tz::{minute_stamp, parse_minute_stamp},
};

/// One observation of the dominance ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominanceSample {
    /// When the snapshot was taken, minute precision.
    pub timestamp: DateTime<Utc>,
    /// Percentage of total market cap, two decimals.
    pub ratio: f64,
}

/// Append-only dominance file.
#[derive(Debug, Clone)]
pub struct DominanceSeries {
    path: PathBuf,
}

impl DominanceSeries {
    /// Series stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing this series.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one sample line.
    pub fn append(&self, sample: &DominanceSample) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let line = format!("{},{:.2}\n", minute_stamp(&sample.timestamp), sample.ratio);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()))
            .map_err(|e| StoreError::io(&self.path, e))
    }

    /// Reads every sample; a missing file is an empty series.
    pub fn load(&self) -> StoreResult<Vec<DominanceSample>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        text.lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, line)| {
                let corrupt = |reason: String| {
                    StoreError::corrupt(&self.path, format!("line {}: {reason}", i + 1))
                };
                let (stamp, ratio) = line
                    .split_once(',')
                    .ok_or_else(|| corrupt("expected two columns".into()))?;
                let timestamp = parse_minute_stamp(stamp).map_err(|e| corrupt(e.to_string()))?;
                let ratio = ratio
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| corrupt(format!("bad ratio {ratio:?}")))?;
                Ok(DominanceSample { timestamp, ratio })
            })
            .collect()
    }
}
