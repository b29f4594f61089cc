//! CSV directory import/export.
//!
//! One file per index, `<dir>/<code>.csv`, with header
//! `date,open,high,low,close,volume[,amount,pct_change]`. Dates go through
//! the time normalizer, so `20241220` and `2024/12/20` are accepted too.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::provider::{normalize_code, parse_number, DataError, HistorySource};
use crate::domain::{IndexSeries, PriceBar};
use crate::time;

/// Numeric cells stay text until coerced, so `-` or `N/A` reads as missing.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    #[serde(default)]
    open: Option<String>,
    #[serde(default)]
    high: Option<String>,
    #[serde(default)]
    low: Option<String>,
    #[serde(default)]
    close: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    pct_change: Option<String>,
}

fn cell(token: &Option<String>) -> Option<f64> {
    token.as_deref().and_then(parse_number)
}

#[derive(Debug, Serialize)]
struct CsvOutRow {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: Option<u64>,
    amount: Option<f64>,
    pct_change: Option<f64>,
}

/// History source backed by a directory of CSV files.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", normalize_code(code)))
    }
}

impl HistorySource for CsvDirSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_history(&self, code: &str, lookback_days: usize) -> Result<IndexSeries, DataError> {
        let code = normalize_code(code);
        let path = self.path_for(&code);
        if !path.exists() {
            return Err(DataError::CodeNotFound { code });
        }
        let series = read_series_csv(&path, &code)?;
        let bars = series.bars();
        let skip = bars.len().saturating_sub(lookback_days);
        Ok(IndexSeries::new(code.clone(), code, bars[skip..].to_vec()))
    }
}

/// Read a series file. Rows without a parseable date or close are dropped.
pub fn read_series_csv(path: &Path, code: &str) -> Result<IndexSeries, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for row in reader.deserialize::<CsvRow>() {
        let row = row?;
        let (Some(date), Some(close)) = (time::parse_date(&row.date), cell(&row.close)) else {
            dropped += 1;
            continue;
        };
        bars.push(PriceBar {
            date,
            open: cell(&row.open).unwrap_or(f64::NAN),
            high: cell(&row.high).unwrap_or(f64::NAN),
            low: cell(&row.low).unwrap_or(f64::NAN),
            close,
            volume: cell(&row.volume)
                .filter(|v| *v >= 0.0)
                .map(|v| v.round() as u64),
            amount: cell(&row.amount),
            pct_change: cell(&row.pct_change),
        });
    }

    if dropped > 0 {
        tracing::warn!(path = %path.display(), dropped, "skipped unparseable CSV rows");
    }
    Ok(IndexSeries::new(code, code, bars))
}

/// Write a series in the same layout [`read_series_csv`] accepts.
pub fn write_series_csv(path: &Path, series: &IndexSeries) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for bar in series.bars() {
        let finite = |v: f64| Some(v).filter(|v| v.is_finite());
        writer.serialize(CsvOutRow {
            date: bar.date.format("%Y-%m-%d").to_string(),
            open: finite(bar.open),
            high: finite(bar.high),
            low: finite(bar.low),
            close: bar.close,
            volume: bar.volume,
            amount: bar.amount,
            pct_change: bar.pct_change,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("marketpulse_csv_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn reads_minimal_and_extended_headers() {
        let dir = temp_dir();
        fs::write(
            dir.join("sh000001.csv"),
            "date,open,high,low,close,volume\n\
             2024-12-19,3300,3320,3290,3310.5,250000\n\
             20241220,3310.5,3330,3305,3320,260000\n",
        )
        .unwrap();
        fs::write(
            dir.join("sz399006.csv"),
            "date,open,high,low,close,volume,amount,pct_change\n\
             2024/12/20,2100,2110,2090,2105,1000,2.1e9,0.5\n",
        )
        .unwrap();

        let source = CsvDirSource::new(&dir);
        let sh = source.fetch_history("sh.000001", 400).unwrap();
        assert_eq!(sh.len(), 2);
        assert_eq!(sh.last().unwrap().close, 3320.0);

        let cyb = source.fetch_history("sz399006", 400).unwrap();
        assert_eq!(cyb.last().unwrap().amount, Some(2.1e9));
        assert_eq!(cyb.last().unwrap().pct_change, Some(0.5));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_rows_are_dropped_and_lookback_trims() {
        let dir = temp_dir();
        fs::write(
            dir.join("sh000001.csv"),
            "date,open,high,low,close,volume\n\
             N/A,1,1,1,1,1\n\
             2024-12-18,1,1,1,,1\n\
             2024-12-19,1,1,1,10,1\n\
             2024-12-20,1,1,1,11,1\n\
             2024-12-23,1,1,1,12,1\n",
        )
        .unwrap();
        let series = CsvDirSource::new(&dir).fetch_history("sh000001", 2).unwrap();
        assert_eq!(series.closes(), vec![11.0, 12.0]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn dash_cells_read_as_missing() {
        let dir = temp_dir();
        fs::write(
            dir.join("sh000001.csv"),
            "date,open,high,low,close,volume\n\
             2024-12-19,-,1,1,10,0\n\
             2024-12-20,1,1,1,11,-\n",
        )
        .unwrap();
        let series = CsvDirSource::new(&dir).fetch_history("sh000001", 10).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.bars()[0].open.is_nan());
        assert_eq!(series.bars()[0].volume, Some(0));
        assert_eq!(series.bars()[1].volume, None);
        assert!(series.volumes()[1].is_nan());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_code_not_found() {
        let dir = temp_dir();
        let err = CsvDirSource::new(&dir).fetch_history("sh000001", 10).unwrap_err();
        assert!(matches!(err, DataError::CodeNotFound { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn written_file_reads_back() {
        let dir = temp_dir();
        let bars = vec![PriceBar {
            date: chrono::NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            open: f64::NAN,
            high: 11.0,
            low: 9.0,
            close: 10.0,
            volume: Some(42),
            amount: None,
            pct_change: None,
        }];
        let series = IndexSeries::new("sh000001", "sh000001", bars);
        let path = dir.join("out").join("sh000001.csv");
        write_series_csv(&path, &series).unwrap();

        let back = read_series_csv(&path, "sh000001").unwrap();
        assert_eq!(back.len(), 1);
        assert!(back.bars()[0].open.is_nan());
        assert_eq!(back.bars()[0].volume, Some(42));
        let _ = fs::remove_dir_all(&dir);
    }
}
