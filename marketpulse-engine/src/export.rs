//! Snapshot export: JSON and CSV artifacts.
//!
//! An export directory holds:
//! - `snapshot.json`: the full snapshot
//! - `<code>.csv`: the analyzed bars of each usable board, readable again by
//!   the CSV history source
//! - `style_ratio.csv`: the rebased relative-strength line and its average

use std::fs;
use std::path::{Path, PathBuf};

use marketpulse_core::data::{write_series_csv, DataError};
use marketpulse_core::domain::{IndexSeries, StyleSignal};

use crate::snapshot::{AnalysisOutcome, MarketSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("nothing to export: {0}")]
    Failed(String),
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(outcome: &AnalysisOutcome) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: date, ratio, ratio_ma. Unknown values are empty cells.
pub fn export_style_csv(style: &StyleSignal) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "ratio", "ratio_ma"])?;

    let cell = |v: Option<f64>| v.map(|v| format!("{v:.6}")).unwrap_or_default();
    for (point, ma) in style.ratio_series.iter().zip(&style.ratio_ma) {
        wtr.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            cell(point.value),
            cell(*ma),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Failed(e.to_string()))
}

// ─── Directory export ───────────────────────────────────────────────

/// Write every artifact of `snapshot` into `dir`, returning the files written.
pub fn export_snapshot(snapshot: &MarketSnapshot, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let json_path = dir.join("snapshot.json");
    fs::write(&json_path, serde_json::to_string_pretty(snapshot)?)?;
    written.push(json_path);

    for signal in snapshot.boards.iter().filter_map(|b| b.signal()) {
        let path = dir.join(format!("{}.csv", signal.code));
        let series = IndexSeries::new(&signal.code, &signal.name, signal.bars.clone());
        write_series_csv(&path, &series)?;
        written.push(path);
    }

    if let Some(style) = snapshot.style.signal() {
        let path = dir.join("style_ratio.csv");
        fs::write(&path, export_style_csv(style)?)?;
        written.push(path);
    }

    tracing::info!(dir = %dir.display(), files = written.len(), "snapshot exported");
    Ok(written)
}

/// Like [`export_snapshot`], refusing failed cycles.
pub fn export_outcome(outcome: &AnalysisOutcome, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    match outcome {
        AnalysisOutcome::Snapshot(snapshot) => export_snapshot(snapshot, dir),
        AnalysisOutcome::Failed { error } => Err(ExportError::Failed(error.clone())),
    }
}
