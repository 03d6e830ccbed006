//! CSV and JSON export of entity collections.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::store::Entity;

pub trait CsvRecord {
    const HEADERS: &'static [&'static str];
    /// File name prefix; the export date and extension are appended.
    const FILE_STEM: &'static str;

    fn csv_row(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("csv") => Some(Self::Csv),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No {0} records to export")]
    Empty(&'static str),

    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub filename: String,
    pub content: String,
    pub rows: usize,
}

pub fn render<T>(records: &[T], format: ExportFormat, date: NaiveDate) -> Result<ExportPayload, ExportError>
where
    T: Entity + CsvRecord + Serialize,
{
    if records.is_empty() {
        return Err(ExportError::Empty(T::KIND));
    }
    let content = match format {
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Json => serde_json::to_string_pretty(records)?,
    };
    Ok(ExportPayload {
        filename: default_filename(T::FILE_STEM, date, format),
        content,
        rows: records.len(),
    })
}

pub fn to_csv<T: CsvRecord>(records: &[T]) -> String {
    let mut csv = T::HEADERS.join(",");
    csv.push('\n');
    for r in records {
        let row: Vec<String> = r.csv_row().iter().map(|f| csv_quote(f)).collect();
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn default_filename(stem: &str, date: NaiveDate, format: ExportFormat) -> String {
    format!("{}_{}.{}", stem, date.format("%Y-%m-%d"), format.extension())
}

pub fn write_payload(payload: &ExportPayload, out: &Path) -> Result<PathBuf, ExportError> {
    let to_err = |source: std::io::Error| ExportError::Write {
        path: out.to_string_lossy().to_string(),
        source,
    };
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(to_err)?;
        }
    }
    std::fs::write(out, &payload.content).map_err(to_err)?;
    tracing::info!(path = %out.display(), rows = payload.rows, "export written");
    Ok(out.to_path_buf())
}

/// Optional text rendered as-is, or `placeholder` when absent or blank.
pub fn or_placeholder(v: Option<&str>, placeholder: &str) -> String {
    match v.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => placeholder.to_string(),
    }
}
