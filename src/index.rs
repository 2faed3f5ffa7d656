//! Paper index I/O
//!
//! Loads bibliographic records from the per-conference CSV files in an
//! index directory, writes the classification report back out as CSV, and
//! persists the fetch failure list as JSON for manual replay.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::fetch::FailureSet;
use crate::pipeline::PaperReport;
use crate::record::PaperRecord;

/// Year assigned when the source index has no year column or an empty cell.
pub const FALLBACK_YEAR: u16 = 2023;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw CSV row, schema-normalized upstream. Optional cells may be empty.
#[derive(Debug, Deserialize)]
struct IndexRow {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    conference: Option<String>,
    #[serde(default)]
    authors: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    pdf_url: Option<String>,
    #[serde(default)]
    code_url: Option<String>,
}

fn non_blank(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Load every `*.csv` file in `index_dir` into records.
///
/// Rows without a title violate the loader's precondition; they are logged
/// and skipped rather than failing the run.
pub fn load_index(index_dir: &Path, fallback_year: u16) -> Result<Vec<PaperRecord>, IndexError> {
    let mut csv_paths: Vec<_> = fs::read_dir(index_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("csv"))
        .collect();
    csv_paths.sort();

    let mut records = Vec::new();
    for path in csv_paths {
        println!("[index] loading {:?}", path);
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        for row in reader.deserialize::<IndexRow>() {
            let row = row?;
            let title = match non_blank(row.title) {
                Some(title) => title,
                None => {
                    eprintln!("[index] skipping title-less row in {:?}", path);
                    continue;
                }
            };
            let year = non_blank(row.year)
                .and_then(|y| y.parse::<u16>().ok())
                .unwrap_or(fallback_year);

            records.push(PaperRecord {
                title,
                conference: non_blank(row.conference).unwrap_or_default(),
                authors: non_blank(row.authors).unwrap_or_default(),
                year,
                abstract_text: non_blank(row.abstract_text),
                source_url: non_blank(row.pdf_url),
                repository_url: non_blank(row.code_url),
            });
        }
    }

    println!("[index] loaded {} records", records.len());
    Ok(records)
}

/// Write one CSV row per report: record fields, the `relevant` flag, one
/// 0/1 column per group name (sorted), and `confirmed` last. The group and
/// `confirmed` columns appear only when a scan actually ran.
pub fn write_report(path: &Path, reports: &[PaperReport]) -> Result<(), IndexError> {
    let group_names: BTreeSet<&str> = reports
        .iter()
        .filter_map(|r| r.groups.as_ref())
        .flat_map(|g| g.keys().map(String::as_str))
        .collect();
    let scanned = reports.iter().any(|r| r.confirmed.is_some());

    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![
        "title", "conference", "authors", "year", "abstract", "pdf_url", "code_url", "relevant",
    ];
    header.extend(group_names.iter().copied());
    if scanned {
        header.push("confirmed");
    }
    writer.write_record(&header)?;

    for report in reports {
        let record = &report.record;
        let mut row = vec![
            record.title.clone(),
            record.conference.clone(),
            record.authors.clone(),
            record.year.to_string(),
            record.abstract_text.clone().unwrap_or_default(),
            record.source_url.clone().unwrap_or_default(),
            record.repository_url.clone().unwrap_or_default(),
            flag(report.relevant),
        ];
        for name in &group_names {
            let cell = report
                .groups
                .as_ref()
                .and_then(|g| g.get(*name))
                .map(|&hit| flag(hit))
                .unwrap_or_default();
            row.push(cell);
        }
        if scanned {
            row.push(report.confirmed.map(flag).unwrap_or_default());
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn flag(value: bool) -> String {
    if value { "1".to_string() } else { "0".to_string() }
}

/// Persist the failure set for a later `fetch --retry` run.
pub fn save_failures(path: &Path, failures: &FailureSet) -> Result<(), IndexError> {
    let json = serde_json::to_string_pretty(failures)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_failures(path: &Path) -> Result<FailureSet, IndexError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
