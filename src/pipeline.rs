//! Corpus pipeline
//!
//! Composes the core components: fetch missing PDFs, classify every record
//! from title/abstract, then optionally confirm the survivors by scanning
//! their PDF text for keyword groups. The fetch phase fully completes
//! before any scan starts; the two concurrency regimes never nest.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::{stream, StreamExt};

use crate::classifier::classify;
use crate::fetch::{FailureSet, FetchConfig, FetchError, FetchOrchestrator};
use crate::keywords::KeywordConfig;
use crate::matcher::{document_relevance, match_groups};
use crate::pdf::extract_pages;
use crate::record::PaperRecord;

/// One output row: the record, its title/abstract classification, and (when
/// the scan phase ran and the PDF was present) the per-group hits plus the
/// folded confirmation flag.
#[derive(Debug, Clone)]
pub struct PaperReport {
    pub record: PaperRecord,
    pub relevant: bool,
    pub groups: Option<BTreeMap<String, bool>>,
    pub confirmed: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Acquire missing PDFs first. Disable when the corpus is already on
    /// disk.
    pub fetch: bool,
    /// Scan PDF bodies of relevant records for keyword groups.
    pub scan: bool,
    /// Worker window for the scan phase (text extraction is blocking work).
    pub scan_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { fetch: true, scan: false, scan_concurrency: 8 }
    }
}

pub struct PipelineOutcome {
    /// Reports for the records that classified as relevant.
    pub reports: Vec<PaperReport>,
    /// Failures from the fetch phase, for persisted replay.
    pub failures: FailureSet,
}

/// Run the pipeline over an already-loaded index.
pub async fn run(
    records: Vec<PaperRecord>,
    keywords: &KeywordConfig,
    fetch_config: FetchConfig,
    options: PipelineOptions,
) -> Result<PipelineOutcome, FetchError> {
    let data_dir = fetch_config.data_dir.clone();

    let failures = if options.fetch {
        let orchestrator = FetchOrchestrator::new(fetch_config)?;
        orchestrator.fetch_missing(&records).await?.failures
    } else {
        FailureSet::default()
    };

    let total = records.len();
    let tiers = keywords.compiled_tiers();
    let mut reports: Vec<PaperReport> = records
        .into_iter()
        .filter(|record| classify(&tiers, record))
        .map(|record| PaperReport { record, relevant: true, groups: None, confirmed: None })
        .collect();
    println!("[pipeline] {} of {} records classified relevant", reports.len(), total);

    if options.scan {
        let groups = Arc::new(keywords.compiled_groups());
        let case_sensitive = keywords.case_sensitive;

        let scanned: Vec<(usize, Option<BTreeMap<String, bool>>)> =
            stream::iter(reports.iter().enumerate().map(|(i, report)| {
                let path = report.record.local_path(&data_dir);
                let groups = groups.clone();
                (i, path, groups)
            }))
            .map(|(i, path, groups)| async move {
                let handle = tokio::task::spawn_blocking(move || {
                    if !path.is_file() {
                        return None;
                    }
                    extract_pages(&path)
                        .map(|pages| match_groups(pages, &groups, case_sensitive))
                        // Unparseable document: every group false.
                        .or_else(|| Some(groups.keys().map(|k| (k.clone(), false)).collect()))
                });
                match handle.await {
                    Ok(hits) => (i, hits),
                    Err(e) => {
                        eprintln!("[scan] worker panicked: {}", e);
                        (i, None)
                    }
                }
            })
            .buffer_unordered(options.scan_concurrency.max(1))
            .collect()
            .await;

        for (i, hits) in scanned {
            if let Some(hits) = hits {
                reports[i].confirmed = Some(document_relevance(&hits));
                reports[i].groups = Some(hits);
            }
        }

        log_group_summary(&reports);
    }

    Ok(PipelineOutcome { reports, failures })
}

fn log_group_summary(reports: &[PaperReport]) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut scanned = 0usize;
    for report in reports {
        if let Some(groups) = &report.groups {
            scanned += 1;
            for (name, &hit) in groups {
                if hit {
                    *counts.entry(name.as_str()).or_default() += 1;
                }
            }
        }
    }
    println!("[scan] scanned {} documents", scanned);
    for (name, count) in counts {
        println!("[scan]   {}: {}", name, count);
    }
}
