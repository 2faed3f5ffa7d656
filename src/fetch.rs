//! Concurrent PDF acquisition
//!
//! Determines which records have no file on disk yet and fetches them over
//! a bounded worker pool. Each task either materializes the destination
//! file or contributes its record to the failure set; one task's failure
//! never aborts the others. Failed records are persisted for manual replay,
//! never retried within a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::{stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::PaperRecord;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("record has no source url")]
    NoUrl,
    #[error("server returned status {0}")]
    Status(u16),
    #[error("response is not a PDF")]
    NotAPdf,
    #[error("PDF too large: {0} bytes")]
    TooLarge(usize),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

/// One failed acquisition, kept alongside the record so a later run can
/// replay it without the original index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFailure {
    pub record: PaperRecord,
    pub error: String,
}

/// Records whose fetch failed in the most recent run, keyed by record
/// identity. Order-independent: completion order under the worker pool is
/// nondeterministic.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureSet {
    entries: BTreeMap<String, FetchFailure>,
}

impl FailureSet {
    pub fn insert(&mut self, record: PaperRecord, error: &FetchError) {
        let key = record.key();
        self.entries.insert(key, FetchFailure { record, error: error.to_string() });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, record: &PaperRecord) -> bool {
        self.entries.contains_key(&record.key())
    }

    pub fn records(&self) -> impl Iterator<Item = &PaperRecord> {
        self.entries.values().map(|f| &f.record)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FetchFailure> {
        self.entries.values()
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Corpus root; destination paths derive from it per record.
    pub data_dir: PathBuf,
    /// Worker-pool width. Fetching is I/O-bound, so this intentionally
    /// oversubscribes the core count.
    pub concurrency: usize,
    /// Per-request timeout. Without one a stalled fetch would hold a pool
    /// slot indefinitely.
    pub timeout_secs: u64,
    /// Oversize responses are rejected rather than stored.
    pub max_pdf_mb: u32,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            concurrency: 32,
            timeout_secs: 30,
            max_pdf_mb: 20,
            user_agent: format!("confsieve/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Outcome of one orchestration run.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Records whose file was missing and a fetch was attempted.
    pub attempted: usize,
    /// Files now present that were not before.
    pub fetched: usize,
    /// Records skipped because their file already existed.
    pub skipped: usize,
    pub failures: FailureSet,
}

pub struct FetchOrchestrator {
    client: Client,
    config: FetchConfig,
}

impl FetchOrchestrator {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetch every record whose local file does not exist yet.
    ///
    /// Parent directories for all candidates are created up front, before
    /// any fetch starts. Already-present files are skipped, so re-running
    /// against a complete corpus performs zero network calls.
    pub async fn fetch_missing(&self, records: &[PaperRecord]) -> Result<FetchReport, FetchError> {
        let mut report = FetchReport::default();

        for record in records {
            let dest = record.local_path(&self.config.data_dir);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut missing: Vec<(PaperRecord, PathBuf)> = Vec::new();
        for record in records {
            let dest = record.local_path(&self.config.data_dir);
            if dest.exists() {
                report.skipped += 1;
            } else {
                missing.push((record.clone(), dest));
            }
        }

        report.attempted = missing.len();
        println!("[fetch] {} missing of {} records", missing.len(), records.len());

        let outcomes: Vec<(PaperRecord, Result<(), FetchError>)> = stream::iter(missing)
            .map(|(record, dest)| async move {
                let result = self.fetch_one(&record, &dest).await;
                (record, result)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for (record, result) in outcomes {
            match result {
                Ok(()) => report.fetched += 1,
                Err(e) => {
                    eprintln!("[fetch] failed {}: {}", record.key(), e);
                    report.failures.insert(record, &e);
                }
            }
        }

        if !report.failures.is_empty() {
            println!("[fetch] {} of {} fetches failed", report.failures.len(), report.attempted);
        }
        Ok(report)
    }

    /// One record, one request, one file. The body streams into a `.part`
    /// sibling that is renamed over the destination only on success, so a
    /// failed task leaves nothing behind.
    async fn fetch_one(&self, record: &PaperRecord, dest: &Path) -> Result<(), FetchError> {
        let url = record.source_url.as_deref().ok_or(FetchError::NoUrl)?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let part = dest.with_extension("part");
        if let Err(e) = self.write_part(response, &part).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&part, dest).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(FetchError::Io(e));
        }
        Ok(())
    }

    /// Stream the response body to `part`, rejecting non-PDF magic bytes
    /// and aborting as soon as the running total exceeds the size cap, so
    /// an oversize body is never downloaded in full.
    async fn write_part(&self, response: reqwest::Response, part: &Path) -> Result<(), FetchError> {
        use tokio::io::AsyncWriteExt;

        let cap = self.config.max_pdf_mb as usize * 1024 * 1024;
        let mut file = tokio::fs::File::create(part).await?;
        let mut body = response.bytes_stream();
        let mut head: Vec<u8> = Vec::with_capacity(4);
        let mut total = 0usize;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if head.len() < 4 {
                let take = chunk.len().min(4 - head.len());
                head.extend_from_slice(&chunk[..take]);
                if head.len() == 4 && &head[..] != b"%PDF" {
                    return Err(FetchError::NotAPdf);
                }
            }
            total += chunk.len();
            if total > cap {
                return Err(FetchError::TooLarge(total));
            }
            file.write_all(&chunk).await?;
        }

        if head.len() < 4 {
            return Err(FetchError::NotAPdf);
        }
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(title: &str, url: Option<String>) -> PaperRecord {
        PaperRecord {
            title: title.to_string(),
            conference: "CVPR".to_string(),
            authors: "A. Author".to_string(),
            year: 2023,
            abstract_text: None,
            source_url: url,
            repository_url: None,
        }
    }

    /// Local server: 500 for any path containing "fail", otherwise a tiny
    /// valid PDF body. Returns the base URL and a request counter.
    fn spawn_server() -> (String, Arc<AtomicUsize>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_srv = hits.clone();
        std::thread::spawn(move || {
            for req in server.incoming_requests() {
                hits_srv.fetch_add(1, Ordering::SeqCst);
                if req.url().contains("fail") {
                    let _ = req.respond(tiny_http::Response::empty(500));
                } else if req.url().contains("garbage") {
                    let _ = req.respond(tiny_http::Response::from_data(b"<html>no</html>".to_vec()));
                } else if req.url().contains("big") {
                    let mut body = b"%PDF-1.4 ".to_vec();
                    body.resize(2 * 1024 * 1024, b'x');
                    let _ = req.respond(tiny_http::Response::from_data(body));
                } else {
                    let _ = req.respond(tiny_http::Response::from_data(b"%PDF-1.4 test body".to_vec()));
                }
            }
        });
        (format!("http://{}", addr), hits)
    }

    fn orchestrator(data_dir: &Path) -> FetchOrchestrator {
        FetchOrchestrator::new(FetchConfig {
            data_dir: data_dir.to_path_buf(),
            concurrency: 4,
            timeout_secs: 5,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_record() {
        let (base, _hits) = spawn_server();
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record("paper one", Some(format!("{}/ok1.pdf", base))),
            record("paper two", Some(format!("{}/fail.pdf", base))),
            record("paper three", Some(format!("{}/ok2.pdf", base))),
        ];

        let report = orchestrator(dir.path()).fetch_missing(&records).await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.fetched, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures.contains(&records[1]));
        assert!(records[0].local_path(dir.path()).is_file());
        assert!(records[2].local_path(dir.path()).is_file());
        // No partial or final file for the failed record.
        let failed_dest = records[1].local_path(dir.path());
        assert!(!failed_dest.exists());
        assert!(!failed_dest.with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_rerun_with_all_files_present_hits_network_zero_times() {
        let (base, hits) = spawn_server();
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record("alpha", Some(format!("{}/a.pdf", base))),
            record("beta", Some(format!("{}/b.pdf", base))),
        ];

        let first = orchestrator(dir.path()).fetch_missing(&records).await.unwrap();
        assert_eq!(first.fetched, 2);
        let after_first = hits.load(Ordering::SeqCst);
        assert_eq!(after_first, 2);

        let second = orchestrator(dir.path()).fetch_missing(&records).await.unwrap();
        assert_eq!(second.attempted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(hits.load(Ordering::SeqCst), after_first);
    }

    #[tokio::test]
    async fn test_missing_url_fails_without_network() {
        let (base, hits) = spawn_server();
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record("no url", None),
            record("with url", Some(format!("{}/ok.pdf", base))),
        ];

        let report = orchestrator(dir.path()).fetch_missing(&records).await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures.contains(&records[0]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_pdf_body_leaves_no_file() {
        let (base, _hits) = spawn_server();
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record("html page", Some(format!("{}/garbage", base)))];

        let report = orchestrator(dir.path()).fetch_missing(&records).await.unwrap();
        assert_eq!(report.fetched, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(!records[0].local_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_oversize_body_is_rejected_and_leaves_no_file() {
        let (base, _hits) = spawn_server();
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record("huge scan", Some(format!("{}/big.pdf", base)))];

        // 1 MiB cap against a 2 MiB body.
        let orchestrator = FetchOrchestrator::new(FetchConfig {
            data_dir: dir.path().to_path_buf(),
            concurrency: 2,
            timeout_secs: 5,
            max_pdf_mb: 1,
            ..FetchConfig::default()
        })
        .unwrap();

        let report = orchestrator.fetch_missing(&records).await.unwrap();
        assert_eq!(report.fetched, 0);
        assert_eq!(report.failures.len(), 1);
        let failure = report.failures.iter().next().unwrap();
        assert!(failure.error.contains("too large"));
        let dest = records[0].local_path(dir.path());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_parent_dirs_exist_before_fetching() {
        let (base, _hits) = spawn_server();
        let dir = tempfile::tempdir().unwrap();
        // A record that fails still gets its conference directory created
        // up front.
        let records = vec![record("will fail", Some(format!("{}/fail", base)))];

        let report = orchestrator(dir.path()).fetch_missing(&records).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(dir.path().join("CVPR2023").is_dir());
    }

    #[test]
    fn test_failure_set_round_trips_through_json() {
        let mut set = FailureSet::default();
        set.insert(record("lost paper", Some("http://example.invalid/x".into())), &FetchError::Status(404));

        let json = serde_json::to_string(&set).unwrap();
        let back: FailureSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        let failure = back.iter().next().unwrap();
        assert_eq!(failure.record.title, "lost paper");
        assert!(failure.error.contains("404"));
    }
}
