//! Paper records and their derived on-disk locations
//!
//! A record is constructed once by the index loader and read-only afterwards.
//! The local PDF path is a pure function of (conference, year, title) and is
//! recomputed on every check rather than cached.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::sanitize_filename;

/// One paper's bibliographic entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    /// Short conference code, e.g. "CVPR", "AAAI"
    pub conference: String,
    pub authors: String,
    pub year: u16,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Retrieval URL supplied by the source index, if any
    pub source_url: Option<String>,
    /// Code-repository link, if any
    pub repository_url: Option<String>,
}

impl PaperRecord {
    /// Destination path for this paper's PDF under `data_dir`:
    /// `<data_dir>/<conference><year>/<sanitized title>.pdf`
    ///
    /// Deterministic in (conference, year, title). Two records sharing that
    /// triple collide and overwrite each other's file; the pipeline does not
    /// deduplicate, so the last fetch wins.
    pub fn local_path(&self, data_dir: &std::path::Path) -> PathBuf {
        data_dir
            .join(format!("{}{}", self.conference, self.year))
            .join(format!("{}.pdf", sanitize_filename(&self.title)))
    }

    /// Identity string used by the failure set.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.conference, self.year, self.title)
    }

    /// Title plus abstract (when present), lowercased, for tier matching.
    pub fn search_text(&self) -> String {
        let mut text = self.title.to_lowercase();
        if let Some(abs) = &self.abstract_text {
            text.push(' ');
            text.push_str(&abs.to_lowercase());
        }
        text
    }
}
