//! confsieve - conference-paper corpus curation
//!
//! Resolves bibliographic records to local PDF files, fetches the missing
//! ones concurrently with per-item failure isolation, classifies each paper
//! by tiered title/abstract keywords, and optionally confirms relevance by
//! scanning the PDF body for keyword groups.

pub mod classifier;
pub mod fetch;
pub mod index;
pub mod keywords;
pub mod matcher;
pub mod pdf;
pub mod pipeline;
pub mod record;
pub mod utils;

pub use fetch::{FailureSet, FetchConfig, FetchError, FetchOrchestrator, FetchReport};
pub use keywords::{CompiledTiers, KeywordConfig};
pub use pipeline::{PaperReport, PipelineOptions, PipelineOutcome};
pub use record::PaperRecord;
