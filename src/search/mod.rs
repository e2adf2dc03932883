//! In-memory document download and per-page phrase search.

pub mod pdf;

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::fetch::{HttpError, WebSource};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("could not download document: {0}")]
    Download(#[from] HttpError),

    #[error("could not read document: {0}")]
    Decode(String),
}

/// A single page whose text could not be extracted. Scanning carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtractionWarning {
    pub page: u32,
    pub message: String,
}

/// A decoded, paginated document.
pub trait PagedDocument: Send {
    fn page_count(&self) -> u32;

    /// Plain text of `page` (1-based).
    fn page_text(&self, page: u32) -> Result<String, String>;
}

/// Turns downloaded bytes into a [`PagedDocument`].
pub trait DocumentDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn PagedDocument>, String>;
}

/// Outcome of scanning one downloaded document.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub total_pages: u32,
    pub search_text: String,
    /// 1-based, strictly ascending.
    pub found_pages: Vec<u32>,
    pub document_bytes: Bytes,
    pub filename: String,
    pub warnings: Vec<PageExtractionWarning>,
}

impl SearchResult {
    pub fn found(&self) -> bool {
        !self.found_pages.is_empty()
    }
}

/// Page-level result of [`scan_pages`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub total_pages: u32,
    pub found_pages: Vec<u32>,
    pub warnings: Vec<PageExtractionWarning>,
}

pub struct DocumentSearcher {
    source: Arc<dyn WebSource>,
    decoder: Arc<dyn DocumentDecoder>,
}

impl DocumentSearcher {
    pub fn new(source: Arc<dyn WebSource>, decoder: Arc<dyn DocumentDecoder>) -> Self {
        Self { source, decoder }
    }

    /// Download `url` into memory and look for `phrase` on every page.
    pub async fn search(&self, url: &Url, phrase: &str) -> Result<SearchResult, SearchError> {
        let document_bytes = self.source.get(url).await?;
        info!(%url, bytes = document_bytes.len(), "document downloaded");

        let decoder = Arc::clone(&self.decoder);
        let buf = document_bytes.clone();
        let needle = phrase.to_string();
        let scan = tokio::task::spawn_blocking(move || {
            let doc = decoder.decode(&buf).map_err(SearchError::Decode)?;
            Ok::<_, SearchError>(scan_pages(doc.as_ref(), &needle))
        })
        .await
        .map_err(|e| SearchError::Decode(format!("decoder task aborted: {e}")))??;

        info!(
            total_pages = scan.total_pages,
            found_pages = ?scan.found_pages,
            skipped = scan.warnings.len(),
            "document scanned"
        );

        Ok(SearchResult {
            total_pages: scan.total_pages,
            search_text: phrase.to_string(),
            found_pages: scan.found_pages,
            document_bytes,
            filename: document_filename(url),
            warnings: scan.warnings,
        })
    }
}

/// Case-insensitive substring search over every page, in page order.
pub fn scan_pages(doc: &dyn PagedDocument, phrase: &str) -> ScanOutcome {
    let needle = phrase.to_lowercase();
    let total_pages = doc.page_count();
    let mut outcome = ScanOutcome {
        total_pages,
        ..Default::default()
    };

    for page in 1..=total_pages {
        match doc.page_text(page) {
            Ok(text) => {
                if text.to_lowercase().contains(&needle) {
                    info!(page, phrase, "phrase found");
                    outcome.found_pages.push(page);
                }
            }
            Err(message) => {
                warn!(page, error = %message, "skipping page, text extraction failed");
                outcome.warnings.push(PageExtractionWarning { page, message });
            }
        }
    }

    outcome
}

/// Last path segment of `url`, with a `.pdf` extension forced on.
pub fn document_filename(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("document");

    if segment.to_ascii_lowercase().ends_with(".pdf") {
        segment.to_string()
    } else {
        format!("{segment}.pdf")
    }
}
