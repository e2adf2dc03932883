//! Report assembly: one immutable record per pipeline run.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::clock::timezone_label;
use crate::search::SearchResult;

/// Machine-readable outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Found,
    NotFound,
    DocumentError,
    NoDocumentLink,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Found => write!(f, "found"),
            ReportStatus::NotFound => write!(f, "not_found"),
            ReportStatus::DocumentError => write!(f, "document_error"),
            ReportStatus::NoDocumentLink => write!(f, "no_document_link"),
        }
    }
}

/// Language of the human-readable texts sent to the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

/// What the locate/search steps produced.
#[derive(Debug)]
pub enum SearchOutcome {
    NoDocumentLink,
    /// Locating, downloading or decoding failed; carries the error text.
    Failed(String),
    Scanned(SearchResult),
}

#[derive(Debug)]
pub struct Report {
    page_title: String,
    execution_timestamp: DateTime<Tz>,
    status: ReportStatus,
    summary_text: String,
    search_result: Option<SearchResult>,
}

impl Report {
    pub fn page_title(&self) -> &str {
        &self.page_title
    }

    pub fn execution_timestamp(&self) -> &DateTime<Tz> {
        &self.execution_timestamp
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn summary_text(&self) -> &str {
        &self.summary_text
    }

    pub fn search_result(&self) -> Option<&SearchResult> {
        self.search_result.as_ref()
    }
}

/// Build the report for one run. Pure; the same inputs give the same text.
pub fn build(
    page_title: &str,
    timestamp: DateTime<Tz>,
    outcome: SearchOutcome,
    language: Language,
) -> Report {
    let header = header(page_title, &timestamp, language);

    let (status, summary_text, search_result) = match outcome {
        SearchOutcome::NoDocumentLink => {
            let text = match language {
                Language::Es => format!("⚠️ {header} - No PDF encontrado"),
                Language::En => format!("⚠️ {header} - No document found"),
            };
            (ReportStatus::NoDocumentLink, text, None)
        }
        SearchOutcome::Failed(detail) => {
            let text = match language {
                Language::Es => format!("‼️ {header} - Error procesando PDF: {detail}"),
                Language::En => format!("‼️ {header} - Error processing document: {detail}"),
            };
            (ReportStatus::DocumentError, text, None)
        }
        SearchOutcome::Scanned(result) if result.found() => {
            let pages = format_pages(&result.found_pages);
            let text = match language {
                Language::Es => format!(
                    "✅ {header} - PDF procesado: {} - Total páginas: {} - '{}' encontrado en páginas: {pages} - Texto '{}' encontrado en {} página(s): {pages}",
                    result.filename,
                    result.total_pages,
                    result.search_text,
                    result.search_text,
                    result.found_pages.len(),
                ),
                Language::En => format!(
                    "✅ {header} - Document processed: {} - Total pages: {} - '{}' found on pages: {pages} - Text '{}' found on {} page(s): {pages}",
                    result.filename,
                    result.total_pages,
                    result.search_text,
                    result.search_text,
                    result.found_pages.len(),
                ),
            };
            (ReportStatus::Found, text, Some(result))
        }
        SearchOutcome::Scanned(result) => {
            let text = match language {
                Language::Es => format!(
                    "❌ {header} - PDF procesado: {} - Total páginas: {} - '{}' NO encontrado - Texto '{}' NO encontrado en el PDF",
                    result.filename, result.total_pages, result.search_text, result.search_text,
                ),
                Language::En => format!(
                    "❌ {header} - Document processed: {} - Total pages: {} - '{}' NOT found - Text '{}' NOT found in the document",
                    result.filename, result.total_pages, result.search_text, result.search_text,
                ),
            };
            (ReportStatus::NotFound, text, Some(result))
        }
    };

    Report {
        page_title: page_title.to_string(),
        execution_timestamp: timestamp,
        status,
        summary_text,
        search_result,
    }
}

fn header(page_title: &str, timestamp: &DateTime<Tz>, language: Language) -> String {
    let tz = timezone_label(timestamp.timezone());
    let when = timestamp.format("%d/%m/%Y %H:%M:%S %Z");
    match language {
        Language::Es => format!("{page_title} - Hora de ejecución ({tz}): {when}"),
        Language::En => format!("{page_title} - Run time ({tz}): {when}"),
    }
}

/// `[1, 3, 4]`
pub fn format_pages(pages: &[u32]) -> String {
    format!("{pages:?}")
}
