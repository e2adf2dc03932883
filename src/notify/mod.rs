//! Outbound notifications: summary text and optional document attachment.

pub mod telegram;

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::report::{format_pages, Language, Report, ReportStatus};
use crate::search::SearchResult;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("messaging transport not configured: {0}")]
    NotConfigured(String),

    #[error("messaging request failed: {0}")]
    Transport(String),

    #[error("messaging API rejected the request (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// The messaging channel. Each call is an independent round-trip.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError>;

    async fn send_document(
        &self,
        bytes: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<(), NotifyError>;
}

/// What happened to the attachment during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DocumentDelivery {
    NotAttempted,
    Sent,
    Failed { error: String, fallback_sent: bool },
}

/// Delivery record for one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub summary_sent: bool,
    pub document: DocumentDelivery,
}

impl DispatchOutcome {
    pub fn document_sent(&self) -> bool {
        self.document == DocumentDelivery::Sent
    }
}

pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    send_document_when_found: bool,
    language: Language,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, send_document_when_found: bool, language: Language) -> Self {
        Self {
            notifier,
            send_document_when_found,
            language,
        }
    }

    pub async fn send_summary(&self, text: &str) -> Result<(), NotifyError> {
        self.notifier.send_text(text).await
    }

    pub async fn send_document(
        &self,
        bytes: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<(), NotifyError> {
        self.notifier.send_document(bytes, filename, caption).await
    }

    /// Send the summary, then the document when the policy asks for it.
    /// Failures are logged and reported in the outcome, never returned.
    pub async fn dispatch(&self, report: &Report) -> DispatchOutcome {
        let summary_sent = match self.send_summary(report.summary_text()).await {
            Ok(()) => {
                info!(status = %report.status(), "summary sent");
                true
            }
            Err(e) => {
                error!(status = %report.status(), error = %e, "failed to send summary");
                false
            }
        };

        let attachment = match report.search_result() {
            Some(result) if report.status() == ReportStatus::Found => Some(result),
            _ => None,
        };

        let document = match attachment {
            Some(result) if self.send_document_when_found => self.deliver_found_document(result).await,
            Some(result) => {
                info!(filename = %result.filename, "phrase found but document sending is disabled");
                DocumentDelivery::NotAttempted
            }
            None => DocumentDelivery::NotAttempted,
        };

        DispatchOutcome {
            summary_sent,
            document,
        }
    }

    async fn deliver_found_document(&self, result: &SearchResult) -> DocumentDelivery {
        let caption = found_caption(result, self.language);
        match self
            .send_document(result.document_bytes.clone(), &result.filename, &caption)
            .await
        {
            Ok(()) => {
                info!(filename = %result.filename, "document sent");
                DocumentDelivery::Sent
            }
            Err(e) => {
                error!(filename = %result.filename, error = %e, "failed to send document");
                let alert = match self.language {
                    Language::Es => format!("⚠️ Error enviando PDF: {e}"),
                    Language::En => format!("⚠️ Error sending document: {e}"),
                };
                let fallback_sent = match self.send_summary(&alert).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "fallback alert could not be sent either");
                        false
                    }
                };
                DocumentDelivery::Failed {
                    error: e.to_string(),
                    fallback_sent,
                }
            }
        }
    }

    /// Send the document regardless of the match result (manual request).
    pub async fn send_document_manually(&self, result: &SearchResult) -> Result<(), NotifyError> {
        let caption = if result.found() {
            found_caption(result, self.language)
        } else {
            match self.language {
                Language::Es => format!(
                    "📄 PDF del Diario Oficial - Envío manual (Texto '{}' no encontrado)",
                    result.search_text
                ),
                Language::En => format!(
                    "📄 Official Gazette document - Manual send (Text '{}' not found)",
                    result.search_text
                ),
            }
        };
        self.send_document(result.document_bytes.clone(), &result.filename, &caption)
            .await
    }
}

fn found_caption(result: &SearchResult, language: Language) -> String {
    let pages = format_pages(&result.found_pages);
    match language {
        Language::Es => format!(
            "📄 PDF del Diario Oficial - Texto '{}' encontrado en páginas: {pages}",
            result.search_text
        ),
        Language::En => format!(
            "📄 Official Gazette document - Text '{}' found on pages: {pages}",
            result.search_text
        ),
    }
}
