//! Shared fakes for the integration tests: a canned web source, a
//! form-feed "PDF" decoder, a recording notifier and a fixed clock.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use url::Url;

use gazettewatch::clock::Clock;
use gazettewatch::fetch::{HttpError, WebSource};
use gazettewatch::locator::{DocumentLocator, PageSelectors};
use gazettewatch::notify::{NotificationDispatcher, Notifier, NotifyError};
use gazettewatch::pipeline::{Pipeline, PipelineSettings};
use gazettewatch::report::Language;
use gazettewatch::search::{DocumentDecoder, DocumentSearcher, PagedDocument};

pub const BASE_URL: &str = "https://gazette.test/";
pub const PAGE_URL: &str = "https://gazette.test/diario/";
pub const DOCUMENT_URL: &str = "https://gazette.test/docs/2026-10-19.pdf";
pub const PHRASE: &str = "koyoc novelo";

pub fn gazette_page(with_link: bool) -> String {
    let link = if with_link {
        r#"<a class="pdf" href="/docs/2026-10-19.pdf">Descargar</a>"#
    } else {
        ""
    };
    format!(
        r#"<html><body>
            <div class="titulo verde mt-2">
                Diario Oficial   19 de octubre de 2026
            </div>
            {link}
        </body></html>"#
    )
}

/// `%FAKE` header, then pages separated by form feed.
pub fn fake_document(pages: &[&str]) -> Bytes {
    Bytes::from(format!("%FAKE{}", pages.join("\x0c")))
}

#[derive(Default)]
pub struct StaticSource {
    responses: HashMap<String, Result<Bytes, HttpError>>,
}

impl StaticSource {
    pub fn with(mut self, url: &str, body: Result<Bytes, HttpError>) -> Self {
        self.responses.insert(url.to_string(), body);
        self
    }
}

#[async_trait::async_trait]
impl WebSource for StaticSource {
    async fn get(&self, url: &Url) -> Result<Bytes, HttpError> {
        self.responses
            .get(url.as_str())
            .cloned()
            .unwrap_or(Err(HttpError::Status {
                url: url.to_string(),
                status: 404,
            }))
    }
}

pub struct FormFeedDecoder;

struct Pages(Vec<String>);

impl PagedDocument for Pages {
    fn page_count(&self) -> u32 {
        self.0.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String, String> {
        Ok(self.0[(page - 1) as usize].clone())
    }
}

impl DocumentDecoder for FormFeedDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn PagedDocument>, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
        let body = text
            .strip_prefix("%FAKE")
            .ok_or_else(|| "not a PDF".to_string())?;
        let pages = body
            .split('\x0c')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Box::new(Pages(pages)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text(String),
    Document { filename: String, caption: String },
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    fail_document: bool,
}

impl RecordingNotifier {
    /// Texts go through; every document is rejected as too large.
    pub fn failing_documents() -> Self {
        Self {
            fail_document: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_document(
        &self,
        _bytes: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<(), NotifyError> {
        if self.fail_document {
            return Err(NotifyError::Rejected {
                status: 413,
                description: "Request Entity Too Large".into(),
            });
        }
        self.sent.lock().unwrap().push(Sent::Document {
            filename: filename.to_string(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Tz>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.0
    }

    fn timezone(&self) -> Tz {
        self.0.timezone()
    }
}

pub fn merida_morning() -> FixedClock {
    FixedClock(
        chrono_tz::America::Merida
            .with_ymd_and_hms(2026, 10, 19, 7, 30, 0)
            .unwrap(),
    )
}

pub fn pipeline<N: Notifier + 'static>(
    source: StaticSource,
    notifier: Arc<N>,
    send_document_when_found: bool,
) -> Pipeline {
    let source: Arc<dyn WebSource> = Arc::new(source);
    let base = Url::parse(BASE_URL).unwrap();
    Pipeline::new(
        DocumentLocator::new(Arc::clone(&source), base, PageSelectors::default()),
        DocumentSearcher::new(source, Arc::new(FormFeedDecoder)),
        NotificationDispatcher::new(notifier, send_document_when_found, Language::Es),
        Arc::new(merida_morning()),
        PipelineSettings {
            page_url: Url::parse(PAGE_URL).unwrap(),
            search_text: PHRASE.to_string(),
            language: Language::Es,
        },
    )
}

/// Gazette page with a link and a five-page document mentioning the
/// phrase on page 4.
pub fn published_source() -> StaticSource {
    StaticSource::default()
        .with(PAGE_URL, Ok(Bytes::from(gazette_page(true))))
        .with(
            DOCUMENT_URL,
            Ok(fake_document(&[
                "Poder Ejecutivo",
                "Acuerdos",
                "Avisos",
                "Edicto: KOYOC NOVELO, Juan",
                "Fe de erratas",
            ])),
        )
}
