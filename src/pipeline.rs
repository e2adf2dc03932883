//! Locate -> Search -> Build Report -> Dispatch, as one unit of work.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn, Instrument};
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::fetch::{HttpSource, WebSource};
use crate::locator::DocumentLocator;
use crate::notify::telegram::{TelegramNotifier, TelegramOptions};
use crate::notify::{DispatchOutcome, NotificationDispatcher, Notifier, NotifyError};
use crate::report::{self, Language, Report, SearchOutcome};
use crate::scheduler::{RunRecord, ScheduledJob, Trigger};
use crate::search::pdf::PdfDecoder;
use crate::search::{DocumentDecoder, DocumentSearcher};

#[derive(Debug, Error)]
pub enum ManualSendError {
    #[error("no document could be obtained: {0}")]
    NoDocument(String),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Per-deployment inputs of a run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub page_url: Url,
    pub search_text: String,
    pub language: Language,
}

pub struct Pipeline {
    locator: DocumentLocator,
    searcher: DocumentSearcher,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
    /// Scheduled and manual runs take turns.
    run_lock: Mutex<()>,
    last_run: watch::Sender<Option<RunRecord>>,
}

impl Pipeline {
    pub fn new(
        locator: DocumentLocator,
        searcher: DocumentSearcher,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        settings: PipelineSettings,
    ) -> Self {
        let (last_run, _) = watch::channel(None);
        Self {
            locator,
            searcher,
            dispatcher,
            clock,
            settings,
            run_lock: Mutex::new(()),
            last_run,
        }
    }

    /// Wire the production collaborators from a validated config.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let source: Arc<dyn WebSource> =
            Arc::new(HttpSource::new(cfg.request_timeout(), &cfg.source.user_agent)?);
        let decoder: Arc<dyn DocumentDecoder> = Arc::new(PdfDecoder);

        if !cfg.notify.is_configured() {
            warn!("Telegram bot token or chat id missing; notifications will fail");
        }
        let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
            TelegramOptions {
                api_base: cfg.notify.api_base.clone(),
                bot_token: cfg.notify.bot_token.clone(),
                chat_id: cfg.notify.chat_id.clone(),
            },
            cfg.request_timeout(),
        )?);

        let settings = PipelineSettings {
            page_url: cfg.page_url()?,
            search_text: cfg.search.text.clone(),
            language: cfg.notify.language,
        };

        Ok(Self::new(
            DocumentLocator::new(Arc::clone(&source), cfg.base_url()?, cfg.selectors()?),
            DocumentSearcher::new(source, decoder),
            NotificationDispatcher::new(notifier, cfg.notify.send_document_when_found, cfg.notify.language),
            Arc::new(SystemClock::new(cfg.timezone()?)),
            settings,
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Most recent finished run, if any.
    pub fn last_run(&self) -> Option<RunRecord> {
        self.last_run.borrow().clone()
    }

    /// Locate and search, then build the report. Sends nothing.
    pub async fn build_report(&self) -> Report {
        let timestamp = self.clock.now();
        let page_url = &self.settings.page_url;

        let (title, outcome) = match self.locator.locate(page_url).await {
            Err(e) => {
                warn!(%page_url, error = %e, "could not locate document");
                (page_url.to_string(), SearchOutcome::Failed(e.to_string()))
            }
            Ok(page) => match page.document_link {
                None => (page.page_title, SearchOutcome::NoDocumentLink),
                Some(link) => match self.searcher.search(&link, &self.settings.search_text).await {
                    Ok(result) => (page.page_title, SearchOutcome::Scanned(result)),
                    Err(e) => {
                        warn!(%link, error = %e, "document search failed");
                        (page.page_title, SearchOutcome::Failed(e.to_string()))
                    }
                },
            },
        };

        report::build(&title, timestamp, outcome, self.settings.language)
    }

    /// Full run: build the report and dispatch it. Never fails; problems end
    /// up in the report status and the dispatch outcome.
    pub async fn execute(&self, trigger: Trigger) -> (Report, DispatchOutcome) {
        let _turn = self.run_lock.lock().await;
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("pipeline", %run_id, %trigger);

        async move {
            let started_at = Utc::now();
            info!("pipeline run started");

            let report = self.build_report().await;
            info!(status = %report.status(), summary = %report.summary_text(), "report built");

            let delivery = self.dispatcher.dispatch(&report).await;

            self.last_run.send_replace(Some(RunRecord {
                run_id,
                trigger,
                status: report.status(),
                summary: report.summary_text().to_string(),
                summary_sent: delivery.summary_sent,
                document_sent: delivery.document_sent(),
                started_at,
                finished_at: Utc::now(),
            }));
            info!(summary_sent = delivery.summary_sent, document = ?delivery.document, "pipeline run finished");

            (report, delivery)
        }
        .instrument(span)
        .await
    }

    pub async fn run_pipeline(&self, trigger: Trigger) -> Report {
        self.execute(trigger).await.0
    }

    /// Fetch today's document and send it whatever the search found.
    pub async fn send_document_now(&self) -> Result<Report, ManualSendError> {
        let _turn = self.run_lock.lock().await;
        let report = self.build_report().await;

        let Some(result) = report.search_result() else {
            return Err(ManualSendError::NoDocument(report.summary_text().to_string()));
        };
        self.dispatcher.send_document_manually(result).await?;
        info!(filename = %result.filename, found = result.found(), "document sent on request");
        Ok(report)
    }
}

#[async_trait::async_trait]
impl ScheduledJob for Pipeline {
    async fn run_scheduled(&self, trigger: Trigger) {
        self.run_pipeline(trigger).await;
    }
}
