//! TOML configuration with environment overrides.
//!
//! Resolution order: compiled-in defaults, then a TOML file (explicit path,
//! `GAZETTEWATCH_CONFIG`, or `/etc/gazettewatch/gazettewatch.toml`), then the
//! deployment environment variables (`BASE_URL`, `SEARCH_TEXT`,
//! `SCHEDULE_HOUR_1`, ...). A `.env` file is loaded into the environment by
//! the binary before any of this runs.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::locator::{PageSelectors, SelectorError, DEFAULT_LINK_SELECTOR, DEFAULT_TITLE_SELECTOR};
use crate::notify::telegram::DEFAULT_API_BASE;
use crate::report::Language;
use crate::scheduler::{ScheduleError, TriggerSlot};

pub const CONFIG_ENV_VAR: &str = "GAZETTEWATCH_CONFIG";
const SYSTEM_CONFIG_PATH: &str = "/etc/gazettewatch/gazettewatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone {0:?}")]
    InvalidTimezone(String),

    #[error("{field} is not a valid http(s) URL: {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("environment variable {var} has invalid value {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("search text must not be empty")]
    EmptySearchText,

    #[error("poll interval must be at least one second")]
    ZeroPollInterval,

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// An explicit path must load. Otherwise try `GAZETTEWATCH_CONFIG`, then
    /// the system location, then defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "{CONFIG_ENV_VAR} set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply the deployment environment variables through `lookup`.
    ///
    /// Trigger slots come from `SCHEDULE_HOUR_<n>` / `SCHEDULE_MINUTE_<n>`
    /// for n = 1, 2, ...; a pair may override an existing slot or append the
    /// next one.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BASE_URL") {
            self.source.base_url = v;
        }
        if let Some(v) = lookup("DIARIO_URL_PATH") {
            self.source.page_path = v;
        }
        if let Some(v) = lookup("SEARCH_TEXT") {
            self.search.text = v;
        }
        if let Some(v) = lookup("TIMEZONE") {
            self.schedule.timezone = v;
        }
        if let Some(v) = lookup("SEND_PDF_WHEN_FOUND") {
            self.notify.send_document_when_found = parse_bool("SEND_PDF_WHEN_FOUND", &v)?;
        }
        if let Some(v) = lookup("TELEGRAM_BOT_TOKEN") {
            self.notify.bot_token = v;
        }
        if let Some(v) = lookup("TELEGRAM_CHAT_ID") {
            self.notify.chat_id = v;
        }
        if let Some(v) = lookup("PORT") {
            let port: u16 = parse_num("PORT", &v)?;
            self.server.bind = format!("0.0.0.0:{port}");
        }

        for n in 1.. {
            let hour_var = format!("SCHEDULE_HOUR_{n}");
            let minute_var = format!("SCHEDULE_MINUTE_{n}");
            let hour = lookup(&hour_var);
            let minute = lookup(&minute_var);

            if hour.is_none() && minute.is_none() {
                if n > self.schedule.slots.len() {
                    break;
                }
                continue;
            }

            let mut slot = self
                .schedule
                .slots
                .get(n - 1)
                .cloned()
                .unwrap_or(SlotConfig { hour: 0, minute: 0 });
            if let Some(h) = hour {
                slot.hour = parse_num(&hour_var, &h)?;
            }
            if let Some(m) = minute {
                slot.minute = parse_num(&minute_var, &m)?;
            }

            if n <= self.schedule.slots.len() {
                self.schedule.slots[n - 1] = slot;
            } else {
                self.schedule.slots.push(slot);
            }
        }

        Ok(())
    }

    /// Check everything the service needs before starting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        self.base_url()?;
        self.page_url()?;
        self.selectors()?;
        self.trigger_slots()?;
        if self.search.text.trim().is_empty() {
            return Err(ConfigError::EmptySearchText);
        }
        if self.schedule.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if !self.notify.api_base.starts_with("http://") && !self.notify.api_base.starts_with("https://") {
            return Err(ConfigError::InvalidUrl {
                field: "notify.api_base",
                value: self.notify.api_base.clone(),
            });
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.schedule
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.schedule.timezone.clone()))
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("source.base_url", &self.source.base_url)
    }

    /// `base_url` + `page_path`, joined as plain strings.
    pub fn page_url(&self) -> Result<Url, ConfigError> {
        let base = self.source.base_url.trim_end_matches('/');
        let path = self.source.page_path.trim();
        let joined = if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        parse_http_url("source.page_path", &joined)
    }

    pub fn selectors(&self) -> Result<PageSelectors, ConfigError> {
        Ok(PageSelectors::parse(
            &self.source.title_selector,
            &self.source.link_selector,
        )?)
    }

    pub fn trigger_slots(&self) -> Result<Vec<TriggerSlot>, ConfigError> {
        if self.schedule.slots.is_empty() {
            return Err(ScheduleError::NoSlots.into());
        }
        let mut slots: Vec<TriggerSlot> = Vec::with_capacity(self.schedule.slots.len());
        for s in &self.schedule.slots {
            let slot = TriggerSlot::new(s.hour, s.minute)?;
            if slots.iter().any(|o| o.label() == slot.label()) {
                return Err(ScheduleError::DuplicateSlot(slot.label()).into());
            }
            slots.push(slot);
        }
        Ok(slots)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.request_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.poll_interval_secs.max(1))
    }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where the gazette page lives and how to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Site root; relative document links are resolved against it.
    pub base_url: String,
    /// Path of the page listing today's publication.
    pub page_path: String,
    /// CSS selector of the publication date/title label.
    pub title_selector: String,
    /// CSS selector of the anchor pointing at the document.
    pub link_selector: String,
    /// Per-request timeout for page and document downloads (seconds).
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.yucatan.gob.mx".to_string(),
            page_path: "/gobierno/diario_oficial.php".to_string(),
            title_selector: DEFAULT_TITLE_SELECTOR.to_string(),
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            request_timeout_secs: 60,
            user_agent: concat!("gazettewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Phrase looked for on every page, case-insensitively.
    pub text: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            text: "koyoc novelo".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA timezone the trigger times are expressed in.
    pub timezone: String,
    pub slots: Vec<SlotConfig>,
    /// Upper bound on the scheduler's sleep between ticks (seconds).
    pub poll_interval_secs: u64,
    /// Run one report as soon as the service starts.
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Merida".to_string(),
            slots: vec![
                SlotConfig { hour: 7, minute: 30 },
                SlotConfig { hour: 12, minute: 0 },
            ],
            poll_interval_secs: 60,
            run_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub hour: u32,
    pub minute: u32,
}

// ---------------------------------------------------------------------------
// Notify
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    /// Attach the document when the phrase is found.
    pub send_document_when_found: bool,
    pub language: Language,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            send_document_when_found: true,
            language: Language::Es,
        }
    }
}

impl NotifyConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    /// Token safe to print: first ten characters only.
    pub fn masked_token(&self) -> String {
        if self.bot_token.is_empty() {
            return "(not set)".to_string();
        }
        match self.bot_token.char_indices().nth(10) {
            Some((idx, _)) => format!("{}...", &self.bot_token[..idx]),
            None => "***".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
