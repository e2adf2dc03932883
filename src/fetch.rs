//! HTTP GET access to the gazette site (page and document downloads).

use bytes::Bytes;
use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Anything that can GET a URL and hand back the full body.
#[async_trait::async_trait]
pub trait WebSource: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Bytes, HttpError>;

    /// The body as text. Sources that know the declared charset should
    /// override this; the default assumes UTF-8.
    async fn get_text(&self, url: &Url) -> Result<String, HttpError> {
        let body = self.get(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// `reqwest`-backed source used in production.
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &Url) -> Result<Response, HttpError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn transport(url: &Url, e: reqwest::Error) -> HttpError {
    HttpError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    }
}

#[async_trait::async_trait]
impl WebSource for HttpSource {
    async fn get(&self, url: &Url) -> Result<Bytes, HttpError> {
        let body = self
            .fetch(url)
            .await?
            .bytes()
            .await
            .map_err(|e| transport(url, e))?;
        tracing::debug!(%url, bytes = body.len(), "fetched");
        Ok(body)
    }

    /// Decodes with the `Content-Type` charset, UTF-8 when none is given.
    async fn get_text(&self, url: &Url) -> Result<String, HttpError> {
        let text = self
            .fetch(url)
            .await?
            .text()
            .await
            .map_err(|e| transport(url, e))?;
        tracing::debug!(%url, chars = text.len(), "fetched page");
        Ok(text)
    }
}
