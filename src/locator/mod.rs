//! Gazette page scraping: publication label and today's document link.

use std::sync::Arc;

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::fetch::{HttpError, WebSource};

pub const DEFAULT_TITLE_SELECTOR: &str = "div.titulo.verde.mt-2";
pub const DEFAULT_LINK_SELECTOR: &str = "a.pdf";

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("could not fetch gazette page: {0}")]
    Fetch(#[from] HttpError),

    #[error("unexpected gazette page structure: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
#[error("invalid CSS selector {selector:?}: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

/// What the gazette page says about today's publication.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedPage {
    /// Date/title label shown on the page, whitespace-collapsed.
    pub page_title: String,
    /// Absolute URL of the document, if one is published.
    pub document_link: Option<Url>,
}

/// CSS selectors for the two page regions the locator depends on.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    title: Selector,
    link: Selector,
}

impl PageSelectors {
    pub fn parse(title: &str, link: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            title: compile(title)?,
            link: compile(link)?,
        })
    }
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self::parse(DEFAULT_TITLE_SELECTOR, DEFAULT_LINK_SELECTOR)
            .expect("built-in selectors are valid")
    }
}

fn compile(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

pub struct DocumentLocator {
    source: Arc<dyn WebSource>,
    base_url: Url,
    selectors: PageSelectors,
}

impl DocumentLocator {
    pub fn new(source: Arc<dyn WebSource>, base_url: Url, selectors: PageSelectors) -> Self {
        Self {
            source,
            base_url,
            selectors,
        }
    }

    /// Fetch `page_url` and extract the title label and document link.
    pub async fn locate(&self, page_url: &Url) -> Result<LocatedPage, LocateError> {
        let html = self.source.get_text(page_url).await?;
        let page = parse_page(&html, &self.base_url, &self.selectors)?;

        match &page.document_link {
            Some(link) => info!(title = %page.page_title, %link, "document link found"),
            None => info!(title = %page.page_title, "no document link on page"),
        }
        Ok(page)
    }
}

/// Parse gazette HTML. A missing title region is a structural error; a
/// missing document anchor just means nothing was published.
pub fn parse_page(
    html: &str,
    base_url: &Url,
    selectors: &PageSelectors,
) -> Result<LocatedPage, LocateError> {
    let document = Html::parse_document(html);

    let title_el = document
        .select(&selectors.title)
        .next()
        .ok_or_else(|| LocateError::Parse("title element not found".to_string()))?;
    let page_title = collapse_whitespace(&title_el.text().collect::<Vec<_>>().join(" "));

    let href = document
        .select(&selectors.link)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|h| !h.is_empty());

    let document_link = match href {
        Some(href) => {
            debug!(%href, "raw document href");
            let resolved = base_url.join(href).map_err(|e| {
                LocateError::Parse(format!("document link {href:?} is not a valid URL: {e}"))
            })?;
            Some(resolved)
        }
        None => None,
    };

    Ok(LocatedPage {
        page_title,
        document_link,
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
