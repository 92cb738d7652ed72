//! Blog search results scraped from pages rendered by a headless browser.
//!
//! Rendering is delegated to an external service behind [`PageRenderer`];
//! this module only builds search URLs and picks image links out of the
//! returned HTML.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;
use watchshots_shared::{BlogConfig, Candidate, Result, WatchshotsError};

use crate::CandidateSource;

/// Source label attached to blog candidates.
const SOURCE_LABEL: &str = "naver_blog";

/// Rendering requests wait on a full page load, so they get a longer timeout.
const RENDER_TIMEOUT_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Something that can turn a URL into fully-rendered HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render `url` and return the resulting document HTML.
    async fn render(&self, url: &str) -> Result<String>;
}

/// HTTP client for a Browserless-style `/content` endpoint.
pub struct BrowserlessRenderer {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessRenderer {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(RENDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| WatchshotsError::Browser(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let endpoint = format!("{}/content", self.base_url);
        let mut request = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({ "url": url }));
        if let Some(ref token) = self.token {
            request = request.query(&[("token", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WatchshotsError::Browser(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WatchshotsError::Browser(format!(
                "{endpoint}: HTTP {status}: {message}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| WatchshotsError::Browser(format!("{endpoint}: failed to read body: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Pull up to `limit` image URLs matching `selector` out of rendered HTML.
///
/// `src` values are resolved against `page_url`; empty, `data:` and
/// unresolvable values are dropped.
pub fn extract_image_urls(
    html: &str,
    page_url: &Url,
    selector: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let selector = Selector::parse(selector).map_err(|e| {
        WatchshotsError::config(format!("invalid blog image selector '{selector}': {e}"))
    })?;
    let doc = Html::parse_document(html);

    let urls = doc
        .select(&selector)
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
        .filter_map(|src| page_url.join(src).ok())
        .map(|u| u.to_string())
        .take(limit)
        .collect();

    Ok(urls)
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Image candidates from blog search result pages, one search per keyword.
pub struct BlogSearchSource<R: PageRenderer> {
    renderer: R,
    config: BlogConfig,
    source_delay: Duration,
}

impl<R: PageRenderer> BlogSearchSource<R> {
    pub fn new(renderer: R, config: BlogConfig, source_delay: Duration) -> Self {
        Self {
            renderer,
            config,
            source_delay,
        }
    }

    /// Search page URL for `keyword`.
    fn search_url(&self, keyword: &str) -> Result<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
        let raw = self.config.search_url.replace("{query}", &encoded);
        Url::parse(&raw)
            .map_err(|e| WatchshotsError::config(format!("invalid blog search URL '{raw}': {e}")))
    }

    /// Render the search page for `keyword` and return image URLs found on it.
    pub async fn search(&self, keyword: &str) -> Result<Vec<String>> {
        let page_url = self.search_url(keyword)?;
        debug!(%page_url, "rendering search page");
        let html = self.renderer.render(page_url.as_str()).await?;
        extract_image_urls(
            &html,
            &page_url,
            &self.config.image_selector,
            self.config.max_per_keyword,
        )
    }
}

#[async_trait]
impl<R: PageRenderer> CandidateSource for BlogSearchSource<R> {
    fn name(&self) -> &str {
        SOURCE_LABEL
    }

    /// A failed keyword is logged and skipped. The renderer error is only
    /// returned when every keyword failed, i.e. the renderer is unusable.
    #[instrument(skip_all, fields(keywords = self.config.keywords.len()))]
    async fn candidates(&self) -> Result<Vec<Candidate>> {
        let mut all = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for (i, keyword) in self.config.keywords.iter().enumerate() {
            if i > 0 && !self.source_delay.is_zero() {
                tokio::time::sleep(self.source_delay).await;
            }

            let urls = match self.search(keyword).await {
                Ok(urls) => urls,
                Err(e @ WatchshotsError::Config { .. }) => return Err(e),
                Err(e) => {
                    let unavailable = WatchshotsError::SourceUnavailable {
                        source_name: format!("{SOURCE_LABEL}:{keyword}"),
                        message: e.to_string(),
                    };
                    warn!(%keyword, reason = unavailable.reason_code(), error = %unavailable, "blog search failed, continuing");
                    last_error = Some(e);
                    continue;
                }
            };
            succeeded += 1;
            info!(%keyword, found = urls.len(), "blog search collected");

            // Result positions shift between runs; the URL hash alone names the file.
            all.extend(urls.into_iter().map(|url| Candidate {
                url,
                keyword: Some(keyword.clone()),
                source: SOURCE_LABEL.to_string(),
                ..Candidate::default()
            }));
        }

        match last_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(all),
        }
    }
}
