//! Two-tier scrape orchestration.
//!
//! The pipeline for one URL walks an explicit state machine:
//! cache check, lightweight HTTP fetch, a decision point, and an optional
//! rendered-browser fetch for pages that yield nothing statically. The
//! orchestrator is total: every path collapses to a `ScrapedContent`,
//! degraded to an empty one when both tiers fail.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use pagetalk_http::{HttpClient, RequestOpts};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};

use crate::browser::{PageRenderer, BROWSER_USER_AGENT};
use crate::cache::ContentCache;
use crate::extract::parse_sections;
use crate::types::ScrapedContent;

/// Upper bound on how many URLs are scraped at once, regardless of
/// configuration.
pub const MAX_CONCURRENCY: usize = 8;

/// Lightweight-fetch seam; the production implementation is [`HttpFetcher`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

/// Plain HTTP fetcher presenting a desktop-browser identity. Runs with zero
/// retries: a failed fetch falls through to the rendered tier instead.
pub struct HttpFetcher {
    client: HttpClient,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, pagetalk_http::HttpError> {
        Ok(Self {
            client: HttpClient::unanchored()?,
            timeout,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let opts = RequestOpts {
            timeout: Some(self.timeout),
            retries: Some(0),
            headers: Some(browser_headers()),
            ..Default::default()
        };
        Ok(self.client.get_text(url, opts).await?)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers
}

/// Where a single-URL scrape currently is. `Decide` holds the lightweight
/// tier's output; `Done` holds the final answer.
enum ScrapeState {
    CacheCheck,
    LightFetch,
    Decide(ScrapedContent),
    RenderFetch,
    Done(ScrapedContent),
}

/// Whether the lightweight tier's output warrants escalating to a rendered
/// fetch. Zero sections means the page is (probably) client-rendered.
fn needs_render(content: &ScrapedContent) -> bool {
    content.sections.is_empty()
}

/// Drives scrapes for one or many URLs against a shared fetcher, renderer,
/// and cache. Cloneable; all shared state is behind `Arc`s.
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    renderer: Arc<dyn PageRenderer>,
    cache: ContentCache,
    concurrency: usize,
}

impl ScrapeOrchestrator {
    /// `concurrency` is capped at [`MAX_CONCURRENCY`]; an operator-chosen
    /// lower value is honored, and zero is treated as one.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        renderer: Arc<dyn PageRenderer>,
        cache: ContentCache,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            cache,
            concurrency: concurrency.max(1).min(MAX_CONCURRENCY),
        }
    }

    /// Scrape one URL. Infallible by contract: failures degrade to
    /// `ScrapedContent::empty` rather than surfacing as errors.
    pub async fn scrape(&self, url: &str) -> ScrapedContent {
        let mut state = ScrapeState::CacheCheck;
        loop {
            state = match state {
                ScrapeState::CacheCheck => match self.cache.get(url).await {
                    Some(content) => ScrapeState::Done(content),
                    None => ScrapeState::LightFetch,
                },

                ScrapeState::LightFetch => {
                    let content = match self.fetcher.fetch(url).await {
                        Ok(html) => parse_sections(url, &html),
                        Err(err) => {
                            tracing::debug!(%url, error = %err, "scrape.light_fetch_failed");
                            ScrapedContent::empty(url)
                        }
                    };
                    ScrapeState::Decide(content)
                }

                ScrapeState::Decide(content) => {
                    if needs_render(&content) {
                        tracing::debug!(%url, "scrape.escalating_to_render");
                        ScrapeState::RenderFetch
                    } else {
                        let mut content = content;
                        self.cache.put(&mut content).await;
                        ScrapeState::Done(content)
                    }
                }

                ScrapeState::RenderFetch => match self.renderer.render(url).await {
                    Ok(html) => {
                        // Rendered output is cached even when it parses to
                        // nothing: re-rendering a genuinely empty page on
                        // every request would be the worse failure mode.
                        let mut content = parse_sections(url, &html);
                        self.cache.put(&mut content).await;
                        ScrapeState::Done(content)
                    }
                    Err(err) => {
                        tracing::warn!(%url, error = %err, "scrape.render_failed");
                        ScrapeState::Done(ScrapedContent::empty(url))
                    }
                },

                ScrapeState::Done(content) => {
                    tracing::debug!(
                        %url,
                        sections = content.sections.len(),
                        "scrape.complete"
                    );
                    return content;
                }
            };
        }
    }

    /// Scrape many URLs with bounded concurrency. Results come back in the
    /// same order as `urls`, one entry per input, duplicates included.
    pub async fn scrape_all(&self, urls: &[String]) -> Vec<ScrapedContent> {
        let scrapes: Vec<_> = urls.iter().map(|url| self.scrape(url)).collect();
        stream::iter(scrapes)
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
