//! Rendered-fetch tier: a WebDriver-backed page renderer.
//!
//! Each render owns one isolated browser session. The session is closed on
//! every exit path (success, connect stall, navigation timeout, missing
//! body, error), and the whole connect-navigate-capture-close sequence runs
//! on a detached task, so a caller that stops waiting cannot cancel the
//! teardown. A leaked browser process per request is the failure mode this
//! module exists to prevent.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tokio::time::timeout;
use webdriver::capabilities::Capabilities;

/// Desktop Chrome user-agent shared by both scrape tiers so a page sees the
/// same client identity regardless of which tier fetched it.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Seam between the orchestrator and the rendered tier. Implementations
/// must release any acquired browser resources before finishing, on every
/// path, including when the caller drops the returned future.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to `url`, let scripts run, and return the rendered HTML.
    async fn render(&self, url: &str) -> Result<String>;
}

/// Concrete renderer backed by a WebDriver endpoint (chromedriver).
pub struct WebDriverRenderer {
    webdriver_url: String,
    nav_timeout: Duration,
    body_wait: Duration,
}

impl WebDriverRenderer {
    pub fn new(webdriver_url: String, nav_timeout: Duration, body_wait: Duration) -> Self {
        Self {
            webdriver_url,
            nav_timeout,
            body_wait,
        }
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let webdriver_url = self.webdriver_url.clone();
        let url = url.to_string();
        let nav_timeout = self.nav_timeout;
        let body_wait = self.body_wait;

        // The session lives on its own task. Dropping the render future
        // (client disconnect) leaves the task running to completion, which
        // is what keeps the close unconditional.
        let session = tokio::spawn(async move {
            // Session creation gets the same deadline as navigation; an
            // endpoint that accepts TCP but never answers must not stall
            // the URL forever.
            let client = match timeout(nav_timeout, connect(&webdriver_url)).await {
                Ok(Ok(client)) => client,
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    return Err(anyhow!(
                        "webdriver session not established within {}ms",
                        nav_timeout.as_millis()
                    ))
                }
            };

            let outcome = timeout(nav_timeout, capture_source(&client, &url, body_wait)).await;

            if let Err(err) = client.close().await {
                tracing::debug!(%url, error = %err, "render.session_close_failed");
            }

            match outcome {
                Ok(result) => result,
                Err(_) => Err(anyhow!(
                    "navigation exceeded {}ms deadline",
                    nav_timeout.as_millis()
                )),
            }
        });

        session
            .await
            .map_err(|err| anyhow!("render task failed: {err}"))?
    }
}

async fn connect(webdriver_url: &str) -> Result<Client> {
    let mut caps = Capabilities::new();
    let mut chrome_opts = HashMap::new();
    // Sandbox flags stay off by default for container portability; the
    // deployment chooses how hardened its chromedriver host is.
    chrome_opts.insert(
        "args".to_string(),
        json!([
            "--headless",
            "--disable-gpu",
            "--no-sandbox",
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage",
            format!("--user-agent={BROWSER_USER_AGENT}"),
        ]),
    );
    caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

    let client = ClientBuilder::native()
        .capabilities(caps)
        .connect(webdriver_url)
        .await?;
    Ok(client)
}

async fn capture_source(client: &Client, url: &str, body_wait: Duration) -> Result<String> {
    client.goto(url).await?;

    // Client-rendered pages may attach `body` late; give them a bounded
    // window before giving up on this tier.
    timeout(body_wait, client.wait().for_element(Locator::Css("body")))
        .await
        .map_err(|_| anyhow!("timed out waiting for body element"))?
        .map_err(|e| anyhow!("body element never appeared: {e}"))?;

    client.source().await.map_err(anyhow::Error::from)
}
