//! Headless-browser page fetching
//!
//! [`PageFetcher`] is the orchestrator-facing contract: navigate to a URL,
//! wait for the page to quiesce, hand back the rendered HTML. The production
//! implementation drives headless Chromium through `chromiumoxide`; tests
//! substitute an in-memory fetcher.

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Navigate-and-render contract used by the crawl orchestrator
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Load `url`, wait for a quiescent page, and return its rendered HTML.
    /// Extraction run before quiescence yields empty results, so waiting is
    /// part of the contract, not an optimization.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Wrap a page operation in a timeout so a hung load cannot stall the run
pub async fn with_page_timeout<T, F>(fut: F, timeout_secs: u64, operation: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(Duration::from_secs(timeout_secs), fut)
        .await
        .map_err(|_| anyhow!("{operation} timed out after {timeout_secs}s"))?
}

/// RAII guard for a chromiumoxide [`Page`].
///
/// `Page` has no Drop implementation and needs an explicit async `close()`
/// to release its CDP target. The guard closes explicitly on the happy path
/// and spawns a fire-and-forget cleanup task on error paths.
struct PageGuard {
    page: Option<Page>,
    url: String,
}

impl PageGuard {
    fn new(page: Page, url: String) -> Self {
        Self {
            page: Some(page),
            url,
        }
    }

    fn page(&self) -> &Page {
        self.page.as_ref().expect("PageGuard: page already consumed")
    }

    async fn close(mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            if let Err(err) = page.close().await {
                warn!(url = %self.url, %err, "failed to close page");
                return Err(err.into());
            }
        }
        Ok(())
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let url = std::mem::take(&mut self.url);
            tokio::spawn(async move {
                if let Err(err) = page.close().await {
                    warn!(url = %url, %err, "page cleanup in drop failed");
                }
            });
        }
    }
}

/// Headless Chromium fetcher
pub struct ChromiumFetcher {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page_timeout_secs: u64,
    settle_delay: Duration,
}

impl ChromiumFetcher {
    /// Launch a headless browser instance. The CDP event handler runs on a
    /// background task for the lifetime of the fetcher.
    pub async fn launch(page_timeout_secs: u64, settle_delay_ms: u64) -> Result<Self> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(|e| anyhow!("browser config: {e}"))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("launch headless browser")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            page_timeout_secs,
            settle_delay: Duration::from_millis(settle_delay_ms),
        })
    }

    /// Close the browser and stop the CDP handler task.
    pub async fn shutdown(mut self) -> Result<()> {
        self.browser.close().await.context("close browser")?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("open page")?;
        let guard = PageGuard::new(page, url.to_string());

        with_page_timeout(
            async {
                guard
                    .page()
                    .goto(url)
                    .await
                    .map_err(|e| anyhow!("navigate to {url}: {e}"))?;
                guard
                    .page()
                    .wait_for_navigation()
                    .await
                    .map_err(|e| anyhow!("wait for load of {url}: {e}"))?;
                Ok(())
            },
            self.page_timeout_secs,
            "page navigation",
        )
        .await?;

        // Give background requests a moment to settle before extraction.
        tokio::time::sleep(self.settle_delay).await;

        let html = with_page_timeout(
            async {
                guard
                    .page()
                    .content()
                    .await
                    .map_err(|e| anyhow!("read content of {url}: {e}"))
            },
            self.page_timeout_secs,
            "page content",
        )
        .await?;

        debug!(url, bytes = html.len(), "fetched rendered page");
        guard.close().await?;
        Ok(html)
    }
}
