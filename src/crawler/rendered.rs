//! Headless-browser fetch strategy
//!
//! One browser process serves the whole run. Pages are opened one at a time
//! behind an async mutex, so concurrent workers queue for the session rather
//! than racing on it. The browser is closed by [`FetchStrategy::shutdown`]
//! and, as a backstop, killed when the fetcher is dropped.
//!
//! chromiumoxide exposes no network-idle wait, so "settled" is approximated:
//! navigation waits for the load event, then a fixed `settle-delay-ms`
//! pause lets late XHR and script work finish before the DOM snapshot.

use crate::config::FetchConfig;
use crate::crawler::fetcher::{page_from_html, FetchError, FetchMethod, FetchStrategy, FetchedPage};
use crate::ScoutError;
use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

/// Headless-browser retrieval
pub struct RenderedFetcher {
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl RenderedFetcher {
    /// Launches the browser session
    ///
    /// A launch failure is fatal for the run.
    pub async fn launch(config: &FetchConfig) -> Result<Self, ScoutError> {
        let navigation_timeout = Duration::from_secs(config.navigation_timeout_secs);

        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .arg(format!("--user-agent={}", config.user_agent))
            .request_timeout(navigation_timeout)
            .build()
            .map_err(ScoutError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScoutError::BrowserLaunch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        tracing::info!("Launched headless browser");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            navigation_timeout,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        })
    }

    /// Navigates an open page and snapshots its rendered DOM
    async fn capture(&self, page: &Page, url: &Url) -> Result<FetchedPage, FetchError> {
        let navigation = async {
            page.goto(url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok::<(), CdpError>(())
        };

        match tokio::time::timeout(self.navigation_timeout, navigation).await {
            Err(_) | Ok(Err(CdpError::Timeout)) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(e)) => return Err(FetchError::network(url, e)),
            Ok(Ok(())) => {}
        }

        // Let late scripts finish populating the DOM
        tokio::time::sleep(self.settle_delay).await;

        let html = page
            .content()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        let mut fetched = page_from_html(final_url, &html);
        if fetched.title.is_none() {
            fetched.title = page.get_title().await.ok().flatten();
        }
        Ok(fetched)
    }
}

#[async_trait]
impl FetchStrategy for RenderedFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Rendered
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let session = self.browser.lock().await;
        let browser = session
            .as_ref()
            .ok_or_else(|| FetchError::network(url, "browser session already closed"))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let result = self.capture(&page, url).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {}", url, e);
        }

        result
    }

    async fn shutdown(&self) {
        let browser = self.browser.lock().await.take();
        if let Some(mut browser) = browser {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }
            if let Err(e) = browser.wait().await {
                tracing::debug!("Browser process did not exit cleanly: {}", e);
            }
            tracing::info!("Closed headless browser");
        }

        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
    }
}

impl Drop for RenderedFetcher {
    fn drop(&mut self) {
        // Dropping the Browser kills its child process; the handler task
        // would otherwise outlive it.
        if let Some(task) = self.handler_task.get_mut().take() {
            task.abort();
        }
    }
}
