//! Headless Chromium navigator (chromiumoxide).
//!
//! The browser is launched on the first visit and reused for the batch; one
//! tab serves every page. Anchors are polled until they show up or the anchor
//! wait runs out, so pages that inject links from script still resolve.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    error::CdpError,
    Page,
};
use futures::StreamExt;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};

use cscout_core::{domain::PageVisit, errors::Error, ports::PageNavigator, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

struct Session {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

pub struct ChromeNavigator {
    user_agent: String,
    anchor_wait: Duration,
    session: Mutex<Option<Session>>,
}

impl ChromeNavigator {
    pub fn new(user_agent: impl Into<String>, anchor_wait: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            anchor_wait,
            session: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<Session> {
        let config = BrowserConfig::builder()
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .build()
            .map_err(|e| Error::External(format!("browser config invalid: {e}")))?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| Error::External(format!("browser launch failed: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::External(format!("browser tab failed: {e}")))?;

        info!("Launched headless browser");
        Ok(Session {
            browser,
            page,
            handler,
        })
    }

    /// Poll for matching anchors until some appear or `anchor_wait` elapses.
    async fn wait_for_anchors(&self, page: &Page, href_prefix: &str) -> Vec<String> {
        let selector = format!("a[href^=\"{}\"]", href_prefix.replace('"', "\\\""));
        let started = Instant::now();

        loop {
            let hrefs = match page.find_elements(selector.as_str()).await {
                Ok(elements) => {
                    let mut out: Vec<String> = Vec::new();
                    for el in elements {
                        if let Ok(Some(href)) = el.attribute("href").await {
                            let href = href.trim().to_string();
                            if href.starts_with(href_prefix) && !out.contains(&href) {
                                out.push(href);
                            }
                        }
                    }
                    out
                }
                Err(e) => {
                    debug!(error = %e, "Anchor lookup failed");
                    Vec::new()
                }
            };

            if !hrefs.is_empty() || started.elapsed() >= self.anchor_wait {
                return hrefs;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl PageNavigator for ChromeNavigator {
    async fn visit(&self, url: &str, href_prefix: &str) -> Result<PageVisit> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let Some(session) = guard.as_ref() else {
            return Err(Error::External("browser session unavailable".to_string()));
        };
        let page = session.page.clone();

        page.goto(url).await.map_err(|e| match e {
            CdpError::Timeout => Error::Timeout(url.to_string()),
            other => Error::Navigation {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })?;

        let hrefs = self.wait_for_anchors(&page, href_prefix).await;
        let final_url = match page.url().await {
            Ok(Some(u)) => u,
            _ => url.to_string(),
        };
        debug!(url, final_url = %final_url, found = hrefs.len(), "Scanned page");

        Ok(PageVisit { final_url, hrefs })
    }

    async fn shutdown(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        if let Err(e) = session.browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        if let Err(e) = session.browser.wait().await {
            debug!(error = %e, "Browser process wait failed");
        }
        session.handler.abort();
        info!("Closed headless browser");
    }
}
