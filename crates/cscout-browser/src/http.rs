use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use cscout_core::{domain::PageVisit, errors::Error, ports::PageNavigator, Result};

use crate::html::{anchor_hrefs, inline_urls};

/// Plain HTTP navigator: GET, follow redirects, scan the returned HTML.
#[derive(Clone, Debug)]
pub struct HttpNavigator {
    http: reqwest::Client,
}

impl HttpNavigator {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageNavigator for HttpNavigator {
    async fn visit(&self, url: &str, href_prefix: &str) -> Result<PageVisit> {
        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(url.to_string())
            } else {
                Error::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let final_url = resp.url().to_string();
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: format!("http status {status}"),
            });
        }

        let body = resp.text().await.map_err(|e| Error::Navigation {
            url: url.to_string(),
            reason: format!("body read failed: {e}"),
        })?;

        let mut hrefs = anchor_hrefs(&body, href_prefix);
        if hrefs.is_empty() {
            hrefs = inline_urls(&body, href_prefix);
        }
        debug!(url, final_url = %final_url, found = hrefs.len(), "Scanned page");

        Ok(PageVisit { final_url, hrefs })
    }
}
