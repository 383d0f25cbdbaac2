//! Public channel reader over Telegram's web preview (`https://t.me/s/<channel>`).
//!
//! Needs no credentials, but only works for public channels. Pages list posts
//! oldest-first; older pages are fetched with `?before=<id>`.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, warn};

use cscout_core::{
    domain::{ChannelMessage, LinkEntity, MessageId},
    errors::Error,
    ports::ChannelSource,
    Result,
};

const PREVIEW_BASE_URL: &str = "https://t.me/s/";

pub struct WebPreviewSource {
    client: reqwest::Client,
    base_url: String,
}

impl WebPreviewSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url: PREVIEW_BASE_URL.to_string(),
        })
    }

    /// Read from a mirror instead of `t.me/s/`. `base` must end with `/`.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    async fn fetch_page(&self, channel: &str, before: Option<i64>) -> Result<String> {
        let mut url = format!("{}{}", self.base_url, channel);
        if let Some(id) = before {
            url.push_str(&format!("?before={id}"));
        }
        debug!(url = %url, "Fetching channel preview page");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("preview request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Channel(format!(
                "preview request failed: {} for {url}",
                resp.status()
            )));
        }

        resp.text()
            .await
            .map_err(|e| Error::Channel(format!("preview body error: {e}")))
    }
}

#[async_trait]
impl ChannelSource for WebPreviewSource {
    async fn read_recent(
        &mut self,
        channel: &str,
        limit: usize,
        on_message: &mut (dyn FnMut(ChannelMessage) + Send),
    ) -> Result<()> {
        let channel = channel.trim().trim_start_matches('@');
        let mut before: Option<i64> = None;
        let mut delivered = 0usize;

        while delivered < limit {
            let html = self.fetch_page(channel, before).await?;
            let mut page = parse_preview_page(&html);
            page.retain(|m| before.map_or(true, |b| m.id.0 < b));
            if page.is_empty() {
                if delivered == 0 {
                    warn!(channel, "Channel preview has no posts (private channel or wrong name?)");
                }
                break;
            }

            // Newest first, like the MTProto iterator.
            page.sort_by(|a, b| b.id.cmp(&a.id));
            before = page.last().map(|m| m.id.0);

            for msg in page {
                if delivered >= limit {
                    break;
                }
                on_message(msg);
                delivered += 1;
            }
        }

        info!(channel, delivered, "Read channel preview");
        Ok(())
    }
}

/// Parse one preview page into messages (document order, oldest first).
pub fn parse_preview_page(html: &str) -> Vec<ChannelMessage> {
    let document = Html::parse_document(html);
    let (Ok(post_sel), Ok(text_sel)) = (
        Selector::parse("div.tgme_widget_message[data-post]"),
        Selector::parse("div.tgme_widget_message_text"),
    ) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for post in document.select(&post_sel) {
        let Some(id) = post
            .value()
            .attr("data-post")
            .and_then(|p| p.rsplit_once('/'))
            .and_then(|(_, id)| id.parse::<i64>().ok())
        else {
            continue;
        };

        let (text, entities) = match post.select(&text_sel).next() {
            Some(body) => message_text(body),
            None => (String::new(), Vec::new()),
        };

        out.push(ChannelMessage {
            id: MessageId(id),
            text,
            entities,
        });
    }
    out
}

/// Flatten a message body to text (`<br>` → newline) and record each anchor as
/// a `TextUrl` entity at its UTF-16 position.
fn message_text(body: ElementRef<'_>) -> (String, Vec<LinkEntity>) {
    let mut text = String::new();
    let mut units = 0usize;
    let mut entities = Vec::new();

    for node in body.descendants() {
        match node.value() {
            Node::Text(t) => {
                text.push_str(t);
                units += t.encode_utf16().count();
            }
            Node::Element(e) if e.name() == "br" => {
                text.push('\n');
                units += 1;
            }
            Node::Element(e) if e.name() == "a" => {
                let Some(href) = e.attr("href") else {
                    continue;
                };
                let length = ElementRef::wrap(node)
                    .map(|a| a.text().map(|t| t.encode_utf16().count()).sum::<usize>())
                    .unwrap_or(0);
                entities.push(LinkEntity::TextUrl {
                    offset: units,
                    length,
                    url: href.to_string(),
                });
            }
            _ => {}
        }
    }
    (text, entities)
}
