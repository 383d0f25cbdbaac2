//! Telegram adapters.
//!
//! - [`TelegramMessenger`]: the `cscout-core` MessagingPort over the Bot API (teloxide).
//! - [`preview::WebPreviewSource`]: reads public channels from `t.me/s/<channel>`.
//! - [`mtproto::MtprotoSource`]: reads any joined channel as a user account.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::{prelude::*, types::Recipient};

#[cfg(feature = "mtproto")]
pub mod mtproto;
pub mod preview;

use cscout_core::{
    domain::ChatTarget,
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            bot: Bot::with_client(token, client),
        })
    }

    fn recipient(chat: &ChatTarget) -> Recipient {
        match chat {
            ChatTarget::Id(id) => Recipient::Id(teloxide::types::ChatId(*id)),
            ChatTarget::Username(name) => Recipient::ChannelUsername(name.clone()),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_link_preview_toggle: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(&self, chat: &ChatTarget, text: &str) -> Result<()> {
        self.bot
            .send_message(Self::recipient(chat), text.to_string())
            .disable_web_page_preview(true)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
