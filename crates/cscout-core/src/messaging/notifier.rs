use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    domain::ChatTarget,
    formatting::split_message,
    messaging::{port::MessagingPort, types::MessengerLimits},
};

/// Best-effort report delivery. Never fails: missing credentials and send
/// errors are logged and the run carries on.
pub struct Notifier {
    target: Option<(Arc<dyn MessagingPort>, ChatTarget)>,
    limits: MessengerLimits,
}

impl Notifier {
    pub fn new(port: Arc<dyn MessagingPort>, chat: ChatTarget, limits: MessengerLimits) -> Self {
        Self {
            target: Some((port, chat)),
            limits,
        }
    }

    /// A notifier without credentials; every send is a logged no-op.
    pub fn disabled() -> Self {
        Self {
            target: None,
            limits: MessengerLimits::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Send `text`, chunked if needed. Returns how many chunks were delivered.
    pub async fn notify(&self, text: &str) -> usize {
        let Some((port, chat)) = &self.target else {
            warn!("Bot token or chat id missing, skipping send");
            return 0;
        };

        let max = port.capabilities().max_message_len;
        let chunk_len = self.limits.chunk_len.min(max);
        let threshold = self.limits.split_threshold.min(max);
        let parts = split_message(text, threshold, chunk_len);

        let mut delivered = 0usize;
        for (idx, part) in parts.iter().enumerate() {
            match port.send_text(chat, part).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    error!(chat = %chat, chunk = idx + 1, of = parts.len(), error = %e, "Failed to send message");
                }
            }
        }

        if delivered > 0 {
            info!(chat = %chat, chunks = delivered, "Sent message via bot");
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, messaging::types::MessagingCapabilities, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeMessenger {
        sends: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_link_preview_toggle: true,
                max_message_len: 4096,
            }
        }

        async fn send_text(&self, _chat: &ChatTarget, text: &str) -> Result<()> {
            let mut sends = self.sends.lock().unwrap();
            if self.fail_on == Some(sends.len()) {
                sends.push(String::new());
                return Err(Error::External("telegram error: Bad Gateway".to_string()));
            }
            sends.push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn disabled_notifier_sends_nothing() {
        let n = Notifier::disabled();
        assert!(!n.is_enabled());
        assert_eq!(n.notify("hello").await, 0);
    }

    #[tokio::test]
    async fn long_body_goes_out_as_ordered_chunks() {
        let fake = Arc::new(FakeMessenger::default());
        let n = Notifier::new(
            fake.clone(),
            ChatTarget::Id(7),
            MessengerLimits {
                split_threshold: 20,
                chunk_len: 12,
            },
        );

        let body = "line-one\nline-two\nline-three\nline-four";
        assert_eq!(n.notify(body).await, 4);
        let sends = fake.sends.lock().unwrap().clone();
        assert_eq!(sends.concat(), body);
        assert_eq!(sends[0], "line-one\n");
    }

    #[test_log::test(tokio::test)]
    async fn send_failure_is_logged_and_remaining_chunks_still_go() {
        let fake = Arc::new(FakeMessenger {
            fail_on: Some(0),
            ..Default::default()
        });
        let n = Notifier::new(
            fake.clone(),
            ChatTarget::Id(7),
            MessengerLimits {
                split_threshold: 5,
                chunk_len: 5,
            },
        );

        assert_eq!(n.notify("aaaa\nbbbb\n").await, 1);
        assert_eq!(fake.sends.lock().unwrap().len(), 2);
    }
}
