use async_trait::async_trait;

use crate::{domain::ChatTarget, messaging::types::MessagingCapabilities, Result};

/// Outbound messaging port.
///
/// One call is one platform message; splitting long bodies is the caller's job.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Send plain text with link previews disabled where supported.
    async fn send_text(&self, chat: &ChatTarget, text: &str) -> Result<()>;
}
