//! Outbound notifications (Telegram bot today).

pub mod notifier;
pub mod port;
pub mod throttled;
pub mod types;
