/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_link_preview_toggle: bool,
    pub max_message_len: usize,
}

/// When and how to split an outgoing body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessengerLimits {
    /// Bodies longer than this (in chars) are chunked.
    pub split_threshold: usize,
    /// Upper bound for each chunk (in chars).
    pub chunk_len: usize,
}

impl Default for MessengerLimits {
    fn default() -> Self {
        Self {
            split_threshold: 4000,
            chunk_len: 3500,
        }
    }
}
