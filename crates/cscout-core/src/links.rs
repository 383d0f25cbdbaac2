//! Aggregator-link extraction from channel messages.
//!
//! Candidates are picked by substring ("contains the marker"), then checked
//! with a real URL parse against the marker host.

use tracing::debug;

use crate::domain::{ChannelMessage, LinkEntity};

/// Characters trimmed off whitespace-split tokens.
const TRIM_CHARS: &[char] = &['.', ',', ';', '(', ')', '[', ']', '<', '>', '"', '\''];

/// Matches links to one aggregator host (and its subdomains).
#[derive(Clone, Debug)]
pub struct LinkMatcher {
    marker: String,
}

impl LinkMatcher {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().trim().to_lowercase(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    fn mentions_marker(&self, candidate: &str) -> bool {
        !self.marker.is_empty() && candidate.to_lowercase().contains(&self.marker)
    }

    /// Host allowlist check on a parsed URL. Schemeless candidates are read as https.
    pub fn is_marker_link(&self, candidate: &str) -> bool {
        self.marker_url(candidate).is_some()
    }

    /// Parse `candidate` (https assumed when the scheme is missing) and keep it
    /// only if it points at the marker host or a subdomain of it.
    pub fn marker_url(&self, candidate: &str) -> Option<url::Url> {
        let parsed = if candidate.contains("://") {
            url::Url::parse(candidate)
        } else {
            url::Url::parse(&format!("https://{candidate}"))
        }
        .ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?.to_lowercase();
        if host == self.marker || host.ends_with(&format!(".{}", self.marker)) {
            Some(parsed)
        } else {
            None
        }
    }

    /// All marker links in `msg` as absolute URLs, entity links first,
    /// deduplicated in order.
    pub fn extract(&self, msg: &ChannelMessage) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        let from_entities = msg.entities.iter().filter_map(|ent| match ent {
            LinkEntity::Url { offset, length } => {
                utf16_slice(&msg.text, *offset, *length).map(str::to_string)
            }
            LinkEntity::TextUrl { url, .. } => Some(url.clone()),
        });
        let from_text = msg
            .text
            .split_whitespace()
            .filter(|tok| self.mentions_marker(tok))
            .map(|tok| tok.trim_matches(TRIM_CHARS))
            // Display-truncated URLs ("…") are covered by their entity.
            .filter(|tok| !tok.ends_with('…'))
            .map(str::to_string);

        for candidate in from_entities.chain(from_text) {
            if candidate.is_empty() || !self.mentions_marker(&candidate) {
                continue;
            }
            let Some(parsed) = self.marker_url(&candidate) else {
                debug!(msg_id = msg.id.0, candidate = %candidate, "Dropping link outside marker host");
                continue;
            };
            // Stored absolute so navigators can load it.
            let link = parsed.to_string();
            if !out.contains(&link) {
                out.push(link);
            }
        }
        out
    }
}

/// Slice `text` by a UTF-16 code-unit span. `None` if the span is out of
/// range or splits a surrogate pair.
pub fn utf16_slice(text: &str, offset: usize, length: usize) -> Option<&str> {
    let end = offset.checked_add(length)?;
    let mut units = 0usize;
    let mut start_byte = None;
    let mut end_byte = None;

    for (byte_idx, ch) in text.char_indices() {
        if units == offset {
            start_byte = Some(byte_idx);
        }
        if units == end {
            end_byte = Some(byte_idx);
            break;
        }
        units += ch.len_utf16();
    }
    if units == offset && start_byte.is_none() {
        start_byte = Some(text.len());
    }
    if units == end && end_byte.is_none() {
        end_byte = Some(text.len());
    }

    let (start, stop) = (start_byte?, end_byte?);
    text.get(start..stop)
}
