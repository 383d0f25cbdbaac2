//! Channel reader: new aggregator links from unseen messages.

use tracing::{info, warn};

use crate::{
    domain::ChannelMessage, links::LinkMatcher, ports::ChannelSource, seen::SeenStore,
};

/// Result of one pass over the channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Aggregator links from unseen messages, first-seen order, no duplicates.
    pub links: Vec<String>,
    /// Messages that were not in the seen set.
    pub visited: usize,
    /// Messages skipped because they were already seen.
    pub skipped: usize,
    /// Whether iteration stopped on an error.
    pub interrupted: bool,
}

/// Read up to `limit` recent posts, collect marker links from the ones not in
/// `store`, then record every visited id and persist the store.
pub async fn collect_new_links(
    source: &mut dyn ChannelSource,
    store: &SeenStore,
    matcher: &LinkMatcher,
    channel: &str,
    limit: usize,
) -> ReadOutcome {
    info!(channel, limit, "Reading channel");

    let previously_seen = store.load();
    let mut seen = previously_seen.clone();
    let mut outcome = ReadOutcome::default();

    let result = {
        let mut on_message = |msg: ChannelMessage| {
            if previously_seen.contains(&msg.id) {
                outcome.skipped += 1;
                return;
            }
            seen.insert(msg.id);
            outcome.visited += 1;

            for link in matcher.extract(&msg) {
                if outcome.links.contains(&link) {
                    continue;
                }
                info!(msg_id = msg.id.0, link = %link, "Found aggregator link");
                outcome.links.push(link);
            }
        };
        source.read_recent(channel, limit, &mut on_message).await
    };

    if let Err(e) = result {
        warn!(channel, error = %e, "Channel iteration stopped early");
        outcome.interrupted = true;
    }
    source.close().await;

    if let Err(e) = store.save(&seen) {
        warn!(path = %store.path().display(), error = %e, "Failed to save seen ids");
    }

    info!(
        visited = outcome.visited,
        skipped = outcome.skipped,
        links = outcome.links.len(),
        "Collected new aggregator links"
    );
    outcome
}
