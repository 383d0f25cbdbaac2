use async_trait::async_trait;

use crate::{
    domain::{ChannelMessage, PageVisit},
    Result,
};

/// Port for reading recent posts from a channel.
///
/// Implementations stream messages newest-first through `on_message`. An error
/// returned midway leaves everything already delivered valid; the reader keeps
/// those messages and treats the error as the end of the batch.
#[async_trait]
pub trait ChannelSource: Send {
    async fn read_recent(
        &mut self,
        channel: &str,
        limit: usize,
        on_message: &mut (dyn FnMut(ChannelMessage) + Send),
    ) -> Result<()>;

    /// Release connections. Called once after `read_recent`, even on error.
    async fn close(&mut self) {}
}

/// Port for loading an aggregator page and collecting anchors with a given
/// href prefix.
#[async_trait]
pub trait PageNavigator: Send + Sync {
    async fn visit(&self, url: &str, href_prefix: &str) -> Result<PageVisit>;

    /// Release browser resources. Called once after the batch.
    async fn shutdown(&self) {}
}
