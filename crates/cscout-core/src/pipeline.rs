//! One scrape → resolve → report pass.

use std::path::PathBuf;

use chrono::Local;
use tracing::{info, warn};

use crate::{
    config::Config,
    formatting::{courses_report, no_new_links_message, no_resolved_links_message},
    links::LinkMatcher,
    messaging::notifier::Notifier,
    output,
    ports::{ChannelSource, PageNavigator},
    reader::collect_new_links,
    resolver::{resolve_links, ResolveOptions},
    seen::SeenStore,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub visited_messages: usize,
    pub aggregator_links: usize,
    pub resolved: Vec<String>,
    pub output_file: Option<PathBuf>,
    pub chunks_sent: usize,
}

pub async fn run_once(
    cfg: &Config,
    source: &mut dyn ChannelSource,
    navigator: &dyn PageNavigator,
    notifier: &Notifier,
) -> RunReport {
    let mut report = RunReport::default();

    let store = SeenStore::new(&cfg.seen_file);
    let matcher = LinkMatcher::new(&cfg.link_marker);
    let read = collect_new_links(
        source,
        &store,
        &matcher,
        &cfg.channel,
        cfg.message_limit,
    )
    .await;
    report.visited_messages = read.visited;
    report.aggregator_links = read.links.len();

    if read.links.is_empty() {
        let msg = no_new_links_message(&cfg.link_marker);
        info!("{msg}");
        report.chunks_sent = notifier.notify(&msg).await;
        return report;
    }

    let opts = ResolveOptions {
        target_prefix: cfg.target_prefix.clone(),
        anchor_mode: cfg.anchor_mode,
        timeout: cfg.navigation_timeout,
    };
    report.resolved = resolve_links(navigator, &read.links, &opts).await;

    if report.resolved.is_empty() {
        let msg = no_resolved_links_message(&cfg.target_prefix);
        info!("{msg}");
        report.chunks_sent = notifier.notify(&msg).await;
        return report;
    }

    let path = if cfg.output_timestamped {
        output::timestamped_path(&cfg.output_file, Local::now())
    } else {
        cfg.output_file.clone()
    };
    match output::write_links(&path, &report.resolved) {
        Ok(()) => report.output_file = Some(path),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not write output file"),
    }

    let msg = courses_report(&cfg.target_prefix, &report.resolved);
    report.chunks_sent = notifier.notify(&msg).await;
    report
}
