use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use cscout_browser::http::HttpNavigator;
use cscout_core::{
    config::{Config, ResolverKind},
    messaging::{
        notifier::Notifier,
        throttled::{ThrottleConfig, ThrottledMessenger},
        types::MessengerLimits,
    },
    pipeline::run_once,
    ports::{ChannelSource, PageNavigator},
};
use cscout_telegram::{preview::WebPreviewSource, TelegramMessenger};

const BOT_TIMEOUT: Duration = Duration::from_secs(30);
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), cscout_core::Error> {
    cscout_core::logging::init("cscout")?;

    let cfg = Config::load();
    let notifier = build_notifier(&cfg);

    let Some(every) = cfg.run_interval else {
        run(&cfg, &notifier).await;
        return Ok(());
    };

    info!(minutes = every.as_secs() / 60, "Running on a schedule");
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupted, exiting"),
            Err(e) => {
                warn!(error = %e, "Could not listen for Ctrl-C");
                std::future::pending::<()>().await
            }
        }
    };
    let runs = run_on_schedule(every, shutdown, || run(&cfg, &notifier)).await;
    info!(runs, "Stopped");
    Ok(())
}

/// Run `job` every `every` until `shutdown` resolves. A shutdown that lands
/// mid-run abandons that run. Returns the number of completed runs.
async fn run_on_schedule<F, Fut>(
    every: Duration,
    shutdown: impl Future<Output = ()>,
    mut job: F,
) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0usize;

    loop {
        tokio::select! {
            _ = &mut shutdown => return runs,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            _ = &mut shutdown => {
                warn!("Shutdown during a run, abandoning it");
                return runs;
            }
            _ = job() => runs += 1,
        }
    }
}

async fn run(cfg: &Config, notifier: &Notifier) {
    let Some(navigator) = build_navigator(cfg) else {
        return;
    };

    let report = match build_source(cfg) {
        Some(mut source) => run_once(cfg, source.as_mut(), navigator.as_ref(), notifier).await,
        None => {
            // Nothing to read; still report an empty day.
            run_once(cfg, &mut NoSource, navigator.as_ref(), notifier).await
        }
    };

    info!(
        visited = report.visited_messages,
        aggregator_links = report.aggregator_links,
        resolved = report.resolved.len(),
        chunks_sent = report.chunks_sent,
        "Run finished"
    );
}

fn build_source(cfg: &Config) -> Option<Box<dyn ChannelSource>> {
    #[cfg(feature = "mtproto")]
    if let Some(creds) = &cfg.mtproto {
        info!(channel = %cfg.channel, "Reading channel over MTProto");
        return Some(Box::new(cscout_telegram::mtproto::MtprotoSource::new(
            creds.clone(),
        )));
    }

    #[cfg(not(feature = "mtproto"))]
    if cfg.mtproto.is_some() {
        warn!("MTProto credentials set but support is not compiled in; using web preview");
    }

    info!(channel = %cfg.channel, "Reading channel web preview");
    match WebPreviewSource::new(&cfg.user_agent, PREVIEW_TIMEOUT) {
        Ok(source) => Some(Box::new(source)),
        Err(e) => {
            error!(error = %e, "Could not set up channel reader");
            None
        }
    }
}

fn build_navigator(cfg: &Config) -> Option<Box<dyn PageNavigator>> {
    if cfg.resolver == ResolverKind::Browser {
        #[cfg(feature = "browser")]
        {
            return Some(Box::new(cscout_browser::chrome::ChromeNavigator::new(
                cfg.user_agent.clone(),
                cfg.anchor_wait,
            )));
        }
        #[cfg(not(feature = "browser"))]
        warn!("RESOLVER=browser but browser support is not compiled in; using http");
    }

    match HttpNavigator::new(&cfg.user_agent, cfg.navigation_timeout) {
        Ok(nav) => Some(Box::new(nav)),
        Err(e) => {
            error!(error = %e, "Could not set up page resolver");
            None
        }
    }
}

fn build_notifier(cfg: &Config) -> Notifier {
    let Some(bot) = &cfg.bot else {
        warn!("TELEGRAM_TOKEN or TELEGRAM_CHAT_ID not set, reports will only be logged");
        return Notifier::disabled();
    };

    let messenger = match TelegramMessenger::new(&bot.token, BOT_TIMEOUT) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "Could not set up Telegram bot");
            return Notifier::disabled();
        }
    };
    let throttled = ThrottledMessenger::new(Arc::new(messenger), ThrottleConfig::default());

    Notifier::new(
        Arc::new(throttled),
        bot.chat.clone(),
        MessengerLimits {
            split_threshold: cfg.telegram_message_limit,
            chunk_len: cfg.telegram_chunk_len,
        },
    )
}

/// Channel source used when no reader could be built.
struct NoSource;

#[async_trait::async_trait]
impl ChannelSource for NoSource {
    async fn read_recent(
        &mut self,
        _channel: &str,
        _limit: usize,
        _on_message: &mut (dyn FnMut(cscout_core::domain::ChannelMessage) + Send),
    ) -> cscout_core::Result<()> {
        Err(cscout_core::Error::Channel(
            "no channel reader available".to_string(),
        ))
    }
}
