use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::domain::{AnchorMode, ChatTarget};

pub const DEFAULT_CHANNEL: &str = "@getstudyfevers";
pub const DEFAULT_LINK_MARKER: &str = "coursefolder.net";
pub const DEFAULT_TARGET_PREFIX: &str = "https://www.udemy.com/course/";
/// One year; larger intervals are rejected.
pub const MAX_RUN_INTERVAL_MINUTES: u64 = 365 * 24 * 60;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Which implementation resolves aggregator pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverKind {
    Http,
    Browser,
}

/// MTProto credentials for reading the channel as a user account.
#[derive(Clone, Debug)]
pub struct MtprotoCredentials {
    pub api_id: i32,
    pub api_hash: String,
    /// Base64 session blob; takes precedence over `session_file`.
    pub session: Option<String>,
    pub session_file: PathBuf,
    /// Used only for a first interactive login.
    pub phone: Option<String>,
}

/// Bot credentials. Both halves must be present for notifications to go out.
#[derive(Clone, Debug)]
pub struct BotCredentials {
    pub token: String,
    pub chat: ChatTarget,
}

/// Typed configuration, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Channel
    pub mtproto: Option<MtprotoCredentials>,
    pub channel: String,
    pub message_limit: usize,
    pub link_marker: String,

    // Resolver
    pub resolver: ResolverKind,
    pub target_prefix: String,
    pub anchor_mode: AnchorMode,
    /// `None` means unbounded.
    pub navigation_timeout: Option<Duration>,
    pub anchor_wait: Duration,
    pub user_agent: String,

    // Notifier
    pub bot: Option<BotCredentials>,
    pub telegram_message_limit: usize,
    pub telegram_chunk_len: usize,

    // Files
    pub seen_file: PathBuf,
    pub output_file: PathBuf,
    pub output_timestamped: bool,

    // Scheduling
    pub run_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mtproto: None,
            channel: DEFAULT_CHANNEL.to_string(),
            message_limit: 500,
            link_marker: DEFAULT_LINK_MARKER.to_string(),
            resolver: ResolverKind::Http,
            target_prefix: DEFAULT_TARGET_PREFIX.to_string(),
            anchor_mode: AnchorMode::First,
            navigation_timeout: Some(Duration::from_millis(30_000)),
            anchor_wait: Duration::from_millis(10_000),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bot: None,
            telegram_message_limit: 4000,
            telegram_chunk_len: 3500,
            seen_file: PathBuf::from("udemy_seen_ids.json"),
            output_file: PathBuf::from("udemy_links.txt"),
            output_timestamped: false,
            run_interval: None,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let get = |key: &str| lookup(key).and_then(non_empty);
        let get_u64 = |key: &str| get(key).and_then(|s| s.trim().parse::<u64>().ok());
        let get_bool = |key: &str| get(key).map(|s| parse_bool(&s));

        // MTProto needs both halves; a bad id disables it.
        let api_id = get("TG_API_ID")
            .or_else(|| get("TELEGRAM_API_ID"))
            .and_then(|s| s.trim().parse::<i32>().ok());
        let api_hash = get("TG_API_HASH").or_else(|| get("TELEGRAM_API_HASH"));
        let mtproto = match (api_id, api_hash) {
            (Some(api_id), Some(api_hash)) => Some(MtprotoCredentials {
                api_id,
                api_hash: api_hash.trim().to_string(),
                session: get("TG_SESSION").map(|s| s.trim().to_string()),
                session_file: get("TG_SESSION_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("course-scout.session")),
                phone: get("TG_PHONE").map(|s| s.trim().to_string()),
            }),
            _ => None,
        };

        let bot = match (get("TELEGRAM_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat)) => ChatTarget::parse(&chat).map(|chat| BotCredentials {
                token: token.trim().to_string(),
                chat,
            }),
            _ => None,
        };

        let resolver = match get("RESOLVER").map(|s| s.trim().to_lowercase()).as_deref() {
            Some("browser") | Some("chrome") | Some("chromium") => ResolverKind::Browser,
            _ => ResolverKind::Http,
        };

        let anchor_mode = if get_bool("RESOLVE_ALL_ANCHORS").unwrap_or(false) {
            AnchorMode::All
        } else {
            AnchorMode::First
        };

        let navigation_timeout = match get_u64("NAVIGATION_TIMEOUT_MS") {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => d.navigation_timeout,
        };

        // Out-of-range intervals disable periodic mode.
        let run_interval = get_u64("RUN_INTERVAL_MINUTES")
            .filter(|m| (1..=MAX_RUN_INTERVAL_MINUTES).contains(m))
            .map(|m| Duration::from_secs(m * 60));

        let telegram_message_limit = get_u64("TELEGRAM_MESSAGE_LIMIT")
            .map(|v| v as usize)
            .filter(|v| *v > 0)
            .unwrap_or(d.telegram_message_limit);
        // A chunk never exceeds the single-message limit.
        let telegram_chunk_len = get_u64("TELEGRAM_CHUNK_LEN")
            .map(|v| v as usize)
            .filter(|v| *v > 0)
            .unwrap_or(d.telegram_chunk_len)
            .min(telegram_message_limit);

        Self {
            mtproto,
            channel: get("GROUP_USERNAME")
                .map(|s| s.trim().to_string())
                .unwrap_or(d.channel),
            message_limit: get_u64("CHANNEL_MESSAGE_LIMIT")
                .map(|v| v as usize)
                .unwrap_or(d.message_limit),
            link_marker: get("LINK_MARKER")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or(d.link_marker),
            resolver,
            target_prefix: get("TARGET_PREFIX")
                .map(|s| s.trim().to_string())
                .unwrap_or(d.target_prefix),
            anchor_mode,
            navigation_timeout,
            anchor_wait: get_u64("ANCHOR_WAIT_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.anchor_wait),
            user_agent: get("HTTP_USER_AGENT").unwrap_or(d.user_agent),
            bot,
            telegram_message_limit,
            telegram_chunk_len,
            seen_file: get("SEEN_FILE").map(PathBuf::from).unwrap_or(d.seen_file),
            output_file: get("OUTPUT_FILE")
                .map(PathBuf::from)
                .unwrap_or(d.output_file),
            output_timestamped: get_bool("OUTPUT_TIMESTAMPED").unwrap_or(false),
            run_interval,
        }
    }

    /// Channel name without the leading `@`.
    pub fn channel_username(&self) -> &str {
        self.channel.trim_start_matches('@')
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = from_pairs(&[]);
        assert!(cfg.mtproto.is_none());
        assert!(cfg.bot.is_none());
        assert_eq!(cfg.channel, "@getstudyfevers");
        assert_eq!(cfg.channel_username(), "getstudyfevers");
        assert_eq!(cfg.message_limit, 500);
        assert_eq!(cfg.resolver, ResolverKind::Http);
        assert_eq!(cfg.anchor_mode, AnchorMode::First);
        assert_eq!(cfg.seen_file, PathBuf::from("udemy_seen_ids.json"));
        assert_eq!(cfg.output_file, PathBuf::from("udemy_links.txt"));
        assert!(cfg.run_interval.is_none());
    }

    #[test]
    fn bot_needs_token_and_chat() {
        let cfg = from_pairs(&[("TELEGRAM_TOKEN", "123:abc")]);
        assert!(cfg.bot.is_none());

        let cfg = from_pairs(&[("TELEGRAM_TOKEN", "123:abc"), ("TELEGRAM_CHAT_ID", "-42")]);
        let bot = cfg.bot.expect("bot configured");
        assert_eq!(bot.token, "123:abc");
        assert_eq!(bot.chat, ChatTarget::Id(-42));
    }

    #[test]
    fn mtproto_accepts_either_variable_family() {
        let cfg = from_pairs(&[("TELEGRAM_API_ID", "12345"), ("TG_API_HASH", "deadbeef")]);
        let creds = cfg.mtproto.expect("mtproto configured");
        assert_eq!(creds.api_id, 12345);
        assert_eq!(creds.api_hash, "deadbeef");
        assert_eq!(creds.session_file, PathBuf::from("course-scout.session"));

        let cfg = from_pairs(&[("TG_API_ID", "not-a-number"), ("TG_API_HASH", "x")]);
        assert!(cfg.mtproto.is_none());
    }

    #[test]
    fn zero_navigation_timeout_is_unbounded() {
        let cfg = from_pairs(&[("NAVIGATION_TIMEOUT_MS", "0")]);
        assert!(cfg.navigation_timeout.is_none());

        let cfg = from_pairs(&[("NAVIGATION_TIMEOUT_MS", "1500")]);
        assert_eq!(cfg.navigation_timeout, Some(Duration::from_millis(1500)));

        let cfg = from_pairs(&[("NAVIGATION_TIMEOUT_MS", "soon")]);
        assert_eq!(cfg.navigation_timeout, Some(Duration::from_millis(30_000)));
    }

    #[test]
    fn chunk_len_is_capped_by_message_limit() {
        let cfg = from_pairs(&[
            ("TELEGRAM_MESSAGE_LIMIT", "1000"),
            ("TELEGRAM_CHUNK_LEN", "5000"),
        ]);
        assert_eq!(cfg.telegram_chunk_len, 1000);
    }

    #[test]
    fn flags_and_interval() {
        let cfg = from_pairs(&[
            ("RESOLVER", "Browser"),
            ("RESOLVE_ALL_ANCHORS", "yes"),
            ("OUTPUT_TIMESTAMPED", "1"),
            ("RUN_INTERVAL_MINUTES", "60"),
        ]);
        assert_eq!(cfg.resolver, ResolverKind::Browser);
        assert_eq!(cfg.anchor_mode, AnchorMode::All);
        assert!(cfg.output_timestamped);
        assert_eq!(cfg.run_interval, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn oversized_interval_is_ignored_instead_of_overflowing() {
        let cfg = from_pairs(&[("RUN_INTERVAL_MINUTES", "400000000000000000")]);
        assert!(cfg.run_interval.is_none());

        let huge = u64::MAX.to_string();
        let cfg = from_pairs(&[("RUN_INTERVAL_MINUTES", huge.as_str())]);
        assert!(cfg.run_interval.is_none());

        let max = MAX_RUN_INTERVAL_MINUTES.to_string();
        let cfg = from_pairs(&[("RUN_INTERVAL_MINUTES", max.as_str())]);
        assert_eq!(
            cfg.run_interval,
            Some(Duration::from_secs(MAX_RUN_INTERVAL_MINUTES * 60))
        );
    }

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed = parse_dotenv("# comment\nA=1\nexport B=\"two\"\n\nC='three'\nnoequals\n");
        assert_eq!(
            parsed,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two".to_string()),
                ("C".to_string(), "three".to_string()),
            ]
        );
    }
}
