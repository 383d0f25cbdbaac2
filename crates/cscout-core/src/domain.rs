/// Channel message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i64);

/// Where bot notifications go: a numeric chat id or a public `@username`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl ChatTarget {
    /// Parse a `TELEGRAM_CHAT_ID` style value. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Some(Self::Id(id));
        }
        let name = raw.trim_start_matches('@');
        if name.is_empty() {
            return None;
        }
        Some(Self::Username(format!("@{name}")))
    }
}

impl std::fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{id}"),
            ChatTarget::Username(name) => f.write_str(name),
        }
    }
}

/// URL-bearing span attached to a message by the platform.
///
/// Offsets and lengths are in UTF-16 code units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEntity {
    /// Bare URL typed into the message text.
    Url { offset: usize, length: usize },
    /// Text rendered as a hyperlink to `url`.
    TextUrl {
        offset: usize,
        length: usize,
        url: String,
    },
}

/// A channel post as seen by the reader. Only `id` outlives a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub text: String,
    pub entities: Vec<LinkEntity>,
}

impl ChannelMessage {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id: MessageId(id),
            text: text.into(),
            entities: Vec::new(),
        }
    }

    pub fn with_entities(mut self, entities: Vec<LinkEntity>) -> Self {
        self.entities = entities;
        self
    }
}

/// What a navigator observed on one aggregator page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageVisit {
    /// URL after redirects.
    pub final_url: String,
    /// Matching hrefs in document order.
    pub hrefs: Vec<String>,
}

/// How many target anchors to keep per page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnchorMode {
    #[default]
    First,
    All,
}
