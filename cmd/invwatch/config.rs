//! TOML configuration for the `invwatch` binary.
//!
//! Every section is optional; missing values fall back to the classic setup
//! (used Model S listing, P85/P85+ with autopilot, three minute interval).
//!
//! ```toml
//! [endpoint]
//! url = "https://www.tesla.com/cpo_tool/ajax"
//! metro_id = 3
//!
//! [endpoint.query]
//! model = "MODEL_S"
//! country = "US"
//!
//! [watch]
//! interval_secs = 120
//! summary_group_keys = ["Badge", "isAutopilot"]
//!
//! [filter]
//! kind = "trim"
//! allowed_badges = ["P85", "P85+", "P90D"]
//!
//! [notify]
//! webhook_url = "https://hooks.slack.com/services/T000/B000/XXXX"
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    time::Duration,
};

use invwatch_watcher::{BreakdownScope, WatchSettings, alerter::DEFAULT_CHAT_API_URL};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::cli::Options;

pub const DEFAULT_ENDPOINT_URL: &str = "https://www.tesla.com/cpo_tool/ajax";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid url in {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration, loadable from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvwatchConfig {
    pub endpoint: EndpointConfig,
    pub watch: WatchConfig,
    pub filter: FilterConfig,
    pub notify: NotifyConfig,
}

/// Remote inventory listing to poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    /// Query parameters appended to `url`. When unset, only the built-in
    /// listing url gets its classic query.
    pub query: Option<BTreeMap<String, String>>,
    /// Optional metro area, sent as `metroId`.
    pub metro_id: Option<u32>,
    /// Per-request timeout (default: 30).
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.to_owned(),
            query: None,
            metro_id: None,
            timeout_secs: 30,
        }
    }
}

fn default_listing_query() -> BTreeMap<String, String> {
    [
        ("exteriors", ""),
        ("model", "MODEL_S"),
        ("priceRange", "0,150000"),
        ("sort", "featured|asc"),
        ("titleStatus", "used"),
        ("country", "US"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect()
}

impl EndpointConfig {
    /// Query table in effect: the configured one, else the classic listing
    /// query for the built-in url, else nothing.
    pub fn effective_query(&self) -> BTreeMap<String, String> {
        match &self.query {
            Some(query) => query.clone(),
            None if self.url == DEFAULT_ENDPOINT_URL => default_listing_query(),
            None => BTreeMap::new(),
        }
    }

    /// Full request URL: base url plus the query table plus `metroId`.
    /// Keys already present in the url's own query string are kept as given.
    pub fn request_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            field: "endpoint.url",
            source,
        })?;
        let existing: BTreeSet<String> =
            url.query_pairs().map(|(key, _)| key.into_owned()).collect();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in self.effective_query() {
                if !existing.contains(&key) {
                    pairs.append_pair(&key, &value);
                }
            }
            if let Some(metro_id) = self.metro_id.filter(|_| !existing.contains("metroId")) {
                pairs.append_pair("metroId", &metro_id.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Loop behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between cycles (default: 180).
    pub interval_secs: u64,
    /// Attribute holding the stable item identifier (default: "Vin").
    pub identifier_key: String,
    pub summary_group_keys: Vec<String>,
    /// "new" groups only new items, "snapshot" the whole listing.
    pub breakdown: BreakdownScope,
    pub notify_on_first_cycle: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let settings = WatchSettings::default();
        Self {
            interval_secs: settings.interval.as_secs(),
            identifier_key: "Vin".to_owned(),
            summary_group_keys: settings.summary_group_keys,
            breakdown: settings.breakdown,
            notify_on_first_cycle: settings.notify_on_first_cycle,
        }
    }
}

impl WatchConfig {
    pub fn to_settings(&self) -> WatchSettings {
        WatchSettings {
            interval: Duration::from_secs(self.interval_secs),
            summary_group_keys: self.summary_group_keys.clone(),
            breakdown: self.breakdown,
            notify_on_first_cycle: self.notify_on_first_cycle,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Trim,
    All,
}

/// Filter predicate selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub kind: FilterKind,
    pub badge_key: String,
    pub allowed_badges: Vec<String>,
    pub flag_key: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::Trim,
            badge_key: "Badge".to_owned(),
            allowed_badges: vec!["P85".to_owned(), "P85+".to_owned()],
            flag_key: "isAutopilot".to_owned(),
        }
    }
}

/// Notification transport credentials. At most one transport may be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub chat_token: Option<String>,
    pub chat_channel: Option<String>,
    pub chat_username: String,
    pub chat_api_url: String,
    /// Per-request timeout (default: 10).
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            chat_token: None,
            chat_channel: None,
            chat_username: "invwatch".to_owned(),
            chat_api_url: DEFAULT_CHAT_API_URL.to_owned(),
            timeout_secs: 10,
        }
    }
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl InvwatchConfig {
    /// Checks value ranges and the transport credential combination.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint.request_url()?;
        if self.endpoint.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "endpoint.timeout_secs must be > 0".to_owned(),
            ));
        }
        if self.watch.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "watch.interval_secs must be > 0".to_owned(),
            ));
        }
        if self.watch.identifier_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "watch.identifier_key must not be empty".to_owned(),
            ));
        }
        if self.filter.kind == FilterKind::Trim && self.filter.allowed_badges.is_empty() {
            return Err(ConfigError::Invalid(
                "filter.allowed_badges must not be empty for the trim filter".to_owned(),
            ));
        }

        let notify = &self.notify;
        if notify.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "notify.timeout_secs must be > 0".to_owned(),
            ));
        }
        match (&notify.webhook_url, &notify.chat_token) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "notify.webhook_url and notify.chat_token are mutually exclusive".to_owned(),
                ));
            }
            (Some(webhook_url), None) => {
                Url::parse(webhook_url).map_err(|source| ConfigError::InvalidUrl {
                    field: "notify.webhook_url",
                    source,
                })?;
            }
            (None, Some(_)) => {
                if notify
                    .chat_channel
                    .as_deref()
                    .is_none_or(|channel| channel.trim().is_empty())
                {
                    return Err(ConfigError::Invalid(
                        "notify.chat_channel is required when notify.chat_token is set".to_owned(),
                    ));
                }
                Url::parse(&notify.chat_api_url).map_err(|source| ConfigError::InvalidUrl {
                    field: "notify.chat_api_url",
                    source,
                })?;
            }
            (None, None) => {}
        }
        Ok(())
    }
}

/// Loads the config from an optional TOML file path.
///
/// If `path` is `None`, returns the default config. The result is not
/// validated yet; call [`InvwatchConfig::validate`] after merging overrides.
pub fn load_config(path: Option<&Path>) -> Result<InvwatchConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(InvwatchConfig::default());
    };

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Merges CLI overrides into a loaded (or default) config.
///
/// CLI flags take precedence over TOML values.
pub fn merge_cli_overrides(config: &InvwatchConfig, opts: &Options) -> InvwatchConfig {
    let mut merged = config.clone();

    if let Some(url) = &opts.endpoint_url {
        merged.endpoint.url = url.to_string();
    }
    if let Some(metro_id) = opts.metro_id {
        merged.endpoint.metro_id = Some(metro_id);
    }
    if let Some(interval_secs) = opts.interval_secs {
        merged.watch.interval_secs = interval_secs;
    }
    if opts.quiet_start {
        merged.watch.notify_on_first_cycle = false;
    }
    if let Some(webhook_url) = &opts.webhook_url {
        merged.notify.webhook_url = Some(webhook_url.clone());
    }
    if let Some(token) = &opts.chat_token {
        merged.notify.chat_token = Some(token.clone());
    }
    if let Some(channel) = &opts.chat_channel {
        merged.notify.chat_channel = Some(channel.clone());
    }
    if let Some(username) = &opts.chat_username {
        merged.notify.chat_username = username.clone();
    }

    merged
}
