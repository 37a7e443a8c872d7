use std::path::PathBuf;

use clap::{ArgAction, Parser as ClapParser, ValueEnum};
use tracing::Level;
use url::Url;

#[allow(clippy::upper_case_acronyms)]
#[derive(ClapParser)]
#[command(
    name = "invwatch",
    version,
    about = "Polls an inventory listing and notifies about newly listed items"
)]
pub struct CLI {
    #[command(flatten)]
    pub opts: Options,
}

#[derive(ClapParser, Debug, Clone)]
pub struct Options {
    #[arg(
        long = "config",
        value_name = "CONFIG_FILE",
        help = "Path to a TOML configuration file.",
        long_help = "Values given on the command line take precedence over the file.",
        help_heading = "Watcher options",
        env = "INVWATCH_CONFIG"
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long = "endpoint.url",
        value_name = "URL",
        help = "Inventory endpoint returning a JSON array of items.",
        help_heading = "Watcher options",
        env = "INVWATCH_ENDPOINT_URL"
    )]
    pub endpoint_url: Option<Url>,
    #[arg(
        long = "endpoint.metro-id",
        value_name = "METRO_ID",
        help = "Restrict the listing to a metro area (sent as `metroId`).",
        help_heading = "Watcher options",
        env = "INVWATCH_METRO_ID"
    )]
    pub metro_id: Option<u32>,
    #[arg(
        long = "watch.interval",
        value_name = "SECONDS",
        help = "Seconds to sleep between polling cycles.",
        help_heading = "Watcher options",
        env = "INVWATCH_INTERVAL"
    )]
    pub interval_secs: Option<u64>,
    #[arg(
        long = "watch.quiet-start",
        action = ArgAction::SetTrue,
        help = "Seed the seen set on the first cycle without sending notifications.",
        help_heading = "Watcher options",
        env = "INVWATCH_QUIET_START"
    )]
    pub quiet_start: bool,
    #[arg(
        long = "notify.webhook-url",
        alias = "slack-webhook",
        value_name = "URL",
        help = "Incoming webhook URL; messages are posted as {\"text\": ...}.",
        help_heading = "Notification options",
        env = "INVWATCH_WEBHOOK_URL"
    )]
    pub webhook_url: Option<String>,
    #[arg(
        long = "notify.chat-token",
        value_name = "TOKEN",
        help = "Bearer token for the chat API transport.",
        help_heading = "Notification options",
        env = "INVWATCH_CHAT_TOKEN",
        hide_env_values = true
    )]
    pub chat_token: Option<String>,
    #[arg(
        long = "notify.chat-channel",
        value_name = "CHANNEL",
        help = "Channel the chat API transport posts to.",
        help_heading = "Notification options",
        env = "INVWATCH_CHAT_CHANNEL"
    )]
    pub chat_channel: Option<String>,
    #[arg(
        long = "notify.chat-username",
        value_name = "USERNAME",
        help = "Display name used by the chat API transport.",
        help_heading = "Notification options",
        env = "INVWATCH_CHAT_USERNAME"
    )]
    pub chat_username: Option<String>,
    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        env = "INVWATCH_LOG_LEVEL",
        help = "The verbosity level used for logs.",
        long_help = "Possible values: info, debug, trace, warn, error",
        help_heading = "Log options"
    )]
    pub log_level: Level,
    #[arg(
        long = "log.color",
        value_enum,
        ignore_case = true,
        default_value_t = LogColor::Auto,
        help = "Output logs with ANSI color codes.",
        help_heading = "Log options",
        env = "INVWATCH_LOG_COLOR"
    )]
    pub log_color: LogColor,
}

/// When log lines carry ANSI colour codes. `auto` colours only a terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogColor {
    #[default]
    Auto,
    Always,
    Never,
}
