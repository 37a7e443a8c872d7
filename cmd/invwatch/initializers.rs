use std::io::IsTerminal;

use invwatch_watcher::{
    AcceptAll, Alerter, ChatApiAlerter, InventoryCollector, ItemFilter, TrimFilter, WatchSettings,
    WebhookAlerter,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::Directive, fmt, layer::SubscriberExt};
use url::Url;

use crate::{
    cli::{LogColor, Options},
    config::{ConfigError, FilterKind, InvwatchConfig},
};

pub fn init_tracing(opts: &Options) {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    let use_color = match opts.log_color {
        LogColor::Always => true,
        LogColor::Never => false,
        LogColor::Auto => std::io::stdout().is_terminal(),
    };

    let include_target = matches!(opts.log_level, Level::DEBUG | Level::TRACE);

    let fmt_layer = fmt::layer()
        .with_target(include_target)
        .with_ansi(use_color);

    let subscriber = Registry::default().with(fmt_layer.with_filter(log_filter));

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("a global tracing subscriber was already installed");
    }
}

pub fn init_collector(config: &InvwatchConfig) -> Result<InventoryCollector, ConfigError> {
    let endpoint = config.endpoint.request_url()?;
    info!(endpoint = %endpoint, "polling inventory endpoint");
    Ok(InventoryCollector::new(
        endpoint,
        config.watch.identifier_key.clone(),
        config.endpoint.timeout(),
    ))
}

pub fn init_filter(config: &InvwatchConfig) -> Box<dyn ItemFilter> {
    let filter = &config.filter;
    match filter.kind {
        FilterKind::All => Box::new(AcceptAll),
        FilterKind::Trim => Box::new(TrimFilter::new(
            filter.badge_key.clone(),
            filter.allowed_badges.iter().cloned(),
            filter.flag_key.clone(),
        )),
    }
}

/// Picks the notification transport. Expects a validated config, where at
/// most one of webhook url and chat token is set.
pub fn init_alerter(config: &InvwatchConfig) -> Result<Alerter, ConfigError> {
    let notify = &config.notify;

    let alerter = match (&notify.webhook_url, &notify.chat_token, &notify.chat_channel) {
        (Some(webhook_url), _, _) => {
            let url = Url::parse(webhook_url).map_err(|source| ConfigError::InvalidUrl {
                field: "notify.webhook_url",
                source,
            })?;
            Alerter::Webhook(WebhookAlerter::new(url, notify.timeout()))
        }
        (None, Some(token), Some(channel)) => {
            let api_url =
                Url::parse(&notify.chat_api_url).map_err(|source| ConfigError::InvalidUrl {
                    field: "notify.chat_api_url",
                    source,
                })?;
            Alerter::ChatApi(ChatApiAlerter::new(
                api_url,
                token.clone(),
                channel.clone(),
                notify.chat_username.clone(),
                notify.timeout(),
            ))
        }
        (None, Some(_), None) => {
            return Err(ConfigError::Invalid(
                "notify.chat_channel is required when notify.chat_token is set".to_owned(),
            ));
        }
        (None, None, _) => Alerter::Disabled,
    };

    if alerter.is_enabled() {
        info!(transport = alerter.transport_name(), "notifications enabled");
    } else {
        warn!("no notification transport configured, new items will only be logged");
    }
    Ok(alerter)
}

pub fn watch_settings(config: &InvwatchConfig) -> WatchSettings {
    config.watch.to_settings()
}

/// Cancels `cancel` on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
        _ = cancel.cancelled() => {}
    }
    cancel.cancel();
}
