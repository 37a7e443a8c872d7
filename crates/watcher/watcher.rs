//! # invwatch watcher
//!
//! Poll-diff-notify loop for remote inventory listings.
//!
//! ## Overview
//!
//! Every cycle the [`Watcher`] pulls one snapshot from a [`SnapshotSource`],
//! narrows it with an [`ItemFilter`], diffs it against the identifiers it has
//! already seen and hands the resulting messages to a [`Notifier`].
//!
//! ```text
//! 1. fetch snapshot            (collector)
//! 2. apply filter predicate    (filter)
//! 3. diff against seen set     (diff, seen)
//! 4. send spotted + summary    (messages, alerter)
//! 5. fold snapshot into seen   (seen)
//! 6. sleep until next cycle or shutdown
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use invwatch_watcher::{Alerter, InventoryCollector, TrimFilter, Watcher, WatchSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut watcher = Watcher::new(
//!     collector,
//!     Box::new(TrimFilter::default()),
//!     Alerter::Disabled,
//!     WatchSettings::default(),
//! );
//! watcher.run(&CancellationToken::new()).await;
//! ```

pub mod alerter;
pub mod collector;
pub mod diff;
pub mod filter;
pub mod messages;
pub mod models;
pub mod seen;
pub mod service;

pub use alerter::{Alerter, ChatApiAlerter, Notifier, NotifyError, WebhookAlerter};
pub use collector::{FetchError, InventoryCollector, SnapshotSource, parse_snapshot};
pub use diff::{SnapshotDiff, diff_snapshot};
pub use filter::{AcceptAll, ItemFilter, TrimFilter};
pub use messages::{Breakdown, BreakdownScope};
pub use models::{CycleReport, ItemRecord};
pub use seen::SeenSet;
pub use service::{WatchSettings, Watcher, WatcherState, process_snapshot};

use std::time::Duration;

/// Builds the shared HTTP client used by the collector and the alerters.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    build_client(
        reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("invwatch/", env!("CARGO_PKG_VERSION"))),
    )
}

/// Falls back to a default client, which carries no request timeout, if the
/// builder rejects its settings.
fn build_client(builder: reqwest::ClientBuilder) -> reqwest::Client {
    builder.build().unwrap_or_else(|error| {
        tracing::warn!(
            error = %error,
            "failed to build http client, falling back to a client without request timeout"
        );
        reqwest::Client::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_builder_settings_fall_back_to_default_client() {
        let client = build_client(reqwest::Client::builder().user_agent("invwatch\n"));
        assert!(client.get("http://127.0.0.1/").build().is_ok());
    }

    #[test]
    fn shared_client_builds_with_timeout() {
        let client = http_client(Duration::from_secs(5));
        assert!(client.get("http://127.0.0.1/").build().is_ok());
    }
}
