use crate::{
    alerter::Notifier,
    collector::{FetchError, SnapshotSource},
    diff::diff_snapshot,
    filter::ItemFilter,
    messages::{Breakdown, BreakdownScope, spotted_message, summary_message},
    models::{CycleReport, ItemRecord},
    seen::SeenSet,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Loop-level settings that are fixed for the lifetime of a [`Watcher`].
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Attribute keys the summary breakdown is grouped by.
    pub summary_group_keys: Vec<String>,
    pub breakdown: BreakdownScope,
    /// When false, the first successful cycle only seeds the seen set.
    pub notify_on_first_cycle: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(180),
            summary_group_keys: vec!["Badge".to_owned(), "isAutopilot".to_owned()],
            breakdown: BreakdownScope::NewItems,
            notify_on_first_cycle: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Running,
    Stopped,
}

/// Runs one snapshot through filter, diff and notifier, then folds it into
/// `seen`.
///
/// Per-item messages go out before the summary. A failed notification is
/// logged and counted; it never stops the remaining messages or the seen set
/// update. With `deliver` false the diff still runs but nothing is sent.
pub async fn process_snapshot(
    seen: &mut SeenSet,
    filter: &dyn ItemFilter,
    notifier: &impl Notifier,
    settings: &WatchSettings,
    snapshot: &[ItemRecord],
    deliver: bool,
) -> CycleReport {
    let matched = filter.matches(snapshot);
    info!(fetched = snapshot.len(), matched = matched.len(), "snapshot filtered");

    let diff = diff_snapshot(snapshot, &matched, seen);

    let mut messages = Vec::with_capacity(diff.new_matched.len() + 1);
    for item in &diff.new_matched {
        info!(identifier = %item.identifier, "spotted new matching item");
        messages.push(spotted_message(item));
    }

    if !diff.is_empty() {
        let breakdown = match settings.breakdown {
            BreakdownScope::NewItems => Breakdown::from_items(
                &settings.summary_group_keys,
                diff.new_overall.iter().copied(),
            ),
            BreakdownScope::Snapshot => {
                Breakdown::from_items(&settings.summary_group_keys, snapshot)
            }
        };
        let summary = summary_message(diff.new_overall.len(), &breakdown);
        info!("{summary}");
        messages.push(summary);
    }

    let mut report = CycleReport {
        fetched: snapshot.len(),
        matched: matched.len(),
        new_overall: diff.new_overall.len(),
        new_matched: diff.new_matched.len(),
        ..Default::default()
    };

    if deliver && notifier.delivers() {
        for message in &messages {
            match notifier.send(message).await {
                Ok(()) => report.notifications_sent += 1,
                Err(error) => {
                    report.notifications_failed += 1;
                    warn!(error = %error, "failed to deliver notification");
                }
            }
        }
    } else if !messages.is_empty() {
        report.notifications_skipped = messages.len();
        if deliver {
            debug!(skipped = messages.len(), "no notification transport, messages not sent");
        } else {
            info!(suppressed = messages.len(), "initial cycle, notifications suppressed");
        }
    }

    seen.update(snapshot);
    report.seen_total = seen.len();
    info!(seen_total = report.seen_total, "identifiers seen");

    report
}

/// Owns the seen set and drives fetch -> filter -> diff -> notify -> update
/// on a fixed interval until cancelled.
pub struct Watcher<S, N> {
    source: S,
    filter: Box<dyn ItemFilter>,
    notifier: N,
    settings: WatchSettings,
    seen: SeenSet,
    completed_cycles: u64,
    state: WatcherState,
}

impl<S, N> Watcher<S, N>
where
    S: SnapshotSource,
    N: Notifier,
{
    pub fn new(
        source: S,
        filter: Box<dyn ItemFilter>,
        notifier: N,
        settings: WatchSettings,
    ) -> Self {
        Self {
            source,
            filter,
            notifier,
            settings,
            seen: SeenSet::new(),
            completed_cycles: 0,
            state: WatcherState::Running,
        }
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Number of cycles whose snapshot was fetched and processed.
    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    /// Executes a single cycle. On a fetch failure nothing is sent and the
    /// seen set is left as it was.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, FetchError> {
        let snapshot = self.source.fetch().await?;
        let deliver = self.settings.notify_on_first_cycle || self.completed_cycles > 0;

        let report = process_snapshot(
            &mut self.seen,
            self.filter.as_ref(),
            &self.notifier,
            &self.settings,
            &snapshot,
            deliver,
        )
        .await;

        self.completed_cycles += 1;
        Ok(report)
    }

    /// Runs cycles until `cancel` fires. Cancellation is only observed
    /// between cycles: an in-flight cycle always runs to completion.
    pub async fn run(&mut self, cancel: &CancellationToken) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            "inventory watcher started"
        );

        while !cancel.is_cancelled() {
            match self.run_cycle().await {
                Ok(report) => debug!(?report, "cycle completed"),
                Err(error) => warn!(error = %error, "snapshot fetch failed, skipping cycle"),
            }

            debug!(sleep_secs = self.settings.interval.as_secs(), "sleeping until next cycle");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        self.state = WatcherState::Stopped;
        info!(
            cycles = self.completed_cycles,
            seen_total = self.seen.len(),
            "inventory watcher stopped"
        );
    }
}
