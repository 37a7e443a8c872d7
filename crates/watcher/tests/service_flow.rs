use invwatch_watcher::{
    AcceptAll, Alerter, BreakdownScope, FetchError, ItemRecord, Notifier, NotifyError, SeenSet,
    SnapshotSource, TrimFilter, WatchSettings, Watcher, WatcherState, parse_snapshot,
    process_snapshot,
};
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct MockNotifier {
    sent: Mutex<Vec<String>>,
    fail_containing: Option<&'static str>,
}

impl MockNotifier {
    fn failing_on(fragment: &'static str) -> Self {
        Self {
            fail_containing: Some(fragment),
            ..Default::default()
        }
    }

    fn messages(&self) -> Vec<String> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        if let Some(fragment) = self.fail_containing {
            if message.contains(fragment) {
                return Err(NotifyError::Rejected("mock failure".to_owned()));
            }
        }
        self.sent.lock().expect("lock").push(message.to_owned());
        Ok(())
    }
}

/// Replays scripted fetch results and cancels the watcher once the script
/// runs out.
struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<ItemRecord>, FetchError>>>,
    calls: AtomicUsize,
    cancel: CancellationToken,
}

impl ScriptedSource {
    fn new(
        script: Vec<Result<Vec<ItemRecord>, FetchError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            cancel,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<ItemRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().expect("lock");
        let next = script
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::UnexpectedShape("script exhausted".to_owned())));
        if script.is_empty() {
            self.cancel.cancel();
        }
        next
    }
}

fn items(body: Value) -> Vec<ItemRecord> {
    parse_snapshot(body, "id").expect("parse")
}

fn first_snapshot() -> Vec<ItemRecord> {
    items(json!([
        { "id": "A", "badge": "P85", "isAutopilot": true },
        { "id": "B", "badge": "70D", "isAutopilot": false },
    ]))
}

fn second_snapshot() -> Vec<ItemRecord> {
    items(json!([
        { "id": "A", "badge": "P85", "isAutopilot": true },
        { "id": "B", "badge": "70D", "isAutopilot": false },
        { "id": "C", "badge": "P85+", "isAutopilot": true },
    ]))
}

fn filter() -> TrimFilter {
    TrimFilter::new("badge", ["P85", "P85+"], "isAutopilot")
}

fn settings() -> WatchSettings {
    WatchSettings {
        interval: Duration::from_secs(60),
        summary_group_keys: vec!["badge".to_owned(), "isAutopilot".to_owned()],
        breakdown: BreakdownScope::NewItems,
        notify_on_first_cycle: true,
    }
}

#[tokio::test]
async fn first_cycle_reports_everything_as_new() {
    let notifier = MockNotifier::default();
    let mut seen = SeenSet::new();

    let report = process_snapshot(
        &mut seen,
        &filter(),
        &notifier,
        &settings(),
        &first_snapshot(),
        true,
    )
    .await;

    assert_eq!(report.new_overall, 2);
    assert_eq!(report.new_matched, 1);
    assert_eq!(report.notifications_sent, 2);
    assert_eq!(report.seen_total, 2);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("Spotted new: "));
    assert!(messages[0].contains("id: A"));
    assert_eq!(
        messages[1],
        "Added 2 new items: ```badge=70D isAutopilot=false: 1\nbadge=P85 isAutopilot=true: 1```"
    );
}

#[tokio::test]
async fn second_cycle_only_reports_the_new_identifier() {
    let notifier = MockNotifier::default();
    let mut seen = SeenSet::new();
    seen.update(&first_snapshot());

    let report = process_snapshot(
        &mut seen,
        &filter(),
        &notifier,
        &settings(),
        &second_snapshot(),
        true,
    )
    .await;

    assert_eq!(report.new_overall, 1);
    assert_eq!(report.new_matched, 1);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("id: C"));
    assert!(messages[1].starts_with("Added 1 new items: "));
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn unchanged_snapshot_sends_nothing() {
    let notifier = MockNotifier::default();
    let mut seen = SeenSet::new();
    seen.update(&second_snapshot());

    let report = process_snapshot(
        &mut seen,
        &filter(),
        &notifier,
        &settings(),
        &second_snapshot(),
        true,
    )
    .await;

    assert_eq!(report.new_overall, 0);
    assert_eq!(report.notifications_sent, 0);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn duplicate_identifiers_notify_once() {
    let notifier = MockNotifier::default();
    let mut seen = SeenSet::new();
    let snapshot = items(json!([
        { "id": "A", "badge": "P85", "isAutopilot": true },
        { "id": "A", "badge": "P85", "isAutopilot": true },
    ]));

    let report =
        process_snapshot(&mut seen, &filter(), &notifier, &settings(), &snapshot, true).await;

    assert_eq!(report.new_overall, 1);
    assert_eq!(report.new_matched, 1);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].starts_with("Added 1 new items: "));
}

#[tokio::test]
async fn failed_notification_does_not_stop_the_cycle() {
    let notifier = MockNotifier::failing_on("Spotted new");
    let mut seen = SeenSet::new();

    let report = process_snapshot(
        &mut seen,
        &filter(),
        &notifier,
        &settings(),
        &first_snapshot(),
        true,
    )
    .await;

    assert_eq!(report.notifications_failed, 1);
    assert_eq!(report.notifications_sent, 1);
    assert_eq!(seen.len(), 2);
    assert!(notifier.messages()[0].starts_with("Added 2 new items: "));
}

#[tokio::test]
async fn disabled_transport_counts_messages_as_skipped() {
    let mut seen = SeenSet::new();

    let report = process_snapshot(
        &mut seen,
        &filter(),
        &Alerter::Disabled,
        &settings(),
        &first_snapshot(),
        true,
    )
    .await;

    assert_eq!(report.new_overall, 2);
    assert_eq!(report.notifications_sent, 0);
    assert_eq!(report.notifications_failed, 0);
    assert_eq!(report.notifications_skipped, 2);
    assert_eq!(seen.len(), 2);
}

#[tokio::test]
async fn snapshot_breakdown_covers_the_whole_inventory() {
    let notifier = MockNotifier::default();
    let mut seen = SeenSet::new();
    seen.update(&first_snapshot());
    let settings = WatchSettings {
        breakdown: BreakdownScope::Snapshot,
        ..settings()
    };

    process_snapshot(
        &mut seen,
        &AcceptAll,
        &notifier,
        &settings,
        &second_snapshot(),
        true,
    )
    .await;

    let messages = notifier.messages();
    assert_eq!(
        messages.last().map(String::as_str),
        Some("Added 1 new items: ```badge=70D isAutopilot=false: 1\nbadge=P85 isAutopilot=true: 1\nbadge=P85+ isAutopilot=true: 1```")
    );
}

#[tokio::test(start_paused = true)]
async fn watcher_survives_fetch_failures_and_stops_between_cycles() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(
        vec![
            Ok(first_snapshot()),
            Err(FetchError::UnexpectedShape("boom".to_owned())),
            Ok(second_snapshot()),
            Ok(second_snapshot()),
        ],
        cancel.clone(),
    );
    let mut watcher = Watcher::new(
        source,
        Box::new(filter()),
        MockNotifier::default(),
        settings(),
    );

    watcher.run(&cancel).await;

    assert_eq!(watcher.state(), WatcherState::Stopped);
    assert_eq!(watcher.source().calls(), 4);
    assert_eq!(watcher.completed_cycles(), 3);
    assert_eq!(watcher.seen().len(), 3);

    let messages = watcher.notifier().messages();
    assert_eq!(messages.len(), 4);
    assert!(messages[0].contains("id: A"));
    assert!(messages[1].starts_with("Added 2 new items: "));
    assert!(messages[2].contains("id: C"));
    assert!(messages[3].starts_with("Added 1 new items: "));
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_leaves_seen_set_untouched() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(
        vec![Err(FetchError::UnexpectedShape("down".to_owned()))],
        cancel.clone(),
    );
    let mut watcher = Watcher::new(
        source,
        Box::new(filter()),
        MockNotifier::default(),
        settings(),
    );

    let err = watcher.run_cycle().await.expect_err("scripted failure");
    assert!(matches!(err, FetchError::UnexpectedShape(_)));
    assert!(watcher.seen().is_empty());
    assert!(watcher.notifier().messages().is_empty());
    assert_eq!(watcher.completed_cycles(), 0);
}

#[tokio::test(start_paused = true)]
async fn cycles_are_spaced_by_the_interval() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(
        vec![Ok(first_snapshot()), Ok(first_snapshot()), Ok(first_snapshot())],
        cancel.clone(),
    );
    let mut watcher = Watcher::new(
        source,
        Box::new(filter()),
        MockNotifier::default(),
        settings(),
    );

    let started = tokio::time::Instant::now();
    watcher.run(&cancel).await;

    assert_eq!(watcher.completed_cycles(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(120));
    assert!(elapsed < Duration::from_secs(121));
}

#[tokio::test(start_paused = true)]
async fn cold_start_suppression_seeds_without_notifying() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(
        vec![Ok(first_snapshot()), Ok(second_snapshot())],
        cancel.clone(),
    );
    let settings = WatchSettings {
        notify_on_first_cycle: false,
        ..settings()
    };
    let mut watcher = Watcher::new(source, Box::new(filter()), MockNotifier::default(), settings);

    watcher.run(&cancel).await;

    assert_eq!(watcher.seen().len(), 3);
    let messages = watcher.notifier().messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("id: C"));
    assert!(messages[1].starts_with("Added 1 new items: "));
}

#[tokio::test]
async fn cancelled_watcher_runs_no_cycle() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let source = ScriptedSource::new(vec![Ok(first_snapshot())], cancel.clone());
    let mut watcher = Watcher::new(
        source,
        Box::new(AcceptAll),
        MockNotifier::default(),
        settings(),
    );

    watcher.run(&cancel).await;

    assert_eq!(watcher.state(), WatcherState::Stopped);
    assert_eq!(watcher.source().calls(), 0);
}
