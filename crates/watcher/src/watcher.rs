use crate::debounce::DebounceState;
use crate::rules::detect_page;
use crate::{PageContext, Result, WatcherError};
use log::{debug, info, warn};
use radar_page::{PageTree, TreeMutation};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Quiet period after the last signal before a page is classified.
    pub debounce: Duration,
    /// Upper bound on how long continuous mutation can postpone classification.
    pub max_wait: Duration,
    /// Fallback poll for changes the mutation stream misses.
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            max_wait: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
        }
    }
}

enum WatcherCommand {
    Rescan,
    Shutdown,
}

struct RunningWatch {
    command_tx: mpsc::Sender<WatcherCommand>,
    task: JoinHandle<()>,
}

/// Single-consumer stream of detected navigations. Only the latest value is kept.
#[derive(Debug)]
pub struct PageContextStream {
    rx: watch::Receiver<Option<PageContext>>,
}

impl PageContextStream {
    /// Next navigation, or `None` once the watcher that produced the stream stopped.
    pub async fn next(&mut self) -> Option<PageContext> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let latest = self.rx.borrow_and_update().clone();
            if latest.is_some() {
                return latest;
            }
        }
    }
}

/// Turns a continuously mutating page into discrete [`PageContext`] values.
///
/// Two mechanisms feed the same debounce: the tree's mutation stream and a
/// low-frequency poll of the page URL. A signal only counts when the URL
/// differs from the last emitted context.
pub struct NavigationWatcher {
    tree: Arc<dyn PageTree>,
    config: WatcherConfig,
    running: Option<RunningWatch>,
}

impl NavigationWatcher {
    pub fn new(tree: Arc<dyn PageTree>, config: WatcherConfig) -> Self {
        Self {
            tree,
            config,
            running: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> WatcherConfig {
        self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Starts watching, tearing down any previous run first.
    pub fn start(&mut self) -> Result<PageContextStream> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;
        self.stop();

        let (command_tx, command_rx) = mpsc::channel(16);
        let (context_tx, context_rx) = watch::channel(None);
        // Subscribe before spawning so no mutation between start and the first poll is lost.
        let mutations = self.tree.subscribe();

        let task = runtime.spawn(run_watch_loop(
            self.tree.clone(),
            self.config,
            mutations,
            command_rx,
            context_tx,
        ));
        self.running = Some(RunningWatch { command_tx, task });
        info!("Navigation watcher started at {}", self.tree.url());
        Ok(PageContextStream { rx: context_rx })
    }

    /// Detaches the observer and the poll and cancels pending timers. Idempotent.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.command_tx.try_send(WatcherCommand::Shutdown);
        running.task.abort();
        debug!("Navigation watcher stopped");
    }

    /// Classifies the current page immediately, even if its URL did not change.
    pub async fn rescan(&self) -> Result<()> {
        let running = self.running.as_ref().ok_or(WatcherError::NotRunning)?;
        running
            .command_tx
            .send(WatcherCommand::Rescan)
            .await
            .map_err(|_| WatcherError::NotRunning)
    }
}

impl Drop for NavigationWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_watch_loop(
    tree: Arc<dyn PageTree>,
    config: WatcherConfig,
    mut mutations: broadcast::Receiver<TreeMutation>,
    mut command_rx: mpsc::Receiver<WatcherCommand>,
    context_tx: watch::Sender<Option<PageContext>>,
) {
    let mut state = DebounceState::new(config.debounce, config.max_wait);
    let mut poll = time::interval(config.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_url: Option<String> = None;
    let mut observing = true;

    loop {
        let next_deadline = state.next_deadline();

        tokio::select! {
            received = mutations.recv(), if observing => {
                match received {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        note_signal(tree.as_ref(), last_url.as_deref(), &mut state);
                    }
                    Err(RecvError::Closed) => {
                        warn!("Page mutation stream closed; relying on polling");
                        observing = false;
                    }
                }
            }
            _ = poll.tick() => {
                note_signal(tree.as_ref(), last_url.as_deref(), &mut state);
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(WatcherCommand::Rescan) => state.force_run(tree.url()),
                    Some(WatcherCommand::Shutdown) | None => break,
                }
            }
            () = async {
                if let Some(deadline) = next_deadline {
                    time::sleep_until(deadline).await;
                }
            }, if state.should_run() && next_deadline.is_some() => {
                let forced = state.forced();
                let signals = state.signals();
                state.reset();

                let url = tree.url();
                if !forced && last_url.as_deref() == Some(url.as_str()) {
                    debug!("Navigation settled back on {url}; nothing to emit");
                    continue;
                }
                let context = detect_page(tree.as_ref());
                debug!(
                    "Detected {} page at {} after {signals} signal(s)",
                    context.page_type, context.url
                );
                last_url = Some(context.url.clone());
                if context_tx.send(Some(context)).is_err() {
                    debug!("Page context consumer dropped; stopping watcher");
                    break;
                }
            }
        }
    }
}

fn note_signal(tree: &dyn PageTree, last_url: Option<&str>, state: &mut DebounceState) {
    let url = tree.url();
    if last_url == Some(url.as_str()) {
        return;
    }
    if state.pending_url() != Some(url.as_str()) {
        debug!("URL change observed: {url}");
    }
    state.record_signal(url);
}
