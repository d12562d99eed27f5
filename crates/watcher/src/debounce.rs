use std::time::Duration;
use tokio::time::Instant;

/// Coalesces bursts of change signals into a single detection pass.
///
/// Every signal restarts the quiet period; `max_wait` bounds how long a
/// continuous burst can postpone the pass.
#[derive(Debug)]
pub(crate) struct DebounceState {
    debounce: Duration,
    max_wait: Duration,
    dirty: bool,
    signals: usize,
    first_signal: Option<Instant>,
    last_signal: Option<Instant>,
    pending_url: Option<String>,
    force_immediate: bool,
}

impl DebounceState {
    pub(crate) fn new(debounce: Duration, max_wait: Duration) -> Self {
        Self {
            debounce,
            max_wait: max_wait.max(debounce),
            dirty: false,
            signals: 0,
            first_signal: None,
            last_signal: None,
            pending_url: None,
            force_immediate: false,
        }
    }

    pub(crate) fn record_signal(&mut self, url: String) {
        let now = Instant::now();
        self.signals += 1;
        self.pending_url = Some(url);
        self.last_signal = Some(now);
        self.first_signal.get_or_insert(now);
        self.dirty = true;
    }

    pub(crate) fn force_run(&mut self, url: String) {
        self.signals += 1;
        self.pending_url = Some(url);
        self.force_immediate = true;
        self.dirty = true;
    }

    pub(crate) const fn should_run(&self) -> bool {
        self.dirty
    }

    pub(crate) const fn forced(&self) -> bool {
        self.force_immediate
    }

    pub(crate) const fn signals(&self) -> usize {
        self.signals
    }

    pub(crate) fn pending_url(&self) -> Option<&str> {
        self.pending_url.as_deref()
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        if self.force_immediate {
            return Some(Instant::now());
        }

        let quiet = self.last_signal.map(|last| last + self.debounce);
        let capped = self.first_signal.map(|first| first + self.max_wait);
        match (quiet, capped) {
            (Some(quiet), Some(capped)) => Some(quiet.min(capped)),
            (quiet, capped) => quiet.or(capped),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.dirty = false;
        self.signals = 0;
        self.first_signal = None;
        self.last_signal = None;
        self.pending_url = None;
        self.force_immediate = false;
    }
}

#[cfg(test)]
mod tests {
    use super::DebounceState;
    use std::time::Duration;
    use tokio::time::{self, Instant};

    #[tokio::test(start_paused = true)]
    async fn each_signal_restarts_the_quiet_period() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        state.record_signal("a".to_string());
        let first = state.next_deadline().expect("deadline");

        time::advance(Duration::from_millis(60)).await;
        state.record_signal("a".to_string());
        let second = state.next_deadline().expect("deadline");

        assert!(second > first);
        assert_eq!(second, Instant::now() + Duration::from_millis(100));
        assert_eq!(state.signals(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_signals_are_capped_by_max_wait() {
        let start = Instant::now();
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_millis(300));
        for _ in 0..10 {
            state.record_signal("b".to_string());
            time::advance(Duration::from_millis(50)).await;
        }
        assert_eq!(
            state.next_deadline(),
            Some(start + Duration::from_millis(300))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn force_run_sets_immediate_deadline() {
        let mut state = DebounceState::new(Duration::from_secs(5), Duration::from_secs(10));
        state.force_run("c".to_string());
        assert!(state.should_run());
        assert!(state.forced());
        assert_eq!(state.next_deadline(), Some(Instant::now()));
    }

    #[test]
    fn reset_clears_pending_work() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        state.force_run("d".to_string());
        state.reset();
        assert!(!state.should_run());
        assert!(state.next_deadline().is_none());
        assert!(state.pending_url().is_none());
    }
}
