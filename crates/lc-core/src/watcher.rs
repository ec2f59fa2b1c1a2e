//! Change watcher.
//!
//! Tracks structural-insertion notifications from the host page and turns
//! them into debounced trim requests. Observation binds to the chat
//! container when present and falls back to the whole document, retrying
//! container acquisition on a fixed interval until found or stopped.

use crate::page::{HostPage, ObserveTarget};
use crate::time::{earliest, Debounce, Millis, RetryTimer};

/// Container acquisition poll interval.
pub const CONTAINER_RETRY_MS: Millis = 1000;

/// What a watcher tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherFire {
    None,
    /// The debounce window elapsed; run a trim pass now.
    TrimDue,
}

/// Observation + debounce state. All timer fields are explicit so the
/// watcher can be stepped in tests without a real event loop.
#[derive(Debug)]
pub struct ChangeWatcher {
    observing: Option<ObserveTarget>,
    debounce: Debounce,
    retry: RetryTimer,
}

impl ChangeWatcher {
    pub fn new(debounce_window_ms: Millis) -> Self {
        Self {
            observing: None,
            debounce: Debounce::new(debounce_window_ms),
            retry: RetryTimer::new(CONTAINER_RETRY_MS),
        }
    }

    /// Begin observing. Idempotent; while only the whole-document fallback
    /// is available, arms the container retry poll.
    pub fn start<P: HostPage>(&mut self, page: &mut P, now: Millis) {
        if self.observing.is_some() {
            return;
        }
        let target = page.acquire_container();
        if target == ObserveTarget::WholeDocument {
            log::warn!("chat container not found, observing whole document and retrying");
            self.retry.arm(now);
        }
        self.observing = Some(target);
    }

    /// Stop observing and drop any pending work. Idempotent, safe when
    /// never started.
    pub fn stop<P: HostPage>(&mut self, page: &mut P) {
        if self.observing.take().is_some() {
            page.release_container();
        }
        self.debounce.cancel();
        self.retry.cancel();
    }

    /// A structural insertion batch arrived. When at least one inserted node
    /// matched the turn predicate, (re)arm the debounce window.
    pub fn on_insertions(&mut self, matched: bool, now: Millis) {
        if self.observing.is_none() || !matched {
            return;
        }
        self.debounce.trigger(now);
    }

    /// Fire due timers: re-attempt container acquisition while falling back,
    /// and report when the debounced trim pass is due.
    pub fn tick<P: HostPage>(&mut self, page: &mut P, now: Millis) -> WatcherFire {
        if self.observing.is_none() {
            return WatcherFire::None;
        }

        if self.retry.fire(now) {
            match page.acquire_container() {
                ObserveTarget::Container => {
                    log::debug!("chat container acquired");
                    self.retry.cancel();
                    self.observing = Some(ObserveTarget::Container);
                }
                ObserveTarget::WholeDocument => {
                    // Retry timer re-armed itself; keep falling back.
                }
            }
        }

        if self.debounce.fire(now) {
            WatcherFire::TrimDue
        } else {
            WatcherFire::None
        }
    }

    pub fn set_debounce_window(&mut self, window_ms: Millis) {
        self.debounce.set_window(window_ms);
    }

    pub fn is_observing(&self) -> bool {
        self.observing.is_some()
    }

    pub fn observe_target(&self) -> Option<ObserveTarget> {
        self.observing
    }

    pub fn trim_pending(&self) -> bool {
        self.debounce.pending()
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        earliest(&[self.debounce.deadline(), self.retry.deadline()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemoryPage;

    #[test]
    fn repeated_insertions_collapse_into_one_fire() {
        let mut page = MemoryPage::new();
        let mut watcher = ChangeWatcher::new(500);
        watcher.start(&mut page, 0);

        for i in 0..5 {
            watcher.on_insertions(true, i * 100);
        }
        // Last trigger at 400 -> due at 900.
        assert_eq!(watcher.tick(&mut page, 800), WatcherFire::None);
        assert_eq!(watcher.tick(&mut page, 900), WatcherFire::TrimDue);
        assert_eq!(watcher.tick(&mut page, 1400), WatcherFire::None);
    }

    #[test]
    fn non_matching_insertions_are_ignored() {
        let mut page = MemoryPage::new();
        let mut watcher = ChangeWatcher::new(500);
        watcher.start(&mut page, 0);
        watcher.on_insertions(false, 100);
        assert!(!watcher.trim_pending());
    }

    #[test]
    fn insertions_before_start_are_ignored() {
        let mut watcher = ChangeWatcher::new(500);
        watcher.on_insertions(true, 100);
        assert!(!watcher.trim_pending());
    }

    #[test]
    fn stop_cancels_pending_fire() {
        let mut page = MemoryPage::new();
        let mut watcher = ChangeWatcher::new(500);
        watcher.start(&mut page, 0);
        watcher.on_insertions(true, 100);
        watcher.stop(&mut page);
        assert!(!watcher.is_observing());
        assert_eq!(page.observed(), None);
        assert_eq!(watcher.tick(&mut page, 10_000), WatcherFire::None);
    }

    #[test]
    fn stop_is_safe_when_never_started() {
        let mut page = MemoryPage::new();
        let mut watcher = ChangeWatcher::new(500);
        watcher.stop(&mut page);
        watcher.stop(&mut page);
        assert!(!watcher.is_observing());
    }

    #[test]
    fn container_retry_until_acquired() {
        let mut page = MemoryPage::new();
        page.set_container_available(false);
        let mut watcher = ChangeWatcher::new(500);
        watcher.start(&mut page, 0);
        assert_eq!(watcher.observe_target(), Some(ObserveTarget::WholeDocument));

        // Still absent at the first poll: keeps falling back.
        watcher.tick(&mut page, CONTAINER_RETRY_MS);
        assert_eq!(watcher.observe_target(), Some(ObserveTarget::WholeDocument));

        page.set_container_available(true);
        watcher.tick(&mut page, CONTAINER_RETRY_MS * 2);
        assert_eq!(watcher.observe_target(), Some(ObserveTarget::Container));
        // Acquisition cancels the poll.
        assert_eq!(watcher.next_deadline(), None);
    }

    #[test]
    fn start_is_idempotent() {
        let mut page = MemoryPage::new();
        let mut watcher = ChangeWatcher::new(500);
        watcher.start(&mut page, 0);
        watcher.on_insertions(true, 10);
        watcher.start(&mut page, 20);
        assert!(watcher.trim_pending(), "restart must not drop pending work");
    }
}
