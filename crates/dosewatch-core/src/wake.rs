//! Scoped stay-awake holds around alarm dispatch.
//!
//! Wall-clock timers can fire while the surrounding process is otherwise
//! suspended, so every dispatch runs inside a bounded wake-hold. The hold
//! is a guard value: dropping it releases the resource on every exit path,
//! including early returns and panics unwinding through the handler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on how long a single dispatch may keep the process awake.
pub const DISPATCH_HOLD_MAX: Duration = Duration::from_secs(30);

/// Source of stay-awake holds.
///
/// `max` bounds the hold: platform implementations force-release after
/// it elapses even if the guard leaks.
pub trait WakeSource: Send + Sync {
    fn hold(&self, tag: &str, max: Duration) -> WakeHold;
}

/// RAII wake-hold; releases on drop.
pub struct WakeHold {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl WakeHold {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A hold over nothing, for targets without suspend semantics.
    pub fn unheld() -> Self {
        Self { release: None }
    }
}

impl Drop for WakeHold {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// No-op source for hosts that never suspend.
#[derive(Debug, Default)]
pub struct NoopWake;

impl WakeSource for NoopWake {
    fn hold(&self, _tag: &str, _max: Duration) -> WakeHold {
        WakeHold::unheld()
    }
}

/// Counts live holds; lets tests assert that every dispatch released.
#[derive(Debug, Default)]
pub struct CountingWake {
    active: Arc<AtomicUsize>,
}

impl CountingWake {
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl WakeSource for CountingWake {
    fn hold(&self, _tag: &str, _max: Duration) -> WakeHold {
        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::SeqCst);
        WakeHold::new(move || {
            active.fetch_sub(1, Ordering::SeqCst);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_releases_on_scope_exit() {
        let wake = CountingWake::default();
        {
            let _hold = wake.hold("test", DISPATCH_HOLD_MAX);
            assert_eq!(wake.active(), 1);
        }
        assert_eq!(wake.active(), 0);
    }

    #[test]
    fn hold_releases_on_early_return() {
        fn guarded(wake: &CountingWake, bail: bool) -> bool {
            let _hold = wake.hold("test", DISPATCH_HOLD_MAX);
            if bail {
                return false;
            }
            true
        }

        let wake = CountingWake::default();
        assert!(!guarded(&wake, true));
        assert_eq!(wake.active(), 0);
        assert!(guarded(&wake, false));
        assert_eq!(wake.active(), 0);
    }

    #[test]
    fn nested_holds_count_independently() {
        let wake = CountingWake::default();
        let a = wake.hold("a", DISPATCH_HOLD_MAX);
        let b = wake.hold("b", DISPATCH_HOLD_MAX);
        assert_eq!(wake.active(), 2);
        drop(a);
        assert_eq!(wake.active(), 1);
        drop(b);
        assert_eq!(wake.active(), 0);
    }
}
