#[cfg(test)]
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};

type Waker = Box<dyn Fn() + Send + Sync>;

/// What woke the frame loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    pub render: bool,
    pub dispatch: bool,
}

impl Wake {
    pub fn any(&self) -> bool {
        self.render || self.dispatch
    }
}

/// Wakes the UI thread early when the engine has a frame or Dispatch has work.
///
/// The event loop owns the blocking call and installs a waker. The waker
/// fires once per batch: only when the first flag goes up, until the frame
/// loop [`take`](FrameSignal::take)s them.
#[derive(Default)]
pub struct FrameSignal {
    pending: Mutex<Wake>,
    cond: Condvar,
    waker: RwLock<Option<Waker>>,
}

impl FrameSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write() = Some(Box::new(waker));
    }

    pub fn notify_render(&self) {
        self.notify(|w| w.render = true);
    }

    pub fn notify_dispatch(&self) {
        self.notify(|w| w.dispatch = true);
    }

    fn notify(&self, mark: impl FnOnce(&mut Wake)) {
        let first = {
            let mut pending = self.pending.lock();
            let was_pending = pending.any();
            mark(&mut pending);
            !was_pending
        };
        self.cond.notify_all();
        if first {
            if let Some(waker) = self.waker.read().as_ref() {
                waker();
            }
        }
    }

    /// Block until something is pending or `timeout` elapses, then clear and
    /// return the pending flags.
    #[cfg(test)]
    pub fn wait(&self, timeout: Duration) -> Wake {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        while !pending.any() {
            if self.cond.wait_until(&mut pending, deadline).timed_out() {
                break;
            }
        }
        std::mem::take(&mut *pending)
    }

    /// Clear and return the pending flags without blocking.
    pub fn take(&self) -> Wake {
        std::mem::take(&mut *self.pending.lock())
    }
}
