// =============================================================================
// DISPATCH
// =============================================================================
//
// Marshals work onto the thread that owns the window. Any thread may submit;
// only the owner drains, once per frame, in FIFO order.
//
// `sync` blocks the caller until the owner has run the job. Called on the
// owner itself it cannot wait for a drain that would never come, so it drains
// whatever is already queued and then runs the job inline. That keeps FIFO
// order for the owner's own submissions.
//
// After `close` nothing new is accepted: `submit` drops the job and `sync`
// returns `None` right away. Submitted jobs still queued at close run if the
// owner closes, and are cancelled otherwise. Queued `sync` jobs are always
// cancelled: their callers are blocked waiting on something (a native dialog,
// say) that must not start during teardown.
//
// =============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::bridge::signal::FrameSignal;

type Job<C> = Box<dyn FnOnce(&C) + Send>;

enum Entry<C: ?Sized> {
    Submitted(Job<C>),
    Blocking(Job<C>),
}

impl<C: ?Sized> Entry<C> {
    fn run(self, context: &C) {
        match self {
            Entry::Submitted(job) | Entry::Blocking(job) => job(context),
        }
    }
}

struct Queue<C: ?Sized> {
    jobs: VecDeque<Entry<C>>,
    closed: bool,
}

pub struct Dispatch<C: ?Sized> {
    context: Arc<C>,
    queue: Mutex<Queue<C>>,
    owner: Mutex<Option<ThreadId>>,
    signal: Arc<FrameSignal>,
}

impl<C: ?Sized + Send + Sync> Dispatch<C> {
    /// `context` is what every job receives; it is only ever touched by the
    /// owning thread through this queue.
    pub fn new(context: Arc<C>, signal: Arc<FrameSignal>) -> Self {
        Self {
            context,
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                closed: false,
            }),
            owner: Mutex::new(None),
            signal,
        }
    }

    /// Make the calling thread the owner.
    pub fn bind_owner(&self) {
        *self.owner.lock() = Some(thread::current().id());
    }

    pub fn is_owner(&self) -> bool {
        *self.owner.lock() == Some(thread::current().id())
    }

    pub fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.queue.lock().jobs.len()
    }

    fn enqueue(&self, job: Entry<C>) -> bool {
        {
            let mut queue = self.queue.lock();
            if queue.closed {
                return false;
            }
            queue.jobs.push_back(job);
        }
        self.signal.notify_dispatch();
        true
    }

    /// Queue `f` for the owner and return immediately.
    pub fn submit(&self, f: impl FnOnce(&C) + Send + 'static) {
        if !self.enqueue(Entry::Submitted(Box::new(f))) {
            log::debug!("Dispatch closed, dropping submitted job");
        }
    }

    /// Run `f` on the owner and wait for its result. `None` when the queue
    /// is closed or the job was cancelled before it ran.
    pub fn sync<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&C) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_owner() {
            if self.is_closed() {
                return None;
            }
            self.drain();
            return Some(f(&self.context));
        }

        let (tx, rx) = oneshot::channel();
        let job: Job<C> = Box::new(move |ctx| {
            let _ = tx.send(f(ctx));
        });
        if !self.enqueue(Entry::Blocking(job)) {
            log::debug!("Dispatch closed, refusing sync job");
            return None;
        }
        rx.blocking_recv().ok()
    }

    /// Run every job queued so far. Jobs queued while draining wait for the
    /// next call. Returns how many ran.
    pub fn drain(&self) -> usize {
        let jobs = std::mem::take(&mut self.queue.lock().jobs);
        let count = jobs.len();
        for job in jobs {
            job.run(&self.context);
        }
        count
    }

    /// Stop accepting work. The owner runs submitted jobs that are left;
    /// everything else is cancelled, releasing blocked `sync` callers with
    /// `None`.
    pub fn close(&self) {
        let jobs = {
            let mut queue = self.queue.lock();
            queue.closed = true;
            std::mem::take(&mut queue.jobs)
        };
        let owner = self.is_owner();
        let (mut ran, mut cancelled) = (0, 0);
        for entry in jobs {
            match entry {
                Entry::Submitted(job) if owner => {
                    job(&self.context);
                    ran += 1;
                }
                // Dropping a blocking job drops its reply sender.
                _ => cancelled += 1,
            }
        }
        log::debug!("Dispatch closed: ran {} pending jobs, cancelled {}", ran, cancelled);
    }
}
