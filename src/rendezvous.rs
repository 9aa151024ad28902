//! Rendezvous channel serializing worker callbacks into the main loop
//!
//! The stack is single threaded: its callbacks must never observe concurrent
//! mutation. Instead of parking the main loop behind a hand-rolled condvar
//! barrier, the worker posts a closure and the main loop drains exactly one
//! closure per poll iteration. The closure runs on the main thread between
//! two iterations, so it sees the same stack invariants as code called from
//! the main loop itself.
//!
//! The channel holds a single job. A worker with a second event blocks in
//! [`Rendezvous::post`] until the first job was drained, which serializes
//! concurrent worker events the same way the original idle/waiting handshake
//! did.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Mutex;

/// Deferred work executed by the main loop against its exclusive state
pub type Job<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Hook waking the main loop out of its multiplexing poll
pub type Waker = Box<dyn Fn() + Send + Sync>;

/// One-deep channel of jobs from the worker to the main loop
pub struct Rendezvous<T> {
    tx: Sender<Job<T>>,
    rx: Receiver<Job<T>>,
    waker: Mutex<Option<Waker>>,
}

impl<T> Rendezvous<T> {
    /// Create a rendezvous with no waker installed
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            tx,
            rx,
            waker: Mutex::new(None),
        }
    }

    /// Install the hook waking the main loop, replacing any previous one
    ///
    /// Typically a self-pipe write making the main loop's poll return.
    pub fn set_waker(&self, waker: Waker) {
        *self.waker.lock().unwrap() = Some(waker);
    }

    /// Post a job from the worker thread, blocking while one is pending
    ///
    /// The waker runs after the job was handed over, so a wake never refers
    /// to a job which is not yet visible to the main loop.
    pub fn post(&self, job: Job<T>) {
        if self.tx.send(job).is_err() {
            // The main loop dropped its receiver; the process is exiting
            return;
        }

        if let Some(waker) = self.waker.lock().unwrap().as_ref() {
            waker();
        }
    }

    /// Drain and run at most one pending job against `target`
    ///
    /// Called by the main loop once per poll iteration. Returns whether a
    /// job ran.
    pub fn run_one(&self, target: &mut T) -> bool {
        match self.rx.try_recv() {
            Ok(job) => {
                job(target);
                true
            }
            Err(_) => false,
        }
    }
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}
