//! Serial, timer-capable task dispatch.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The host's main-thread dispatcher: runs posted tasks one at a time, in
/// due order.
pub trait Dispatcher: Send + Sync {
    fn post_delayed(&self, delay: Duration, task: Task);

    fn post(&self, task: Task) {
        self.post_delayed(Duration::ZERO, task);
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Entry {
    due: Duration,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct Queue {
    now: Duration,
    seq: u64,
    entries: Vec<Entry>,
}

/// Dispatcher on a virtual clock. Nothing runs until the owner pumps it with
/// [`ManualDispatcher::advance`] or [`ManualDispatcher::run_ready`].
///
/// Tasks with the same due time run in posting order. Tasks posted while
/// pumping run in the same pump if they fall due before its end.
#[derive(Default)]
pub struct ManualDispatcher {
    queue: Mutex<Queue>,
}

impl ManualDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        lock(&self.queue).now
    }

    pub fn pending(&self) -> usize {
        lock(&self.queue).entries.len()
    }

    pub fn next_due(&self) -> Option<Duration> {
        lock(&self.queue).entries.iter().map(|e| e.due).min()
    }

    // Lock is released before the task runs; tasks post more tasks.
    fn pop_due(&self, until: Duration) -> Option<Task> {
        let mut q = lock(&self.queue);
        let idx = q
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= until)
            .min_by_key(|(_, e)| (e.due, e.seq))
            .map(|(i, _)| i)?;
        let entry = q.entries.swap_remove(idx);
        if entry.due > q.now {
            q.now = entry.due;
        }
        Some(entry.task)
    }

    /// Run everything due at the current time. Returns tasks run.
    pub fn run_ready(&self) -> usize {
        let now = self.now();
        let mut ran = 0;
        while let Some(task) = self.pop_due(now) {
            task();
            ran += 1;
        }
        ran
    }

    /// Move the clock forward by `by`, running tasks as they fall due.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;
        while let Some(task) = self.pop_due(target) {
            task();
            ran += 1;
        }
        let mut q = lock(&self.queue);
        if q.now < target {
            q.now = target;
        }
        ran
    }

    pub fn advance_ms(&self, ms: u64) -> usize {
        self.advance(Duration::from_millis(ms))
    }
}

impl Dispatcher for ManualDispatcher {
    fn post_delayed(&self, delay: Duration, task: Task) {
        let mut q = lock(&self.queue);
        let due = q.now + delay;
        let seq = q.seq;
        q.seq += 1;
        q.entries.push(Entry { due, seq, task });
    }
}
