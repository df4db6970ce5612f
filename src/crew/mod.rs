//! Fixed-size pool of OS worker threads pulling boxed routines from one
//! bounded FIFO.
//!
//! The queue, its flags and counters sit behind a single mutex. Workers wait
//! on `not_empty`, producers on `not_full`, and `join(true)` on `empty`.


use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CrewError;

/// How long `join(true)` waits for the queue to drain before giving up.
pub const DEFAULT_DRAIN_WATCHDOG: Duration = Duration::from_secs(60);

pub type WorkItem<T> = Box<dyn FnOnce() -> T + Send + 'static>;

struct CrewState<T> {
    queue: VecDeque<WorkItem<T>>,
    max_queue: usize,
    closed: bool,
    shutdown: bool,
    running: usize,
    dispatched: u64,
}

struct Shared<T> {
    state: Mutex<CrewState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    empty: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, CrewState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake_all(&self) {
        self.not_empty.notify_all();
        self.not_full.notify_all();
        self.empty.notify_all();
    }
}

/// Snapshot of the crew's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrewStatus {
    pub size: usize,
    pub queued: usize,
    pub running: usize,
    pub dispatched: u64,
    pub closed: bool,
    pub shutdown: bool,
}

pub struct Crew<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    workers: Vec<JoinHandle<Vec<T>>>,
    blocking: bool,
    cancel: CancellationToken,
    watchdog: Duration,
}

impl<T: Send + 'static> Crew<T> {
    /// Spawns `size` worker threads sharing a queue of at most `max_queue`
    /// pending items.
    ///
    /// # Errors
    ///
    /// Returns `CrewError::EmptyCrew` for a zero size and `CrewError::Spawn`
    /// when the OS refuses to create a thread. Already spawned workers are
    /// shut down before returning.
    pub fn create(size: usize, max_queue: usize, blocking: bool) -> Result<Self, CrewError> {
        if size == 0 || max_queue == 0 {
            return Err(CrewError::EmptyCrew);
        }
        let shared = Arc::new(Shared {
            state: Mutex::new(CrewState {
                queue: VecDeque::with_capacity(max_queue),
                max_queue,
                closed: false,
                shutdown: false,
                running: 0,
                dispatched: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            empty: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("volley-crew-{}", index))
                .spawn(move || worker_loop(&worker_shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    shared.lock().shutdown = true;
                    shared.wake_all();
                    for handle in workers {
                        let _joined = handle.join();
                    }
                    return Err(CrewError::Spawn { index, source: err });
                }
            }
        }
        debug!("crew started with {} workers", size);

        Ok(Self {
            shared,
            workers,
            blocking,
            cancel: CancellationToken::new(),
            watchdog: DEFAULT_DRAIN_WATCHDOG,
        })
    }

    #[must_use]
    pub const fn with_watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// Token tripped by [`Crew::cancel`]; running routines poll it.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn status(&self) -> CrewStatus {
        let state = self.shared.lock();
        CrewStatus {
            size: self.workers.len(),
            queued: state.queue.len(),
            running: state.running,
            dispatched: state.dispatched,
            closed: state.closed,
            shutdown: state.shutdown,
        }
    }

    /// Enqueues one routine.
    ///
    /// # Errors
    ///
    /// `QueueFull` when the queue is full on a non-blocking crew; `Closed` or
    /// `ShutDown` once the crew stops accepting work, including while a
    /// blocking caller is waiting for space.
    pub fn add<F>(&self, routine: F) -> Result<(), CrewError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let mut state = self.shared.lock();
        loop {
            if state.shutdown {
                return Err(CrewError::ShutDown);
            }
            if state.closed {
                return Err(CrewError::Closed);
            }
            if state.queue.len() < state.max_queue {
                break;
            }
            if !self.blocking {
                return Err(CrewError::QueueFull);
            }
            state = self
                .shared
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.queue.push_back(Box::new(routine));
        drop(state);
        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Stops the crew: pending items are abandoned, every waiter wakes, and
    /// running routines see the cancellation token.
    pub fn cancel(&self) {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
            state.closed = true;
        }
        self.shared.wake_all();
        self.cancel.cancel();
    }

    /// Closes the crew, optionally waits for every queued item to be picked
    /// up, then stops and joins every worker. Routines already running
    /// always finish and keep their results.
    ///
    /// # Errors
    ///
    /// Returns `WorkerPanicked` when a worker thread panicked; results from
    /// the other workers are lost in that case.
    pub fn join(self, finish: bool) -> Result<Vec<T>, CrewError> {
        {
            let mut state = self.shared.lock();
            state.closed = true;
            if finish {
                let deadline = Instant::now()
                    .checked_add(self.watchdog)
                    .unwrap_or_else(Instant::now);
                while !state.shutdown && !state.queue.is_empty() {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        warn!(
                            "crew drain watchdog expired with {} queued, {} running",
                            state.queue.len(),
                            state.running
                        );
                        break;
                    }
                    let (next, _timed_out) = self
                        .shared
                        .empty
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner);
                    state = next;
                }
            }
            state.shutdown = true;
        }
        self.shared.wake_all();

        let mut results = Vec::new();
        for (index, handle) in self.workers.into_iter().enumerate() {
            match handle.join() {
                Ok(mut produced) => results.append(&mut produced),
                Err(_) => return Err(CrewError::WorkerPanicked { index }),
            }
        }
        Ok(results)
    }
}

fn worker_loop<T>(shared: &Shared<T>) -> Vec<T> {
    let mut produced = Vec::new();
    loop {
        let item = {
            let mut state = shared.lock();
            while state.queue.is_empty() && !state.shutdown {
                state = shared
                    .not_empty
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if state.shutdown {
                return produced;
            }
            let Some(item) = state.queue.pop_front() else {
                continue;
            };
            state.running = state.running.saturating_add(1);
            state.dispatched = state.dispatched.saturating_add(1);
            shared.not_full.notify_one();
            if state.queue.is_empty() {
                shared.empty.notify_all();
            }
            item
        };

        produced.push(item());

        let mut state = shared.lock();
        state.running = state.running.saturating_sub(1);
        if state.queue.is_empty() && state.running == 0 {
            shared.empty.notify_all();
        }
    }
}
