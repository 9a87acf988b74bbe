//! Bounded worker pool and deferred results.
//!
//! Every `*_async` operation on [`Image`](crate::Image) is a closure handed
//! to [`submit`]. It runs on a process-wide rayon pool and its outcome lands
//! in a [`Deferred`], which the caller may block on ([`Deferred::wait`]),
//! poll ([`Deferred::is_pending`]), chain ([`Deferred::then`]) or `.await`.
//!
//! A [`Deferred`] moves from pending to settled exactly once:
//! - Pending → Resolved (success)
//! - Pending → Rejected (a [`MagickError`])
//! - Pending → Panicked (the task panicked; re-raised by `wait`)
//!
//! There is no cancellation. Dropping a `Deferred` discards the outcome but
//! the task still runs to completion.

use crate::config::{PoolConfig, effective_workers};
use crate::error::{MagickError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};
use std::task::{Context, Poll, Waker};
use tracing::{debug, warn};

// `None` when building the named pool failed; tasks then go to rayon's global pool.
static POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

fn build(config: &PoolConfig) -> Option<ThreadPool> {
    let workers = effective_workers(config);
    let prefix = config.thread_name.clone();
    match ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(move |i| format!("{prefix}-{i}"))
        .build()
    {
        Ok(pool) => {
            debug!(workers, "worker pool started");
            Some(pool)
        }
        Err(e) => {
            warn!(error = %e, "could not build worker pool, using the global rayon pool");
            None
        }
    }
}

/// Configure the process-wide pool. Returns `false` if it already exists.
pub fn init(config: &PoolConfig) -> bool {
    let mut created = false;
    POOL.get_or_init(|| {
        created = true;
        build(config)
    });
    created
}

/// Number of worker threads servicing async operations.
pub fn worker_count() -> usize {
    match pool() {
        Some(p) => p.current_num_threads(),
        None => rayon::current_num_threads(),
    }
}

fn pool() -> Option<&'static ThreadPool> {
    POOL.get_or_init(|| build(&PoolConfig::default())).as_ref()
}

fn spawn(job: impl FnOnce() + Send + 'static) {
    match pool() {
        Some(p) => p.spawn(job),
        None => rayon::spawn(job),
    }
}

/// Run `op` on the pool. The caller gets a [`Deferred`] immediately.
pub fn submit<T, F>(op: F) -> Deferred<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (deferred, completer) = Deferred::pending();
    spawn(move || completer.run(op));
    deferred
}

enum State<T> {
    Pending,
    Resolved(T),
    Rejected(MagickError),
    Panicked(Box<dyn Any + Send>),
    Taken,
}

struct Slot<T> {
    state: State<T>,
    waker: Option<Waker>,
    continuation: Option<Box<dyn FnOnce() + Send>>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    settled: Condvar,
}

impl<T> Shared<T> {
    // Task state is only ever replaced whole, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn settle(&self, state: State<T>) {
        let (waker, continuation) = {
            let mut slot = self.lock();
            if !matches!(slot.state, State::Pending) {
                return;
            }
            slot.state = state;
            (slot.waker.take(), slot.continuation.take())
        };
        self.settled.notify_all();
        if let Some(w) = waker {
            w.wake();
        }
        if let Some(next) = continuation {
            next();
        }
    }

    /// Run `f` once settled: now if already settled, otherwise from `settle`.
    fn on_settled(&self, f: Box<dyn FnOnce() + Send>) {
        let f = {
            let mut slot = self.lock();
            if matches!(slot.state, State::Pending) {
                slot.continuation = Some(f);
                return;
            }
            f
        };
        f();
    }
}

/// The eventual outcome of an asynchronous operation.
pub struct Deferred<T> {
    shared: Arc<Shared<T>>,
}

/// Write side of a [`Deferred`]. Settles it when dropped unsettled.
struct Completer<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Completer<T> {
    fn run(mut self, op: impl FnOnce() -> Result<T>) {
        let state = match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(Ok(v)) => State::Resolved(v),
            Ok(Err(e)) => State::Rejected(e),
            Err(payload) => State::Panicked(payload),
        };
        if let Some(shared) = self.shared.take() {
            shared.settle(state);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.settle(State::Panicked(Box::new("async task dropped before completion")));
        }
    }
}

impl<T> Deferred<T> {
    fn pending() -> (Self, Completer<T>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                state: State::Pending,
                waker: None,
                continuation: None,
            }),
            settled: Condvar::new(),
        });
        let completer = Completer {
            shared: Some(Arc::clone(&shared)),
        };
        (Self { shared }, completer)
    }

    fn settled(state: State<T>) -> Self {
        let (deferred, mut completer) = Self::pending();
        if let Some(shared) = completer.shared.take() {
            shared.settle(state);
        }
        deferred
    }

    /// An already-resolved result.
    pub fn resolved(value: T) -> Self {
        Self::settled(State::Resolved(value))
    }

    /// An already-rejected result.
    pub fn rejected(error: MagickError) -> Self {
        Self::settled(State::Rejected(error))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.shared.lock().state, State::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.shared.lock().state, State::Resolved(_))
    }

    /// True for an error outcome, including a panicked task.
    pub fn is_rejected(&self) -> bool {
        matches!(self.shared.lock().state, State::Rejected(_) | State::Panicked(_))
    }

    /// Block until settled and return the outcome.
    ///
    /// # Panics
    ///
    /// Resumes the panic if the task panicked.
    pub fn wait(self) -> Result<T> {
        let mut slot = self.shared.lock();
        while matches!(slot.state, State::Pending) {
            slot = self.shared.settled.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
        let state = std::mem::replace(&mut slot.state, State::Taken);
        drop(slot);
        unpack(state)
    }

    /// Run `f` on the pool with this outcome once it settles.
    ///
    /// Chaining is how callers order async operations on one image.
    pub fn then<U, F>(self, f: F) -> Deferred<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(Result<T>) -> Result<U> + Send + 'static,
    {
        let (next, completer) = Deferred::pending();
        let shared = Arc::clone(&self.shared);
        shared.on_settled(Box::new(move || {
            spawn(move || completer.run(move || f(self.wait())));
        }));
        next
    }
}

fn unpack<T>(state: State<T>) -> Result<T> {
    match state {
        State::Resolved(v) => Ok(v),
        State::Rejected(e) => Err(e),
        State::Panicked(payload) => panic::resume_unwind(payload),
        State::Pending | State::Taken => panic::resume_unwind(Box::new("deferred result already taken")),
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.lock();
        if matches!(slot.state, State::Pending) {
            slot.waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        let state = std::mem::replace(&mut slot.state, State::Taken);
        drop(slot);
        Poll::Ready(unpack(state))
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.shared.lock().state {
            State::Pending => "Pending",
            State::Resolved(_) => "Resolved",
            State::Rejected(_) => "Rejected",
            State::Panicked(_) => "Panicked",
            State::Taken => "Taken",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}
