//! The settle-once future every other part of the crate is built on.
//!
//! A [`Promise`] starts out pending and is settled exactly once, by whichever
//! thread calls [`fulfill`](Promise::fulfill), [`reject`](Promise::reject) or
//! [`cancel`](Promise::cancel) first. Observers can block on it, register
//! callbacks, or `.await` it.
//!
//! # Examples
//!
//! ```
//! use promise_chain::Promise;
//! use std::thread;
//!
//! let promise = Promise::<String, String>::new();
//! let producer = promise.clone();
//! let task = thread::spawn(move || producer.fulfill("🍓".into()));
//!
//! assert_eq!(promise.wait(), Ok("🍓".to_string()));
//! task.join().expect("The task thread has panicked").unwrap();
//! ```
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use crate::error::{Error, Result};

/// What a promise settled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    Fulfilled(T),
    Rejected(E),
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    pub fn status(&self) -> Status {
        match self {
            Outcome::Fulfilled(_) => Status::Fulfilled,
            Outcome::Rejected(_) => Status::Rejected,
            Outcome::Cancelled => Status::Cancelled,
        }
    }

    /// Turns the outcome into what `wait` hands back.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Fulfilled(value) => Ok(value),
            Outcome::Rejected(reason) => Err(Error::Rejected(reason)),
            Outcome::Cancelled => Err(Error::Cancelled),
        }
    }
}

impl<T, E> From<std::result::Result<T, E>> for Outcome<T, E> {
    fn from(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Fulfilled(value),
            Err(reason) => Outcome::Rejected(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
    Cancelled,
}

type Callback<T, E> = Box<dyn FnOnce(Outcome<T, E>) + Send + 'static>;

struct State<T, E> {
    outcome: Option<Outcome<T, E>>,
    callbacks: Vec<Callback<T, E>>,
    /// Set while the settling thread drains `callbacks`. Late registrations
    /// queue behind the callbacks it has not reached yet.
    dispatching: bool,
    wakers: Vec<Waker>,
}

struct Inner<T, E> {
    state: Mutex<State<T, E>>,
    settled: Condvar,
}

impl<T, E> Inner<T, E> {
    // Callbacks never run under this lock, so a poisoned guard still
    // protects a consistent state.
    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A thread-safe, settle-once future.
///
/// Cloning a `Promise` gives another handle to the same future: every clone
/// sees the one settlement.
pub struct Promise<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.inner.lock().outcome {
            Some(ref outcome) => outcome.status(),
            None => Status::Pending,
        };
        f.debug_struct("Promise").field("status", &status).finish()
    }
}

impl<T, E> Default for Promise<T, E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    outcome: None,
                    callbacks: vec![],
                    dispatching: false,
                    wakers: vec![],
                }),
                settled: Condvar::new(),
            }),
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A pending promise.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fulfill(&self, value: T) -> Result<(), E> {
        self.settle(Outcome::Fulfilled(value))
    }

    pub fn reject(&self, reason: E) -> Result<(), E> {
        self.settle(Outcome::Rejected(reason))
    }

    /// Cancellation is a settlement like any other. It reaches observers
    /// only; whoever is producing the value is not told.
    pub fn cancel(&self) -> Result<(), E> {
        self.settle(Outcome::Cancelled)
    }

    /// Settles the promise, or fails with [`Error::InvalidState`] carrying the
    /// status that was recorded first. The recorded outcome is never replaced.
    pub fn settle(&self, outcome: Outcome<T, E>) -> Result<(), E> {
        self.try_settle(outcome).map_err(Error::InvalidState)
    }

    pub(crate) fn try_settle(&self, outcome: Outcome<T, E>) -> std::result::Result<(), Status> {
        self.settle_with(outcome, |outcome| outcome.clone())
    }

    /// Registers `callback` to receive the outcome.
    ///
    /// The callback runs exactly once. While the promise is pending, or while
    /// the settling thread is still running earlier callbacks, it is queued
    /// and runs on the settling thread. Once dispatch is over it runs right
    /// away on the calling thread. Either way callbacks registered on the
    /// same promise run in registration order.
    pub fn add_callback<F>(&self, callback: F)
    where
        F: FnOnce(Outcome<T, E>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.inner.lock();
            let settled = match state.outcome {
                Some(ref outcome) if !state.dispatching => Some(outcome.clone()),
                _ => None,
            };
            match settled {
                Some(outcome) => outcome,
                None => {
                    state.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        log::trace!("promise already {:?}, running callback now", outcome.status());
        dispatch(Box::new(callback), outcome);
    }

    /// Blocks until the promise settles and returns its value.
    pub fn wait(&self) -> Result<T, E> {
        self.wait_outcome().into_result()
    }

    /// Like [`wait`](Self::wait), but gives up with [`Error::Timeout`] once
    /// `timeout` has elapsed. Timing out leaves the promise pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, E> {
        self.wait_outcome_timeout(timeout)
            .ok_or(Error::Timeout(timeout))?
            .into_result()
    }

    /// Blocks until the promise settles and returns the raw outcome.
    pub fn wait_outcome(&self) -> Outcome<T, E> {
        let mut state = self.inner.lock();
        loop {
            if let Some(ref outcome) = state.outcome {
                return outcome.clone();
            }
            state = self
                .inner
                .settled
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// The raw outcome, or `None` if `timeout` elapsed first.
    pub fn wait_outcome_timeout(&self, timeout: Duration) -> Option<Outcome<T, E>> {
        let state = self.inner.lock();
        let (state, _) = self
            .inner
            .settled
            .wait_timeout_while(state, timeout, |state| state.outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.outcome.clone()
    }

    /// The outcome if the promise has settled, without blocking.
    pub fn try_outcome(&self) -> Option<Outcome<T, E>> {
        self.inner.lock().outcome.clone()
    }

    pub fn status(&self) -> Status {
        match self.inner.lock().outcome {
            Some(ref outcome) => outcome.status(),
            None => Status::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == Status::Pending
    }

    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == Status::Cancelled
    }
}

impl<T, E> Promise<T, E> {
    /// Cancels the promise if nobody has settled it yet. Needs nothing from
    /// `T` or `E`, so `Drop` impls can call it.
    pub(crate) fn cancel_if_pending(&self) -> bool {
        self.settle_with(Outcome::Cancelled, |_| Outcome::Cancelled).is_ok()
    }

    /// Records `outcome` and runs the queued callbacks on this thread, each
    /// with its own copy made by `copy`.
    fn settle_with(
        &self,
        outcome: Outcome<T, E>,
        copy: fn(&Outcome<T, E>) -> Outcome<T, E>,
    ) -> std::result::Result<(), Status> {
        let (mut callbacks, wakers) = {
            let mut state = self.inner.lock();
            if let Some(ref existing) = state.outcome {
                return Err(existing.status());
            }
            log::trace!(
                "settling promise as {:?}, {} callback(s) waiting",
                outcome.status(),
                state.callbacks.len()
            );
            state.outcome = Some(copy(&outcome));
            state.dispatching = true;
            (mem::take(&mut state.callbacks), mem::take(&mut state.wakers))
        };
        self.inner.settled.notify_all();
        for waker in wakers {
            waker.wake();
        }
        loop {
            for callback in callbacks {
                dispatch(callback, copy(&outcome));
            }
            let mut state = self.inner.lock();
            if state.callbacks.is_empty() {
                state.dispatching = false;
                return Ok(());
            }
            callbacks = mem::take(&mut state.callbacks);
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

/// Runs one callback. A panicking callback is logged and swallowed so the
/// rest of the list still runs.
fn dispatch<T, E>(callback: Callback<T, E>, outcome: Outcome<T, E>) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(move || callback(outcome))) {
        log::error!("promise callback panicked: {}", panic_message(&*panic));
    }
}

impl<T, E> Future for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.lock();
        if let Some(ref outcome) = state.outcome {
            return Poll::Ready(outcome.clone().into_result());
        }
        // Every pending poller keeps its own waker; clones of one promise
        // may be awaited from several tasks at once.
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
