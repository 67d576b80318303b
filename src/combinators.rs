//! Constructors for already-settled promises, plus `all` and `race`.
//!
//! The bookkeeping for each `all`/`race` call lives behind a lock created
//! for that call alone. Nothing is shared between calls.
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::chain::{settle_derived, Resolution};
use crate::future::{Outcome, Promise};

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A promise already fulfilled with `value`.
    pub fn resolve(value: T) -> Self {
        Self::settled(Outcome::Fulfilled(value))
    }

    /// A promise already rejected with `reason`.
    pub fn rejected(reason: E) -> Self {
        Self::settled(Outcome::Rejected(reason))
    }

    pub fn cancelled() -> Self {
        Self::settled(Outcome::Cancelled)
    }

    /// A new promise that settles however `source` does.
    pub fn adopt(source: &Promise<T, E>) -> Self {
        let adopted = Promise::new();
        let next = adopted.clone();
        source.add_callback(move |outcome| settle_derived(&next, outcome));
        adopted
    }

    /// `resolve` for either kind of input: a value comes back fulfilled, a
    /// promise is adopted.
    pub fn from_resolution(resolution: Resolution<T, E>) -> Self {
        match resolution {
            Resolution::Value(value) => Self::resolve(value),
            Resolution::Adopt(source) => Self::adopt(&source),
        }
    }

    fn settled(outcome: Outcome<T, E>) -> Self {
        let promise = Promise::new();
        settle_derived(&promise, outcome);
        promise
    }

    /// Fulfills with every input's value, in input order, once all of them
    /// have fulfilled. The first rejection rejects the result and later
    /// outcomes are dropped. A cancelled input cancels the result.
    ///
    /// No inputs means an already-fulfilled empty `Vec`.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    ///
    /// let inputs: Vec<_> = (0..5).map(Promise::<i32, String>::resolve).collect();
    /// assert_eq!(Promise::all(inputs).wait(), Ok(vec![0, 1, 2, 3, 4]));
    /// ```
    pub fn all<I>(promises: I) -> Promise<Vec<T>, E>
    where
        I: IntoIterator<Item = Promise<T, E>>,
    {
        let promises: Vec<_> = promises.into_iter().collect();
        let expected = promises.len();
        let aggregate = Promise::new();
        if expected == 0 {
            settle_derived(&aggregate, Outcome::Fulfilled(vec![]));
            return aggregate;
        }

        let gather = Arc::new(Mutex::new(Gather {
            values: BTreeMap::new(),
            done: false,
        }));
        for (index, promise) in promises.into_iter().enumerate() {
            let gather = gather.clone();
            let aggregate = aggregate.clone();
            promise.add_callback(move |outcome| {
                let decided = {
                    let mut gather = gather.lock().unwrap_or_else(PoisonError::into_inner);
                    gather.record(index, outcome, expected)
                };
                if let Some(outcome) = decided {
                    settle_derived(&aggregate, outcome);
                }
            });
        }
        aggregate
    }

    /// Settles like whichever input settles first, fulfilled or rejected.
    /// Cancelled inputs drop out of the race.
    ///
    /// With no inputs the result never settles.
    pub fn race<I>(promises: I) -> Promise<T, E>
    where
        I: IntoIterator<Item = Promise<T, E>>,
    {
        let aggregate = Promise::new();
        let finished = Arc::new(Mutex::new(false));
        let mut entrants = 0usize;
        for promise in promises {
            entrants += 1;
            let finished = finished.clone();
            let aggregate = aggregate.clone();
            promise.add_callback(move |outcome| {
                if let Outcome::Cancelled = outcome {
                    return;
                }
                let won = {
                    let mut finished = finished.lock().unwrap_or_else(PoisonError::into_inner);
                    !std::mem::replace(&mut *finished, true)
                };
                if won {
                    settle_derived(&aggregate, outcome);
                } else {
                    log::debug!("race already decided, dropping {:?} outcome", outcome.status());
                }
            });
        }
        if entrants == 0 {
            log::debug!("race called with no promises; result will stay pending");
        }
        aggregate
    }
}

/// Per-call state for [`Promise::all`].
struct Gather<T> {
    values: BTreeMap<usize, T>,
    done: bool,
}

impl<T> Gather<T> {
    /// Records one input's outcome and returns the aggregate outcome once it
    /// is decided. Returns `Some` at most once per call to `all`.
    fn record<E>(
        &mut self,
        index: usize,
        outcome: Outcome<T, E>,
        expected: usize,
    ) -> Option<Outcome<Vec<T>, E>> {
        if self.done {
            log::debug!("all already decided, dropping {:?} outcome", outcome.status());
            return None;
        }
        let decided = match outcome {
            Outcome::Fulfilled(value) => {
                self.values.insert(index, value);
                if self.values.len() < expected {
                    return None;
                }
                Outcome::Fulfilled(std::mem::take(&mut self.values).into_values().collect())
            }
            Outcome::Rejected(reason) => Outcome::Rejected(reason),
            Outcome::Cancelled => Outcome::Cancelled,
        };
        self.values.clear();
        self.done = true;
        Some(decided)
    }
}

/// Free-function form of [`Promise::all`].
pub fn all<T, E, I>(promises: I) -> Promise<Vec<T>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    Promise::all(promises)
}

/// Free-function form of [`Promise::race`].
pub fn race<T, E, I>(promises: I) -> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    Promise::race(promises)
}
