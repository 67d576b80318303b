//! `then`/`catch` chaining.
//!
//! Every chaining method returns a new promise right away and settles it once
//! the parent has settled. All of them are thin wrappers around
//! [`Promise::chain`].
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::future::{panic_message, Outcome, Promise};

/// What a fulfilment handler hands back: a plain value, or a promise whose
/// outcome the derived promise should adopt.
///
/// Adoption goes one level deep. If the adopted promise fulfills with yet
/// another promise, that promise is the value.
#[derive(Debug)]
pub enum Resolution<T, E> {
    Value(T),
    Adopt(Promise<T, E>),
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Adopt(promise)
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Maps the fulfilled value. A rejection passes through untouched; an
    /// `Err` from `on_fulfilled` rejects the derived promise.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    ///
    /// let len = Promise::<&str, String>::resolve("🍓🍓").then(|s| Ok(s.chars().count()));
    /// assert_eq!(len.wait(), Ok(2));
    /// ```
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        self.chain(
            move |value| on_fulfilled(value).map(Resolution::Value),
            None::<fn(E) -> Result<U, E>>,
        )
    }

    /// Like [`then`](Self::then), for handlers that start more asynchronous
    /// work. The derived promise adopts the returned promise's outcome.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Promise<U, E>, E> + Send + 'static,
    {
        self.chain(
            move |value| on_fulfilled(value).map(Resolution::Adopt),
            None::<fn(E) -> Result<U, E>>,
        )
    }

    /// Handles both outcomes. The value `on_rejected` returns fulfills the
    /// derived promise, turning a rejected chain back into a fulfilled one.
    pub fn then_or<U, F, G>(&self, on_fulfilled: F, on_rejected: G) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
        G: FnOnce(E) -> Result<U, E> + Send + 'static,
    {
        self.chain(
            move |value| on_fulfilled(value).map(Resolution::Value),
            Some(on_rejected),
        )
    }

    /// Recovers from a rejection. A fulfilled value passes through.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    ///
    /// let recovered = Promise::<i32, String>::rejected("💥".into()).catch(|_| Ok(0));
    /// assert_eq!(recovered.wait(), Ok(0));
    /// ```
    pub fn catch<G>(&self, on_rejected: G) -> Promise<T, E>
    where
        G: FnOnce(E) -> Result<T, E> + Send + 'static,
    {
        self.chain(|value| Ok(Resolution::Value(value)), Some(on_rejected))
    }

    /// The general chaining step.
    ///
    /// Once `self` settles, the derived promise is settled from exactly one
    /// of these:
    ///
    /// * cancellation of `self`, which cancels it without running a handler;
    /// * a rejection with no `on_rejected`, which is passed on unchanged;
    /// * the result of `on_rejected(reason)`;
    /// * the result of `on_fulfilled(value)`, adopting the promise it names
    ///   when it returns [`Resolution::Adopt`].
    ///
    /// A handler that panics cancels the derived promise.
    pub fn chain<U, F, G>(&self, on_fulfilled: F, on_rejected: Option<G>) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + Send + 'static,
        G: FnOnce(E) -> Result<U, E> + Send + 'static,
    {
        let derived = Promise::new();
        let next = derived.clone();
        self.add_callback(move |outcome| {
            let step = catch_unwind(AssertUnwindSafe(move || match outcome {
                Outcome::Cancelled => Step::Settle(Outcome::Cancelled),
                Outcome::Rejected(reason) => match on_rejected {
                    None => Step::Settle(Outcome::Rejected(reason)),
                    Some(on_rejected) => Step::Settle(on_rejected(reason).into()),
                },
                Outcome::Fulfilled(value) => match on_fulfilled(value) {
                    Ok(Resolution::Value(value)) => Step::Settle(Outcome::Fulfilled(value)),
                    Ok(Resolution::Adopt(inner)) => Step::Adopt(inner),
                    Err(reason) => Step::Settle(Outcome::Rejected(reason)),
                },
            }));
            match step {
                Ok(Step::Settle(outcome)) => settle_derived(&next, outcome),
                Ok(Step::Adopt(inner)) => {
                    inner.add_callback(move |outcome| settle_derived(&next, outcome))
                }
                Err(panic) => {
                    log::error!(
                        "promise handler panicked, cancelling derived promise: {}",
                        panic_message(&*panic)
                    );
                    settle_derived(&next, Outcome::Cancelled);
                }
            }
        });
        derived
    }
}

/// What a handler decided for the derived promise.
enum Step<U, E> {
    Settle(Outcome<U, E>),
    Adopt(Promise<U, E>),
}

/// Settles a promise handed out by a chaining call. The caller owns it and
/// may have settled it by hand already; that settlement stands.
pub(crate) fn settle_derived<T, E>(derived: &Promise<T, E>, outcome: Outcome<T, E>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let status = outcome.status();
    if let Err(existing) = derived.try_settle(outcome) {
        log::debug!("derived promise already {existing:?}, dropping {status:?} outcome");
    }
}
