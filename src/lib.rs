//! Settle-once promises for threads.
//!
//! A [`Promise`] is filled exactly once by a producer (a worker thread making
//! a network call, say) and observed by any number of consumers. Consumers
//! can block on it, `.await` it, or build on it without blocking:
//!
//! * [`Promise::then`], [`Promise::catch`] and friends derive a new promise
//!   from a transformation of the parent's outcome;
//! * [`Promise::all`] and [`Promise::race`] fan many promises into one.
//!
//! Settlement and callback dispatch happen inline on whichever thread
//! settles. There is no executor.
//!
//! # Examples
//!
//! ```
//! use promise_chain::{pair, Promise};
//!
//! let fetches: Vec<Promise<usize, String>> = ["a", "bb", "ccc"]
//!     .into_iter()
//!     .map(|body| pair::spawn("fetch", move || Ok(body.len())).unwrap())
//!     .collect();
//!
//! let total = Promise::all(fetches).then(|lens| Ok(lens.iter().sum::<usize>()));
//! assert_eq!(total.wait(), Ok(6));
//! ```
mod chain;
pub mod combinators;
mod error;
mod future;
pub mod pair;

pub use chain::Resolution;
pub use error::{Error, Result};
pub use future::{Outcome, Promise, Status};
