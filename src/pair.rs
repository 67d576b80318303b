use std::io;
use std::thread;

use crate::future::{Outcome, Promise};

/// Creates a connected [`Resolver`] and [`Promise`].
///
/// The `Resolver` is the producer's half. Settling consumes it, so one
/// producer can settle the promise at most once. If it is dropped unsettled,
/// the promise is cancelled and nobody is left waiting on it.
///
/// # Examples
///
/// ```
/// use promise_chain::pair;
/// use std::thread;
///
/// let (resolver, promise) = pair::channel::<String, String>();
///
/// let task1 = thread::spawn(move || {
///     println!("Received {:?}", promise.wait());
/// });
/// resolver.resolve("Hi".into());
/// task1.join().expect("The task1 thread has panicked.");
/// ```
pub fn channel<T, E>() -> (Resolver<T, E>, Promise<T, E>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let promise = Promise::new();
    (
        Resolver {
            promise: Some(promise.clone()),
        },
        promise,
    )
}

/// Runs `job` on a new named thread and returns a promise of its result.
///
/// `Ok` fulfills the promise and `Err` rejects it. A panicking job drops its
/// resolver, which cancels the promise. Fails only if the thread could not
/// be spawned.
///
/// # Examples
///
/// ```
/// use promise_chain::pair;
///
/// let promise = pair::spawn("adder", || Ok::<_, String>(1 + 1)).unwrap();
/// assert_eq!(promise.wait(), Ok(2));
/// ```
pub fn spawn<T, E, F>(name: &str, job: F) -> io::Result<Promise<T, E>>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    let (resolver, promise) = channel();
    let name = name.to_string();
    thread::Builder::new().name(name.clone()).spawn(move || {
        log::trace!("worker '{name}' starting");
        resolver.settle(job().into());
        log::trace!("worker '{name}' finished");
    })?;
    Ok(promise)
}

/// The producer's half of a [`channel`].
#[derive(Debug)]
pub struct Resolver<T, E> {
    promise: Option<Promise<T, E>>,
}

impl<T, E> Resolver<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn resolve(self, value: T) {
        self.settle(Outcome::Fulfilled(value))
    }

    pub fn reject(self, reason: E) {
        self.settle(Outcome::Rejected(reason))
    }

    /// A handle to the promise this resolver settles.
    pub fn promise(&self) -> Option<Promise<T, E>> {
        self.promise.clone()
    }

    fn settle(mut self, outcome: Outcome<T, E>) {
        if let Some(promise) = self.promise.take() {
            // The consumer half may have been cancelled or settled by hand.
            if let Err(existing) = promise.try_settle(outcome) {
                log::debug!("resolver's promise was already {existing:?}");
            }
        }
    }
}

impl<T, E> Drop for Resolver<T, E> {
    /// If this is an unsettled resolver, cancel the promise.
    fn drop(&mut self) {
        if let Some(promise) = self.promise.take() {
            if promise.cancel_if_pending() {
                log::debug!("resolver dropped before settling; promise cancelled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use std::thread;

    use super::{channel, spawn, Resolver};
    use crate::{Error, Promise, Status};

    #[test]
    fn test_resolver_resolve() {
        let (op, op_a) = channel::<String, ()>();
        let task1 = thread::spawn(move || block_on(async { op_a.await }));
        let task2 = thread::spawn(move || op.resolve(String::from("🍓")));
        task2.join().expect("The task2 thread has panicked");
        assert_eq!(
            task1.join().expect("The task1 thread has panicked"),
            Ok(String::from("🍓"))
        );
    }

    #[test]
    fn test_resolver_reject() {
        let (a, b) = channel::<String, String>();
        let task1 = thread::spawn(move || b.wait());
        let task2 = thread::spawn(move || a.reject(String::from("reject!!")));
        task2.join().expect("The task2 thread has panicked");
        assert_eq!(
            task1.join().expect("The task1 thread has panicked"),
            Err(Error::Rejected(String::from("reject!!")))
        );
    }

    #[test]
    fn test_resolver_dropped_cancels() {
        let (op, op_a) = channel::<String, ()>();
        let task1 = thread::spawn(move || op_a.wait());
        let task2 = thread::spawn(move || {
            // Move the resolver into this thread but never settle it.
            std::mem::drop(op);
        });
        task2.join().expect("The task2 thread has panicked");
        assert_eq!(
            task1.join().expect("The task1 thread has panicked"),
            Err(Error::Cancelled)
        );
    }

    #[test]
    fn test_resolver_after_consumer_settled() {
        let (op, op_a) = channel::<i32, ()>();
        op_a.cancel().unwrap();
        op.resolve(1);
        assert_eq!(op_a.status(), Status::Cancelled);
    }

    #[test]
    fn test_resolver_promise_handle() {
        let (op, _op_a) = channel::<i32, ()>();
        let handle = op.promise().expect("unsettled resolver has a promise");
        op.resolve(3);
        assert_eq!(handle.wait(), Ok(3));
    }

    #[test]
    fn test_resolver_drop_needs_no_clone() {
        struct Handle;
        let promise = Promise::<Handle, Handle>::default();
        let resolver = Resolver {
            promise: Some(promise.clone()),
        };
        drop(resolver);
        assert_eq!(format!("{promise:?}"), "Promise { status: Cancelled }");
    }

    #[test]
    fn test_spawn_settles_from_worker() {
        let ok = spawn("ok-worker", || Ok::<_, String>(String::from("done"))).unwrap();
        assert_eq!(ok.wait(), Ok(String::from("done")));
        let err = spawn("err-worker", || Err::<i32, _>(String::from("💥"))).unwrap();
        assert_eq!(err.wait(), Err(Error::Rejected(String::from("💥"))));
    }

    #[test]
    fn test_spawn_panicking_job_cancels() {
        let promise =
            spawn::<i32, String, _>("panicking-worker", || panic!("worker blew up")).unwrap();
        assert_eq!(promise.wait(), Err(Error::Cancelled));
    }
}
