use promise_chain::{pair, Error, Outcome, Promise, Status};
use std::sync::{Arc, Mutex};
use std::{thread, time::Duration};

const BOUND: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
struct ZeroDivision;

#[test]
fn test_resolve_wait_does_not_block() {
    let promise = Promise::<&str, ZeroDivision>::resolve("🍓");
    assert_eq!(promise.try_outcome(), Some(Outcome::Fulfilled("🍓")));
    assert_eq!(promise.wait(), Ok("🍓"));
}

#[test]
fn test_rejection_reaches_wait() {
    let promise = Promise::<i32, ZeroDivision>::rejected(ZeroDivision).then(|v| Ok(v + 1));
    assert_eq!(promise.wait(), Err(Error::Rejected(ZeroDivision)));
}

#[test]
fn test_all() {
    let promises: Vec<_> = (0..5).map(Promise::<i32, ZeroDivision>::resolve).collect();
    let result = Promise::all(promises).wait_timeout(BOUND);
    assert_eq!(result, Ok((0..5).collect::<Vec<_>>()));
}

#[test]
fn test_all_with_rejection() {
    let promises: Vec<_> = (0..5)
        .map(|i| {
            if i == 2 {
                Promise::<i32, ZeroDivision>::rejected(ZeroDivision)
            } else {
                Promise::resolve(i)
            }
        })
        .collect();
    let result = Promise::all(promises).wait_timeout(BOUND);
    assert_eq!(result, Err(Error::Rejected(ZeroDivision)));
}

#[test]
fn test_race() {
    let promises: Vec<_> = (0..5)
        .map(|i| {
            if i == 2 {
                Promise::<i32, ZeroDivision>::resolve(i)
            } else {
                Promise::new()
            }
        })
        .collect();
    assert_eq!(Promise::race(promises).wait_timeout(BOUND), Ok(2));
}

#[test]
fn test_race_with_rejection() {
    let promises: Vec<_> = (0..5)
        .map(|i| {
            if i == 2 {
                Promise::<i32, ZeroDivision>::rejected(ZeroDivision)
            } else {
                Promise::new()
            }
        })
        .collect();
    assert_eq!(
        Promise::race(promises).wait_timeout(BOUND),
        Err(Error::Rejected(ZeroDivision))
    );
}

#[test]
fn test_independent_chains_from_one_parent() {
    let (resolver, parent) = pair::channel::<i32, ZeroDivision>();
    let calls = Arc::new(Mutex::new(0));
    let (a_calls, b_calls) = (calls.clone(), calls.clone());
    let a = parent.then(move |v| {
        *a_calls.lock().unwrap() += 1;
        Ok(v + 1)
    });
    let b = parent.then(move |v| {
        *b_calls.lock().unwrap() += 1;
        Ok(v - 1)
    });

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        resolver.resolve(42);
    });
    assert_eq!(a.wait_timeout(BOUND), Ok(43));
    assert_eq!(b.wait_timeout(BOUND), Ok(41));
    producer.join().expect("The producer thread has panicked");
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[test]
fn test_second_settlement_is_invalid() {
    let promise = Promise::<i32, ZeroDivision>::new();
    promise.fulfill(1).unwrap();
    assert_eq!(promise.fulfill(2), Err(Error::InvalidState(Status::Fulfilled)));
    assert_eq!(promise.wait(), Ok(1));

    let promise = Promise::<i32, ZeroDivision>::new();
    promise.reject(ZeroDivision).unwrap();
    assert_eq!(promise.fulfill(2), Err(Error::InvalidState(Status::Rejected)));
    assert_eq!(promise.wait(), Err(Error::Rejected(ZeroDivision)));
}

#[test]
fn test_wait_timeout_on_pending() {
    let promise = Promise::<i32, ZeroDivision>::new();
    let result = promise.wait_timeout(Duration::from_millis(10));
    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(promise.status(), Status::Pending);
}

#[test]
fn test_worker_pipeline() {
    let notebook = pair::spawn("create-notebook", || {
        thread::sleep(Duration::from_millis(10));
        Ok::<_, ZeroDivision>(String::from("nb-1"))
    })
    .unwrap();
    let frame = notebook
        .and_then(|id| {
            pair::spawn("create-frame", move || Ok(format!("{id}/frame-1")))
                .map_err(|_| ZeroDivision)
        })
        .catch(|_| Ok(String::from("fallback")));
    assert_eq!(frame.wait_timeout(BOUND), Ok(String::from("nb-1/frame-1")));
}
