use rstream::{CloseHandler, RStream, StreamError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn counting_handler(counter: &Arc<AtomicUsize>) -> impl Fn() -> Result<(), std::io::Error> + Send + Sync + 'static {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_terminal_operation_closes_stream_once() {
    let closed = Arc::new(AtomicUsize::new(0));
    let result = RStream::of(1..=5)
        .on_close(counting_handler(&closed))
        .filter(|x| x % 2 == 1)
        .map(|x| x * x)
        .to_vec()
        .unwrap();

    assert_eq!(result, vec![1, 9, 25]);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_explicit_close_runs_handlers_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (first, second) = (log.clone(), log.clone());

    RStream::of(vec![1])
        .on_close(move || {
            first.lock().unwrap().push("A");
            Ok::<_, std::io::Error>(())
        })
        .on_close(move || {
            second.lock().unwrap().push("B");
            Ok::<_, std::io::Error>(())
        })
        .close()
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
}

#[test]
fn test_first_close_failure_reported_rest_suppressed() {
    let ran = Arc::new(AtomicUsize::new(0));
    let (a, b) = (ran.clone(), ran.clone());

    let err = RStream::of(vec![1, 2])
        .on_close(move || {
            a.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("A failed")
        })
        .on_close(move || {
            b.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("B failed")
        })
        .close()
        .unwrap_err();

    assert_eq!(ran.load(Ordering::SeqCst), 2, "every handler runs");
    match &err {
        StreamError::CloseFailed { first, suppressed } => {
            assert_eq!(first.to_string(), "callback failed: A failed");
            assert_eq!(suppressed.len(), 1);
            assert_eq!(suppressed[0].to_string(), "callback failed: B failed");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.suppressed().len(), 1);
}

#[test]
fn test_close_failure_after_successful_operation() {
    let result = RStream::of(vec![1, 2, 3])
        .on_close(|| Err::<(), _>("release failed"))
        .sum();
    assert!(matches!(result, Err(StreamError::CloseFailed { .. })));
}

#[test]
fn test_operation_failure_wins_over_close_failure() {
    let result = RStream::of(vec![1, 2, 3])
        .on_close(|| Err::<(), _>("release failed"))
        .try_map(|x| if x == 2 { Err("bad element") } else { Ok(x) })
        .to_vec();
    match result {
        Err(StreamError::Callback(e)) => assert_eq!(e.to_string(), "bad element"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_same_handler_registered_twice_runs_once() {
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = closed.clone();
    let handler: CloseHandler = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    RStream::of(vec![1])
        .on_close_handler(handler.clone())
        .map(|x| x + 1)
        .on_close_handler(handler)
        .count()
        .unwrap();

    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_closes_unconsumed_stream() {
    let closed = Arc::new(AtomicUsize::new(0));
    {
        let _stream = RStream::of(vec![1, 2]).on_close(counting_handler(&closed)).map(|x| x * 2);
    }
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_close_handler_panic_is_captured() {
    let after = Arc::new(AtomicUsize::new(0));
    let err = RStream::of(vec![1])
        .on_close(|| -> Result<(), std::io::Error> { panic!("handler exploded") })
        .on_close(counting_handler(&after))
        .close()
        .unwrap_err();

    assert_eq!(after.load(Ordering::SeqCst), 1);
    match err {
        StreamError::CloseFailed { first, .. } => {
            assert!(matches!(*first, StreamError::WorkerPanicked(_)))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_flat_map_closes_inner_streams() {
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = closed.clone();

    let total = RStream::of(vec![1, 2, 3])
        .flat_map(move |x| RStream::of(vec![x; x as usize]).on_close(counting_handler(&counter)))
        .sum()
        .unwrap();

    assert_eq!(total, 1 + 2 * 2 + 3 * 3);
    assert_eq!(closed.load(Ordering::SeqCst), 3);
}

#[test]
fn test_head_and_tail_moves_handlers_to_tail() {
    let closed = Arc::new(AtomicUsize::new(0));
    let (head, tail) = RStream::of(vec![1, 2, 3])
        .on_close(counting_handler(&closed))
        .head_and_tail()
        .unwrap()
        .unwrap();

    assert_eq!(head, 1);
    assert_eq!(closed.load(Ordering::SeqCst), 0, "tail still owns the resources");
    assert_eq!(tail.to_vec().unwrap(), vec![2, 3]);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_combined_failures_keep_registration_order() {
    let left = RStream::of(vec![1]).on_close(|| Err::<(), _>("left"));
    let right = RStream::of(vec![2]).on_close(|| Err::<(), _>("right"));

    let err = left.append(right).to_vec().unwrap_err();
    match err {
        StreamError::CloseFailed { first, suppressed } => {
            assert_eq!(first.to_string(), "callback failed: left");
            assert_eq!(suppressed.len(), 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
