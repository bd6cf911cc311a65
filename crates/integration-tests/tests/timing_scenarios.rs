//! Wall-clock Timing Scenarios
//!
//! Two 120ms calls issued back to back, against real time, plus admission
//! under true multi-threaded contention.

use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskgate_core::{BoundedSequentialQueue, TaskError};
use tokio::sync::Semaphore;
use tokio::time::{sleep, Instant};

const DELAY: Duration = Duration::from_millis(120);

/// Timer operation: sleeps for the requested delay and reports when it finished
fn counted_timer(
    counter: Arc<AtomicUsize>,
) -> impl Fn(Duration) -> BoxFuture<'static, Result<Instant, String>> + Send + Sync + 'static {
    move |delay: Duration| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            sleep(delay).await;
            Ok(Instant::now())
        }
        .boxed()
    }
}

/// Scenario: Queue(2), two calls back to back -> both run, one after the other
#[tokio::test]
async fn test_capacity_two_runs_both_calls_sequentially() {
    let queue = BoundedSequentialQueue::new(2).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let timer = queue.bind(counted_timer(calls.clone()));

    let start = Instant::now();
    let first = tokio::spawn(timer.call(DELAY));
    let end = timer.call(DELAY).await.unwrap();

    let first_end = first.await.unwrap().unwrap();
    let first_elapsed = first_end - start;
    assert!(
        first_elapsed >= DELAY && first_elapsed < DELAY * 2,
        "first settled after {:?}",
        first_elapsed
    );
    assert!(end - start >= DELAY * 2, "second settled after {:?}", end - start);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Scenario: Queue(1), two calls back to back -> second fails immediately
#[tokio::test]
async fn test_capacity_one_rejects_second_call_immediately() {
    let queue = BoundedSequentialQueue::new(1).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let timer = queue.bind(counted_timer(calls.clone()));

    let start = Instant::now();
    let first = timer.call(DELAY);

    let err = timer.call(DELAY).await.unwrap_err();
    assert!(start.elapsed() < DELAY);
    assert_eq!(err.to_string(), "Queue limit reached");

    let elapsed = first.await.unwrap() - start;
    assert!(elapsed >= DELAY && elapsed < DELAY * 2, "first settled after {:?}", elapsed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Scenario: supervised Queue(1) -> overflow goes to the handler, caller sees success
#[tokio::test]
async fn test_safe_binding_reports_overflow_to_handler() {
    let queue = BoundedSequentialQueue::new(1).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = errors.clone();
    let timer = queue.bind_safe(counted_timer(calls.clone()), move |err: TaskError<String>| {
        sink.lock().unwrap().push(err.to_string());
    });

    let start = Instant::now();
    let first = timer.call(DELAY);

    assert_eq!(timer.call(DELAY).await, None);
    assert!(start.elapsed() < DELAY);
    assert_eq!(*errors.lock().unwrap(), vec!["Queue limit reached".to_string()]);

    let elapsed = first.await.unwrap() - start;
    assert!(elapsed >= DELAY && elapsed < DELAY * 2, "first settled after {:?}", elapsed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(errors.lock().unwrap().len(), 1);
}

/// Admission stays atomic when calls race in from many worker threads
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admission_never_exceeds_capacity() {
    const CAPACITY: usize = 5;
    const CALLERS: usize = 64;

    let queue = BoundedSequentialQueue::new(CAPACITY).unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let op = {
        let gate = gate.clone();
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        move |id: usize| {
            let gate = gate.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                // Hold the slot until every caller has attempted admission
                let _permit = gate.acquire().await.map_err(|e| e.to_string())?;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(id)
            }
        }
    };
    let bound = queue.bind(op);

    let mut attempts = Vec::with_capacity(CALLERS);
    for id in 0..CALLERS {
        let bound = bound.clone();
        attempts.push(tokio::spawn(async move { bound.call(id) }));
    }

    let mut admitted = Vec::new();
    let mut rejected = 0;
    for attempt in attempts {
        let pending = attempt.await.unwrap();
        if pending.is_rejected() {
            rejected += 1;
        } else {
            admitted.push(pending);
        }
    }

    assert_eq!(admitted.len(), CAPACITY);
    assert_eq!(rejected, CALLERS - CAPACITY);
    assert_eq!(queue.occupied(), CAPACITY);

    gate.add_permits(1);
    for pending in admitted {
        pending.await.unwrap();
    }

    queue.idle().await;
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(queue.stats().succeeded, CAPACITY as u64);
    assert_eq!(queue.stats().rejected, (CALLERS - CAPACITY) as u64);
}
