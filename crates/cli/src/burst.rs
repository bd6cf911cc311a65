// Burst driver - issues back-to-back calls through one queue

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tabled::Tabled;
use taskgate_core::{BoundedSequentialQueue, QueueConfig, QueueStats, TaskError};
use tokio::time::Instant;
use tracing::warn;

/// Shape of one burst
#[derive(Debug, Clone)]
pub struct BurstOptions {
    pub calls: usize,
    pub delay: Duration,
    /// Every k-th executed call fails; 0 disables failures
    pub fail_every: usize,
    /// Use `bind_safe` instead of `bind`
    pub safe: bool,
}

/// Outcome of one call, as printed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct CallRow {
    pub call: usize,
    pub outcome: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct BurstReport {
    pub safe: bool,
    pub calls: Vec<CallRow>,
    pub stats: QueueStats,
    /// Messages received by the error handler (supervised mode only)
    pub diverted: Vec<String>,
}

/// Simulated network call: sleeps, then succeeds with its index or fails
fn simulated_call(
    delay: Duration,
    fail_every: usize,
) -> impl Fn(usize) -> BoxFuture<'static, Result<usize, String>> + Send + Sync + 'static {
    let executed = Arc::new(AtomicUsize::new(0));
    move |index: usize| {
        let executed = Arc::clone(&executed);
        async move {
            tokio::time::sleep(delay).await;
            let n = executed.fetch_add(1, Ordering::SeqCst) + 1;
            if fail_every > 0 && n % fail_every == 0 {
                Err(format!("simulated failure on call {}", index))
            } else {
                Ok(index)
            }
        }
        .boxed()
    }
}

/// Run one burst and wait for every call to settle
pub async fn run(config: &QueueConfig, options: BurstOptions) -> Result<BurstReport> {
    let queue = BoundedSequentialQueue::from_config(config).context("Failed to create queue")?;
    let op = simulated_call(options.delay, options.fail_every);
    let start = Instant::now();

    let mut handles = Vec::with_capacity(options.calls);
    let diverted = Arc::new(Mutex::new(Vec::new()));

    if options.safe {
        let sink = Arc::clone(&diverted);
        let bound = queue.bind_safe(op, move |err: TaskError<String>| {
            warn!(error = %err, "Call diverted to error handler");
            sink.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(err.to_string());
        });

        for call in 0..options.calls {
            let pending = bound.call(call);
            handles.push(tokio::spawn(async move {
                let outcome = match pending.await {
                    Some(value) => format!("ok ({})", value),
                    None => "diverted".to_string(),
                };
                (call, outcome, start.elapsed())
            }));
        }
    } else {
        let bound = queue.bind(op);

        for call in 0..options.calls {
            let pending = bound.call(call);
            handles.push(tokio::spawn(async move {
                let outcome = match pending.await {
                    Ok(value) => format!("ok ({})", value),
                    Err(TaskError::QueueFull) => "rejected: queue full".to_string(),
                    Err(e) => format!("failed: {}", e),
                };
                (call, outcome, start.elapsed())
            }));
        }
    }

    let mut calls = Vec::with_capacity(handles.len());
    for handle in handles {
        let (call, outcome, elapsed) = handle.await.context("Call reporter task failed")?;
        calls.push(CallRow {
            call,
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    queue.idle().await;

    let diverted = diverted
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clone();

    Ok(BurstReport {
        safe: options.safe,
        calls,
        stats: queue.stats(),
        diverted,
    })
}
