//! # Sensor pipeline
//!
//! Demonstrates the three building blocks together:
//! - a producer sampling a fake sensor, fanning readings out to two consumers
//! - a small bounded consumer that drops readings when it falls behind
//! - a dispatcher announcing alerts to several handlers
//! - a background worker computing a summary with progress reports
//!
//! Run with `RUST_LOG=pipevisor=debug cargo run --example pipeline` to see
//! lifecycle logs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pipevisor::{
    BackgroundWorker, BackoffPolicy, ConsumeFn, Consumer, Dispatcher, HookError, JitterPolicy,
    ProduceFn, Producer, Progress,
};

#[derive(Debug)]
struct Reading {
    seq: u64,
    celsius: f64,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pipevisor=debug,pipeline=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let alerts: Arc<Dispatcher<(u64, f64)>> = Arc::new(Dispatcher::new());
    alerts.attach(|(seq, t)| tracing::warn!(seq, celsius = t, "temperature alert"));
    let alert_count = Arc::new(AtomicU64::new(0));
    {
        let count = Arc::clone(&alert_count);
        alerts.attach(move |_| {
            count.fetch_add(1, Ordering::Relaxed);
        });
    }

    // Sensor: one reading every few ms, a dropout every 7th sample.
    let seq = Arc::new(AtomicU64::new(0));
    let sensor = Producer::builder(ProduceFn::new(move || {
        let n = seq.fetch_add(1, Ordering::Relaxed);
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            match n {
                n if n >= 60 => Ok(None),
                n if n % 7 == 6 => Err(HookError::fail(format!("sensor dropout at sample {n}"))),
                n => Ok(Some(Reading {
                    seq: n,
                    celsius: 20.0 + (n % 13) as f64 * 1.5,
                })),
            }
        }
    }))
    .with_name("sensor")
    .with_idle_backoff(BackoffPolicy {
        first: Duration::from_millis(5),
        max: Duration::from_millis(100),
        factor: 2.0,
        jitter: JitterPolicy::Equal,
    })
    .on_error(|e| tracing::info!(error = %e, "sensor error"))
    .build()?;

    let a = Arc::clone(&alerts);
    let monitor = Arc::new(
        Consumer::builder(ConsumeFn::new(move |r: Arc<Reading>| {
            let a = Arc::clone(&a);
            async move {
                if r.celsius > 35.0 {
                    a.invoke(&(r.seq, r.celsius));
                }
                Ok::<_, HookError>(())
            }
        }))
        .with_name("monitor")
        .build()?,
    );

    let archive = Arc::new(
        Consumer::builder(ConsumeFn::new(|r: Arc<Reading>| async move {
            // Slow disk: the queue fills and newer readings are dropped.
            tokio::time::sleep(Duration::from_millis(25)).await;
            tracing::info!(seq = r.seq, "archived");
            Ok::<_, HookError>(())
        }))
        .with_name("archive")
        .with_capacity(4)
        .build()?,
    );

    monitor.run();
    archive.run();
    sensor.register_consumer(Arc::clone(&monitor));
    sensor.register_consumer(Arc::clone(&archive));
    sensor.run();

    tokio::time::sleep(Duration::from_millis(600)).await;
    sensor.stop().await;
    monitor.stop().await;
    archive.stop().await;

    let summary = BackgroundWorker::from_fn(
        "summary",
        |progress: Progress<u64>, total: u64| async move {
            for step in [25, 50, 75] {
                tokio::time::sleep(Duration::from_millis(10)).await;
                progress.report(step);
            }
            Ok::<_, HookError>(total)
        },
        |alerts| tracing::info!(alerts, "summary done"),
    )
    .on_progress(|pct| tracing::info!(pct, "summary progress"))
    .on_error(|e| tracing::error!(error = %e, "summary failed"));

    summary
        .run(alert_count.load(Ordering::Relaxed))
        .wait()
        .await;
    Ok(())
}
