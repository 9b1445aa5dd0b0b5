//! The periodic trigger that drives production.
//!
//! A [`Ticker`] owns a background thread that calls
//! [`CriticalSection::produce`] once per interval. The critical section knows
//! nothing about time; the ticker only holds a shared handle to it.

use crate::critical_section::CriticalSection;
use crate::error::{BuildError, ProduceError};
use crate::sync_util;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Counters updated by the ticker thread.
#[derive(Debug, Default)]
pub(crate) struct TickerMetrics {
  ticks: AtomicU64,
  produced: AtomicU64,
  failed: AtomicU64,
}

impl TickerMetrics {
  pub(crate) fn snapshot(&self) -> TickerStats {
    TickerStats {
      ticks: self.ticks.load(Ordering::Relaxed),
      produced: self.produced.load(Ordering::Relaxed),
      failed: self.failed.load(Ordering::Relaxed),
    }
  }
}

/// A point-in-time view of a ticker's activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickerStats {
  /// Number of times the ticker fired.
  pub ticks: u64,
  /// Ticks that enqueued a value.
  pub produced: u64,
  /// Ticks where the value factory failed.
  pub failed: u64,
}

/// A background thread calling `produce` on a fixed cadence.
///
/// Dropping the ticker stops it.
#[derive(Debug)]
pub struct Ticker {
  handle: Option<JoinHandle<()>>,
  stop_flag: Arc<AtomicBool>,
  metrics: Arc<TickerMetrics>,
}

impl Ticker {
  /// Spawns a ticker thread named `thread_name`.
  ///
  /// The first tick fires after `start_delay` (zero fires immediately), then
  /// every `interval` measured from the start of the previous tick.
  pub fn spawn<T: Send + 'static>(
    section: Arc<CriticalSection<T>>,
    interval: Duration,
    start_delay: Duration,
    thread_name: &str,
  ) -> Result<Self, BuildError> {
    Self::spawn_with_metrics(
      section,
      interval,
      start_delay,
      thread_name,
      Arc::new(TickerMetrics::default()),
    )
  }

  pub(crate) fn spawn_with_metrics<T: Send + 'static>(
    section: Arc<CriticalSection<T>>,
    interval: Duration,
    start_delay: Duration,
    thread_name: &str,
    metrics: Arc<TickerMetrics>,
  ) -> Result<Self, BuildError> {
    if interval.is_zero() {
      return Err(BuildError::ZeroInterval);
    }
    if thread_name.contains('\0') {
      return Err(BuildError::InvalidThreadName);
    }

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_clone = stop_flag.clone();
    let metrics_clone = metrics.clone();

    let handle = thread::Builder::new()
      .name(thread_name.to_string())
      .spawn(move || {
        Self::run(&section, interval, start_delay, &stop_clone, &metrics_clone);
      })
      .map_err(|e| BuildError::Spawn(e.to_string()))?;

    tracing::debug!(
      thread = thread_name,
      interval_ms = interval.as_millis() as u64,
      start_delay_ms = start_delay.as_millis() as u64,
      "ticker started"
    );

    Ok(Self {
      handle: Some(handle),
      stop_flag,
      metrics,
    })
  }

  fn run<T: Send>(
    section: &CriticalSection<T>,
    interval: Duration,
    start_delay: Duration,
    stop_flag: &AtomicBool,
    metrics: &TickerMetrics,
  ) {
    // `None` is a tick too far away for `Instant` to represent; it never fires.
    let mut next_tick = Instant::now().checked_add(start_delay);

    while sync_util::park_until_cond(next_tick, || stop_flag.load(Ordering::Acquire)) {
      let tick_start = Instant::now();
      metrics.ticks.fetch_add(1, Ordering::Relaxed);

      match panic::catch_unwind(AssertUnwindSafe(|| section.produce())) {
        Ok(Ok(())) => {
          metrics.produced.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(ProduceError::Closed)) => {
          tracing::debug!("critical section closed, ticker exiting");
          return;
        }
        Ok(Err(ProduceError::Factory(e))) => {
          metrics.failed.fetch_add(1, Ordering::Relaxed);
          tracing::warn!(error = %e, "value factory failed, skipping tick");
        }
        Err(payload) => {
          // Readers would otherwise wait forever on a producer that is gone.
          metrics.failed.fetch_add(1, Ordering::Relaxed);
          tracing::warn!(
            panic = panic_message(payload.as_ref()),
            "value factory panicked, closing critical section"
          );
          section.close();
          return;
        }
      }

      // A slow tick eats into the next sleep instead of shifting the schedule.
      next_tick = tick_start.checked_add(interval);
    }
    tracing::debug!("ticker stopped");
  }

  /// Returns a snapshot of the ticker's counters.
  pub fn stats(&self) -> TickerStats {
    self.metrics.snapshot()
  }

  /// Returns `true` while the ticker thread is alive.
  pub fn is_running(&self) -> bool {
    self.handle.as_ref().is_some_and(|h| !h.is_finished())
  }

  /// Stops the ticker and waits for its thread to exit. Idempotent.
  pub fn stop(&mut self) {
    let Some(handle) = self.handle.take() else {
      return;
    };
    self.stop_flag.store(true, Ordering::Release);
    sync_util::unpark_thread(handle.thread());
    if let Err(payload) = handle.join() {
      tracing::warn!(panic = panic_message(payload.as_ref()), "ticker thread panicked");
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.as_str()
  } else {
    "<non-string panic payload>"
  }
}

impl Drop for Ticker {
  fn drop(&mut self) {
    self.stop();
  }
}
