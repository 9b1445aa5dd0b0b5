// src/producer.rs

//! A critical section bundled with the ticker that feeds it.
//!
//! [`Producer`] is the consumer-facing surface. All of its read styles are
//! call-sites over the same blocking [`CriticalSection::consume`]:
//!
//! - [`read`](Producer::read) blocks the calling thread.
//! - [`read_async`](Producer::read_async) returns a future.
//! - [`read_with`](Producer::read_with) runs the read on a worker thread and
//!   reports completion through a callback.
//! - [`begin_read`](Producer::begin_read) starts the read on a worker thread
//!   and hands back a [`PendingRead`] to collect it later.

use crate::config::ProducerConfig;
use crate::critical_section::{ConsumeFuture, ConsumeStream, CriticalSection};
use crate::error::{BuildError, ConsumeError, ConsumeTimeoutError, TryConsumeError};
use crate::factory::ValueFactory;
use crate::ticker::{Ticker, TickerMetrics, TickerStats};

use core::fmt;
use parking_lot::Mutex;
use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A builder for [`Producer`] instances.
pub struct ProducerBuilder<T> {
  factory: Option<Box<dyn ValueFactory<T>>>,
  config: ProducerConfig,
}

impl<T> fmt::Debug for ProducerBuilder<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProducerBuilder")
      .field("has_factory", &self.factory.is_some())
      .field("config", &self.config)
      .finish()
  }
}

impl<T: Send + 'static> Default for ProducerBuilder<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> ProducerBuilder<T> {
  /// Creates a builder with the default configuration and no factory.
  pub fn new() -> Self {
    Self {
      factory: None,
      config: ProducerConfig::default(),
    }
  }

  /// Sets the value factory. Required.
  pub fn factory<F>(mut self, factory: F) -> Self
  where
    F: ValueFactory<T> + 'static,
  {
    self.factory = Some(Box::new(factory));
    self
  }

  /// Replaces the whole configuration, e.g. one loaded from YAML.
  pub fn config(mut self, config: ProducerConfig) -> Self {
    self.config = config;
    self
  }

  /// Sets the time between two productions.
  pub fn interval(mut self, interval: Duration) -> Self {
    self.config.interval = interval;
    self
  }

  /// Sets the delay before the first production.
  pub fn start_delay(mut self, delay: Duration) -> Self {
    self.config.start_delay = delay;
    self
  }

  /// Sets the ticker thread's name.
  pub fn thread_name(mut self, name: impl Into<String>) -> Self {
    self.config.thread_name = name.into();
    self
  }

  /// Validates the configuration and starts production.
  ///
  /// Fails with [`BuildError::MissingFactory`] before anything is produced
  /// when no factory was supplied.
  pub fn build(self) -> Result<Producer<T>, BuildError> {
    let factory = self.factory.ok_or(BuildError::MissingFactory)?;
    if self.config.interval.is_zero() {
      return Err(BuildError::ZeroInterval);
    }
    if self.config.thread_name.contains('\0') {
      return Err(BuildError::InvalidThreadName);
    }

    let section = Arc::new(CriticalSection::from_boxed(factory));
    let metrics = Arc::new(TickerMetrics::default());
    let ticker = Ticker::spawn_with_metrics(
      section.clone(),
      self.config.interval,
      self.config.start_delay,
      &self.config.thread_name,
      metrics.clone(),
    )
    .inspect_err(|_| section.close())?;

    Ok(Producer {
      section,
      ticker: Mutex::new(Some(ticker)),
      metrics,
      closed: AtomicBool::new(false),
    })
  }
}

/// Periodically produced values, readable from any number of threads or tasks.
///
/// Dropping the producer stops production and closes the critical section.
pub struct Producer<T: Send + 'static> {
  section: Arc<CriticalSection<T>>,
  ticker: Mutex<Option<Ticker>>,
  metrics: Arc<TickerMetrics>,
  closed: AtomicBool,
}

impl<T: Send + 'static> fmt::Debug for Producer<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Producer")
      .field("section", &self.section)
      .field("stats", &self.metrics.snapshot())
      .field("closed", &self.closed.load(Ordering::Relaxed))
      .finish()
  }
}

impl<T: Send + 'static> Producer<T> {
  /// Starts configuring a producer.
  pub fn builder() -> ProducerBuilder<T> {
    ProducerBuilder::new()
  }

  /// Blocks until a value is available and returns it.
  pub fn read(&self) -> Result<T, ConsumeError> {
    self.section.consume()
  }

  /// Blocks for at most `timeout` waiting for a value.
  pub fn read_timeout(&self, timeout: Duration) -> Result<T, ConsumeTimeoutError> {
    self.section.consume_timeout(timeout)
  }

  /// Takes a value only if one is already buffered.
  pub fn try_read(&self) -> Result<T, TryConsumeError> {
    self.section.try_consume()
  }

  /// Returns a future resolving to the next value.
  pub fn read_async(&self) -> ConsumeFuture<'_, T> {
    self.section.consume_async()
  }

  /// Returns a stream of values that ends when the producer is closed.
  pub fn stream(&self) -> ConsumeStream<'_, T> {
    self.section.stream()
  }

  /// Reads on a worker thread and passes the outcome to `on_complete`.
  ///
  /// Returns as soon as the worker is started.
  pub fn read_with<F>(&self, on_complete: F) -> io::Result<()>
  where
    F: FnOnce(Result<T, ConsumeError>) + Send + 'static,
  {
    let section = Arc::clone(&self.section);
    thread::Builder::new()
      .name("fibre-handoff-reader".to_string())
      .spawn(move || on_complete(section.consume()))?;
    Ok(())
  }

  /// Starts a read on a worker thread. Collect the value with
  /// [`PendingRead::end`].
  pub fn begin_read(&self) -> io::Result<PendingRead<T>> {
    let section = Arc::clone(&self.section);
    let handle = thread::Builder::new()
      .name("fibre-handoff-reader".to_string())
      .spawn(move || section.consume())?;
    Ok(PendingRead { handle })
  }

  /// Returns the ticker's counters.
  pub fn stats(&self) -> TickerStats {
    self.metrics.snapshot()
  }

  /// Returns the shared critical section.
  pub fn critical_section(&self) -> &Arc<CriticalSection<T>> {
    &self.section
  }

  /// Returns `true` once the producer has been closed.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  /// Stops the ticker, then closes the critical section, releasing every
  /// blocked reader with `Closed`. Calling this more than once is a no-op.
  pub fn close(&self) {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      self.close_internal();
    }
  }

  fn close_internal(&self) {
    // Stop production first so no tick races the close.
    let ticker = self.ticker.lock().take();
    if let Some(mut ticker) = ticker {
      ticker.stop();
    }
    self.section.close();
    tracing::debug!(stats = ?self.metrics.snapshot(), "producer closed");
  }
}

impl<T: Send + 'static> Drop for Producer<T> {
  fn drop(&mut self) {
    if !self.closed.swap(true, Ordering::AcqRel) {
      self.close_internal();
    }
  }
}

/// A read started by [`Producer::begin_read`].
#[derive(Debug)]
pub struct PendingRead<T> {
  handle: JoinHandle<Result<T, ConsumeError>>,
}

impl<T> PendingRead<T> {
  /// Returns `true` if the read has finished and `end` will not block.
  pub fn is_complete(&self) -> bool {
    self.handle.is_finished()
  }

  /// Waits for the read to finish and returns its outcome.
  pub fn end(self) -> Result<T, ConsumeError> {
    match self.handle.join() {
      Ok(result) => result,
      Err(payload) => panic::resume_unwind(payload),
    }
  }
}
