// src/critical_section/mod.rs

//! The lock-guarded FIFO hand-off at the heart of the crate.
//!
//! A [`CriticalSection`] owns an unbounded buffer, the value factory that fills
//! it, and a wake signal. `produce` creates one value and appends it; `consume`
//! blocks until the buffer is non-empty and removes the oldest value.
//!
//! ### Locking
//!
//! A single `parking_lot::Mutex` guards the buffer, the waiter bookkeeping and
//! the closed flag together. Size checks, insertion/removal and signalling all
//! happen inside one lock acquisition, so no observer can see a half-applied
//! update.
//!
//! ### Waking
//!
//! Blocked threads wait on a `parking_lot::Condvar` in a "wait while empty"
//! loop. This is race-free for any number of consumers: when two consumers
//! race for one value, the loser simply finds the buffer empty again and goes
//! back to sleep until the next insertion.
//!
//! Parked futures are woken ahead of blocked threads. A future that has
//! registered but is never polled again (say, a losing `select!` branch that
//! is kept alive) absorbs that wake-up, and a blocked thread may then sleep
//! with a value in the buffer until the next insertion or until the future is
//! dropped, which forwards the wake-up. The value itself is never lost.
//!
//! ### Closing
//!
//! [`close`](CriticalSection::close) is the disposal operation. It is
//! idempotent, drops buffered values, and releases every blocked consumer with
//! `Closed`. Any later `produce`, `push` or `consume` reports `Closed` too.

pub use async_impl::{ConsumeFuture, ConsumeStream};

mod async_impl;
mod core;

#[cfg(test)]
mod tests;

use self::core::SectionState;
use crate::error::{
  ConsumeError, ConsumeTimeoutError, FactoryError, ProduceError, PushError, TryConsumeError,
};
use crate::factory::ValueFactory;

use ::core::fmt;
use ::core::mem;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A thread-safe FIFO hand-off between one producer and many consumers.
pub struct CriticalSection<T> {
  factory: Box<dyn ValueFactory<T>>,
  state: Mutex<SectionState<T>>,
  available: Condvar,
}

impl<T> fmt::Debug for CriticalSection<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("CriticalSection")
      .field("len", &state.buffer.len())
      .field("closed", &state.closed)
      .field("sync_waiting", &state.sync_waiting)
      .field("async_waiting", &state.async_waiters.len())
      .finish_non_exhaustive()
  }
}

impl<T: Send> CriticalSection<T> {
  /// Creates an empty, open critical section fed by `factory`.
  pub fn new<F>(factory: F) -> Self
  where
    F: ValueFactory<T> + 'static,
  {
    Self::from_boxed(Box::new(factory))
  }

  pub(crate) fn from_boxed(factory: Box<dyn ValueFactory<T>>) -> Self {
    CriticalSection {
      factory,
      state: Mutex::new(SectionState::new()),
      available: Condvar::new(),
    }
  }

  /// Creates one value with the factory and appends it to the buffer,
  /// waking one waiting consumer.
  ///
  /// The factory runs under the lock. If it fails, nothing is enqueued and
  /// the failure is returned to the caller.
  pub fn produce(&self) -> Result<(), ProduceError> {
    let mut guard = self.state.lock();
    if guard.closed {
      return Err(ProduceError::Closed);
    }
    let value = self.factory.create().map_err(|e: FactoryError| {
      tracing::trace!(error = %e, "factory failed, nothing enqueued");
      ProduceError::Factory(e)
    })?;
    self.enqueue_and_signal(guard, value);
    Ok(())
  }

  /// Appends an externally created value, with the same wake semantics as
  /// [`produce`](Self::produce).
  pub fn push(&self, value: T) -> Result<(), PushError<T>> {
    let guard = self.state.lock();
    if guard.closed {
      return Err(PushError::Closed(value));
    }
    self.enqueue_and_signal(guard, value);
    Ok(())
  }

  fn enqueue_and_signal(&self, mut guard: MutexGuard<'_, SectionState<T>>, value: T) {
    guard.buffer.push_back(value);
    tracing::trace!(len = guard.buffer.len(), "value enqueued");

    if let Some(waker) = guard.take_async_waiter() {
      drop(guard);
      waker.wake();
    } else if guard.sync_waiting > 0 {
      self.available.notify_one();
    }
  }

  /// Passes a wake-up on to the next waiter while values remain buffered.
  /// Used when an async consumer that was woken gives up without consuming.
  pub(crate) fn forward_wakeup(&self, mut guard: MutexGuard<'_, SectionState<T>>) {
    if guard.buffer.is_empty() {
      return;
    }
    if let Some(waker) = guard.take_async_waiter() {
      drop(guard);
      waker.wake();
    } else if guard.sync_waiting > 0 {
      self.available.notify_one();
    }
  }

  /// Removes and returns the oldest value, blocking the calling thread until
  /// one is available.
  ///
  /// There is no timeout: this waits until a value is produced or the section
  /// is closed. Use [`consume_timeout`](Self::consume_timeout) for a bounded
  /// wait.
  pub fn consume(&self) -> Result<T, ConsumeError> {
    let mut guard = self.state.lock();
    loop {
      if guard.closed {
        return Err(ConsumeError::Closed);
      }
      if let Some(value) = guard.buffer.pop_front() {
        tracing::trace!(remaining = guard.buffer.len(), "value consumed");
        return Ok(value);
      }
      guard.sync_waiting += 1;
      self.available.wait(&mut guard);
      guard.sync_waiting -= 1;
    }
  }

  /// Like [`consume`](Self::consume), but gives up after `timeout`.
  pub fn consume_timeout(&self, timeout: Duration) -> Result<T, ConsumeTimeoutError> {
    let start_time = Instant::now();
    let mut guard = self.state.lock();
    loop {
      if guard.closed {
        return Err(ConsumeTimeoutError::Closed);
      }
      if let Some(value) = guard.buffer.pop_front() {
        tracing::trace!(remaining = guard.buffer.len(), "value consumed");
        return Ok(value);
      }
      let elapsed = start_time.elapsed();
      if elapsed >= timeout {
        return Err(ConsumeTimeoutError::Timeout);
      }
      // `wait_for` treats a deadline past `Instant`'s range as no deadline.
      guard.sync_waiting += 1;
      let result = self.available.wait_for(&mut guard, timeout - elapsed);
      guard.sync_waiting -= 1;

      if result.timed_out() && guard.buffer.is_empty() && !guard.closed {
        return Err(ConsumeTimeoutError::Timeout);
      }
    }
  }

  /// Removes and returns the oldest value without blocking.
  pub fn try_consume(&self) -> Result<T, TryConsumeError> {
    let mut guard = self.state.lock();
    if guard.closed {
      return Err(TryConsumeError::Closed);
    }
    match guard.buffer.pop_front() {
      Some(value) => Ok(value),
      None => Err(TryConsumeError::Empty),
    }
  }

  /// Returns a future that resolves to the oldest value once one is available.
  ///
  /// The future does not depend on any particular async runtime.
  pub fn consume_async(&self) -> ConsumeFuture<'_, T> {
    ConsumeFuture::new(self)
  }

  /// Returns a stream yielding values in FIFO order until the section is
  /// closed.
  pub fn stream(&self) -> ConsumeStream<'_, T> {
    ConsumeStream::new(self)
  }

  /// Closes the section.
  ///
  /// Buffered values are dropped and every blocked consumer, sync or async,
  /// returns `Closed`. Calling this more than once is a no-op.
  pub fn close(&self) {
    let (dropped, async_waiters) = {
      let mut guard = self.state.lock();
      if guard.closed {
        return;
      }
      guard.closed = true;
      (
        mem::take(&mut guard.buffer),
        mem::take(&mut guard.async_waiters),
      )
    };
    tracing::debug!(
      dropped = dropped.len(),
      async_waiters = async_waiters.len(),
      "critical section closed"
    );

    // Wake waiters outside the lock.
    self.available.notify_all();
    for waiter in async_waiters {
      waiter.waker.wake();
    }
    drop(dropped);
  }

  /// Returns `true` once [`close`](Self::close) has been called.
  pub fn is_closed(&self) -> bool {
    self.state.lock().closed
  }

  /// Returns the number of values waiting to be consumed.
  pub fn len(&self) -> usize {
    self.state.lock().buffer.len()
  }

  /// Returns `true` if no values are waiting to be consumed.
  pub fn is_empty(&self) -> bool {
    self.state.lock().buffer.is_empty()
  }

  /// Returns the number of consumers, sync and async, currently parked.
  pub fn waiting_consumers(&self) -> usize {
    let guard = self.state.lock();
    guard.sync_waiting + guard.async_waiters.len()
  }
}
