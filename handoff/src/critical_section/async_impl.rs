// src/critical_section/async_impl.rs

//! Future and stream based consumption.

use super::CriticalSection;
use crate::error::ConsumeError;

use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

impl<T: Send> CriticalSection<T> {
  /// Shared poll logic for [`ConsumeFuture`] and [`ConsumeStream`].
  ///
  /// `waiter` holds the caller's registration id between polls.
  pub(crate) fn poll_consume(
    &self,
    waiter: &mut Option<u64>,
    cx: &mut Context<'_>,
  ) -> Poll<Result<T, ConsumeError>> {
    let mut guard = self.state.lock();

    if guard.closed {
      // `close` already drained the waiter queue.
      *waiter = None;
      return Poll::Ready(Err(ConsumeError::Closed));
    }

    if let Some(value) = guard.buffer.pop_front() {
      guard.deregister_async(waiter);
      tracing::trace!(remaining = guard.buffer.len(), "value consumed");
      return Poll::Ready(Ok(value));
    }

    guard.register_async(waiter, cx.waker());
    Poll::Pending
  }

  /// Drops the registration held in `waiter`, forwarding an already spent
  /// wake-up so the value it announced is not stranded.
  pub(crate) fn cancel_async_waiter(&self, waiter: &mut Option<u64>) {
    if waiter.is_none() {
      return;
    }
    let mut guard = self.state.lock();
    if guard.deregister_async(waiter) {
      self.forward_wakeup(guard);
    }
  }
}

/// A future that completes with the oldest buffered value.
///
/// Created by [`CriticalSection::consume_async`].
#[must_use = "futures do nothing unless you .await or poll them"]
#[derive(Debug)]
pub struct ConsumeFuture<'a, T: Send> {
  section: &'a CriticalSection<T>,
  waiter: Option<u64>,
}

impl<'a, T: Send> ConsumeFuture<'a, T> {
  pub(super) fn new(section: &'a CriticalSection<T>) -> Self {
    Self {
      section,
      waiter: None,
    }
  }
}

impl<'a, T: Send> Future for ConsumeFuture<'a, T> {
  type Output = Result<T, ConsumeError>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = &mut *self;
    this.section.poll_consume(&mut this.waiter, cx)
  }
}

impl<'a, T: Send> Drop for ConsumeFuture<'a, T> {
  fn drop(&mut self) {
    self.section.cancel_async_waiter(&mut self.waiter);
  }
}

/// A stream of values in FIFO order, ending when the section is closed.
///
/// Created by [`CriticalSection::stream`].
#[must_use = "streams do nothing unless polled"]
#[derive(Debug)]
pub struct ConsumeStream<'a, T: Send> {
  section: &'a CriticalSection<T>,
  waiter: Option<u64>,
}

impl<'a, T: Send> ConsumeStream<'a, T> {
  pub(super) fn new(section: &'a CriticalSection<T>) -> Self {
    Self {
      section,
      waiter: None,
    }
  }
}

impl<'a, T: Send> Stream for ConsumeStream<'a, T> {
  type Item = T;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = &mut *self;
    match this.section.poll_consume(&mut this.waiter, cx) {
      Poll::Ready(Ok(value)) => Poll::Ready(Some(value)),
      Poll::Ready(Err(ConsumeError::Closed)) => Poll::Ready(None),
      Poll::Pending => Poll::Pending,
    }
  }
}

impl<'a, T: Send> Drop for ConsumeStream<'a, T> {
  fn drop(&mut self) {
    self.section.cancel_async_waiter(&mut self.waiter);
  }
}
