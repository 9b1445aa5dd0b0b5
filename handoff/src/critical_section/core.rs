//! The mutex-protected state shared by producer and consumers.
//!
//! Synchronous consumers wait on the section's `Condvar`; asynchronous consumers
//! register a `Waker` in `async_waiters`. Every insertion wakes exactly one
//! waiter, async waiters first since they are cheaper to wake. A woken waiter
//! always re-checks the buffer under the lock, so a wake is a hint and never a
//! claim on a particular value.

use std::collections::VecDeque;
use std::task::Waker;

/// An async consumer parked until a value arrives.
#[derive(Debug)]
pub(crate) struct AsyncWaiter {
  pub(crate) id: u64,
  pub(crate) waker: Waker,
}

/// Everything guarded by the critical section's lock.
#[derive(Debug)]
pub(crate) struct SectionState<T> {
  /// Pending values, oldest at the front.
  pub(crate) buffer: VecDeque<T>,
  /// Parked async consumers in arrival order.
  pub(crate) async_waiters: VecDeque<AsyncWaiter>,
  /// Number of threads currently blocked on the condvar.
  pub(crate) sync_waiting: usize,
  /// Source of unique async waiter ids.
  next_waiter_id: u64,
  pub(crate) closed: bool,
}

impl<T> SectionState<T> {
  pub(crate) fn new() -> Self {
    SectionState {
      buffer: VecDeque::new(),
      async_waiters: VecDeque::new(),
      sync_waiting: 0,
      next_waiter_id: 0,
      closed: false,
    }
  }

  /// Registers or refreshes the waker for the async consumer holding `slot`.
  ///
  /// A waiter that is still queued keeps its place in line. A waiter that was
  /// already popped by a producer (woken, but lost the value to a faster
  /// consumer) rejoins at the back.
  pub(crate) fn register_async(&mut self, slot: &mut Option<u64>, waker: &Waker) {
    if let Some(id) = *slot {
      if let Some(waiter) = self.async_waiters.iter_mut().find(|w| w.id == id) {
        if !waiter.waker.will_wake(waker) {
          waiter.waker = waker.clone();
        }
        return;
      }
    }

    let id = self.next_waiter_id;
    self.next_waiter_id = self.next_waiter_id.wrapping_add(1);
    self.async_waiters.push_back(AsyncWaiter {
      id,
      waker: waker.clone(),
    });
    *slot = Some(id);
  }

  /// Removes the async waiter holding `slot`.
  ///
  /// Returns `true` if the waiter was no longer queued, meaning a producer
  /// already spent a wake-up on it.
  pub(crate) fn deregister_async(&mut self, slot: &mut Option<u64>) -> bool {
    let Some(id) = slot.take() else {
      return false;
    };
    match self.async_waiters.iter().position(|w| w.id == id) {
      Some(index) => {
        self.async_waiters.remove(index);
        false
      }
      None => true,
    }
  }

  /// Picks the async waiter that should be told about a new value, if any.
  /// Returns `None` when the wake should go to a blocked thread instead.
  #[inline]
  pub(crate) fn take_async_waiter(&mut self) -> Option<Waker> {
    self.async_waiters.pop_front().map(|w| w.waker)
  }
}
