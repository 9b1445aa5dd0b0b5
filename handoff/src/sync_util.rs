//! Utilities for synchronous blocking and parking.
//! Thin helpers around std::thread::park_timeout/unpark used by the ticker's
//! interruptible sleep.

use std::thread;
use std::time::{Duration, Instant};

/// Parks the current thread for a given duration.
#[inline]
pub(crate) fn park_thread_timeout(duration: Duration) {
  thread::park_timeout(duration);
}

/// Unparks the given thread.
#[inline]
pub(crate) fn unpark_thread(thread: &thread::Thread) {
  thread.unpark();
}

/// Parks until `deadline` or until `stop_condition` holds, whichever comes
/// first. A `None` deadline never arrives. Spurious unparks are absorbed.
///
/// Returns `true` if the deadline was reached, `false` if stopped early.
pub(crate) fn park_until_cond<F>(deadline: Option<Instant>, stop_condition: F) -> bool
where
  F: Fn() -> bool,
{
  loop {
    if stop_condition() {
      return false;
    }
    match deadline {
      Some(deadline) => {
        let now = Instant::now();
        if now >= deadline {
          return true;
        }
        park_thread_timeout(deadline - now);
      }
      None => thread::park(),
    }
  }
}
