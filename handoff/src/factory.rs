//! The value source behind a critical section.
//!
//! A [`ValueFactory`] creates one value per call. Any `Fn() -> T` closure is a
//! factory; fallible and finite sources are wrapped with [`try_from_fn`] and
//! [`from_iter`].

use crate::error::FactoryError;

use core::fmt;
use parking_lot::Mutex;

/// Produces one value per invocation.
///
/// Implementations must be safe to call repeatedly and from whichever thread
/// drives production. `create` is called while the critical section's lock is
/// held, so it should return quickly and must not touch the same section.
pub trait ValueFactory<T>: Send + Sync {
  /// Creates the next value.
  fn create(&self) -> Result<T, FactoryError>;
}

impl<T, F> ValueFactory<T> for F
where
  F: Fn() -> T + Send + Sync,
{
  #[inline]
  fn create(&self) -> Result<T, FactoryError> {
    Ok(self())
  }
}

/// A factory backed by a fallible closure. See [`try_from_fn`].
pub struct TryFnFactory<F> {
  f: F,
}

impl<F> fmt::Debug for TryFnFactory<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TryFnFactory").finish_non_exhaustive()
  }
}

impl<T, F> ValueFactory<T> for TryFnFactory<F>
where
  F: Fn() -> Result<T, FactoryError> + Send + Sync,
{
  #[inline]
  fn create(&self) -> Result<T, FactoryError> {
    (self.f)()
  }
}

/// Wraps a closure that may fail.
pub fn try_from_fn<T, F>(f: F) -> TryFnFactory<F>
where
  F: Fn() -> Result<T, FactoryError> + Send + Sync,
{
  TryFnFactory { f }
}

/// A factory that hands out the items of an iterator. See [`from_iter`].
pub struct IterFactory<I> {
  iter: Mutex<I>,
}

impl<I> fmt::Debug for IterFactory<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IterFactory").finish_non_exhaustive()
  }
}

impl<I> ValueFactory<I::Item> for IterFactory<I>
where
  I: Iterator + Send,
{
  fn create(&self) -> Result<I::Item, FactoryError> {
    self.iter.lock().next().ok_or(FactoryError::Exhausted)
  }
}

/// Creates a factory yielding each item of `iter` in order, then
/// `FactoryError::Exhausted` on every later call.
pub fn from_iter<I>(iter: I) -> IterFactory<I::IntoIter>
where
  I: IntoIterator,
  I::IntoIter: Send,
{
  IterFactory {
    iter: Mutex::new(iter.into_iter()),
  }
}
