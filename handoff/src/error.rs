// src/error.rs

use core::fmt;
use std::error::Error as StdError;

// Implements `into_inner`, `Display` and `Error` for error enums whose every
// variant carries the rejected value back to the caller.
macro_rules! impl_error_for_enum_with_inner {
    (
        $enum_name:ident < $generic_param:ident >,
        $($variant:ident ( $message:expr ) ),+
        $(,)?
    ) => {
        impl<$generic_param> $enum_name<$generic_param> {
            /// Consumes the error, returning the value that could not be enqueued.
            #[inline]
            pub fn into_inner(self) -> $generic_param {
                match self {
                    $( $enum_name::$variant(v) => v, )+
                }
            }
        }

        impl<$generic_param> fmt::Display for $enum_name<$generic_param> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $( $enum_name::$variant(_) => f.write_str($message), )+
                }
            }
        }

        impl<$generic_param: fmt::Debug> StdError for $enum_name<$generic_param> {}
    };
}

/// Error returned by `push` when a value is handed to a closed critical section.
/// The value is returned to the caller.
#[derive(PartialEq, Eq, Clone)]
pub enum PushError<T> {
  /// The critical section has been closed.
  Closed(T),
}

impl<T> fmt::Debug for PushError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PushError::Closed(_) => write!(f, "PushError::Closed(..)"),
    }
  }
}

impl_error_for_enum_with_inner!(PushError<T>, Closed("critical section closed"));

/// The failure reported by a [`ValueFactory`](crate::ValueFactory).
#[derive(Debug)]
pub enum FactoryError {
  /// A finite factory has no more values to hand out.
  Exhausted,
  /// The factory failed while creating a value.
  Failed(Box<dyn StdError + Send + Sync + 'static>),
}

impl FactoryError {
  /// Wraps any error as a factory failure.
  pub fn new<E>(error: E) -> Self
  where
    E: Into<Box<dyn StdError + Send + Sync + 'static>>,
  {
    FactoryError::Failed(error.into())
  }

  /// Returns `true` if the factory ran out of values.
  pub fn is_exhausted(&self) -> bool {
    matches!(self, FactoryError::Exhausted)
  }
}

impl fmt::Display for FactoryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FactoryError::Exhausted => write!(f, "value factory exhausted"),
      FactoryError::Failed(e) => write!(f, "value factory failed: {}", e),
    }
  }
}

impl StdError for FactoryError {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    match self {
      FactoryError::Exhausted => None,
      FactoryError::Failed(e) => Some(&**e),
    }
  }
}

/// Error returned by `produce`.
///
/// A failed production enqueues nothing; the buffer is left exactly as it was.
#[derive(Debug)]
pub enum ProduceError {
  /// The critical section has been closed.
  Closed,
  /// The value factory failed.
  Factory(FactoryError),
}

impl ProduceError {
  /// Returns `true` if production failed because the section is closed.
  pub fn is_closed(&self) -> bool {
    matches!(self, ProduceError::Closed)
  }
}

impl fmt::Display for ProduceError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ProduceError::Closed => write!(f, "critical section closed"),
      ProduceError::Factory(e) => fmt::Display::fmt(e, f),
    }
  }
}

impl StdError for ProduceError {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    match self {
      ProduceError::Closed => None,
      ProduceError::Factory(e) => Some(e),
    }
  }
}

impl From<FactoryError> for ProduceError {
  fn from(e: FactoryError) -> Self {
    ProduceError::Factory(e)
  }
}

/// Error returned by blocking and async consume operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConsumeError {
  /// The critical section was closed before a value became available.
  Closed,
}
impl StdError for ConsumeError {}
impl fmt::Display for ConsumeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConsumeError::Closed => write!(f, "critical section closed"),
    }
  }
}

/// Error returned by `try_consume` when a value could not be taken immediately.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryConsumeError {
  Empty,
  Closed,
}
impl StdError for TryConsumeError {}
impl fmt::Display for TryConsumeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryConsumeError::Empty => write!(f, "buffer empty"),
      TryConsumeError::Closed => write!(f, "critical section closed"),
    }
  }
}

/// Error returned by `consume_timeout`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConsumeTimeoutError {
  /// The critical section was closed while waiting.
  Closed,
  /// The timeout elapsed before a value was produced.
  Timeout,
}

impl StdError for ConsumeTimeoutError {}
impl fmt::Display for ConsumeTimeoutError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConsumeTimeoutError::Closed => write!(f, "critical section closed"),
      ConsumeTimeoutError::Timeout => write!(f, "consume operation timed out"),
    }
  }
}

/// Errors that can occur when building a `Producer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// No value factory was supplied.
  MissingFactory,
  /// The production interval was zero.
  ZeroInterval,
  /// The ticker thread name contained a NUL byte.
  InvalidThreadName,
  /// The ticker thread could not be spawned.
  Spawn(String),
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::MissingFactory => write!(f, "a value factory is required"),
      BuildError::ZeroInterval => write!(f, "production interval cannot be zero"),
      BuildError::InvalidThreadName => write!(f, "ticker thread name must not contain NUL bytes"),
      BuildError::Spawn(reason) => write!(f, "failed to spawn ticker thread: {}", reason),
    }
  }
}

impl StdError for BuildError {}

/// Errors raised while loading a producer configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read configuration file: {0}")]
  Read(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  Parse(String),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidValue { field: String, message: String },
}
