//! A lock-guarded FIFO hand-off fed by a periodic producer.
//!
//! Fibre Handoff pairs a [`CriticalSection`], an unbounded FIFO buffer behind a
//! single mutex and condition variable, with a [`Ticker`] that fills it from a
//! [`ValueFactory`] on a fixed cadence. Any number of threads or tasks read
//! from it, blocking, asynchronously, or through a completion callback.
//!
//! ```no_run
//! use fibre_handoff::Producer;
//! use std::time::Duration;
//!
//! let keys = Producer::builder()
//!   .factory(|| 'k')
//!   .interval(Duration::from_millis(200))
//!   .build()
//!   .unwrap();
//!
//! assert_eq!(keys.read().unwrap(), 'k');
//! ```

pub mod config;
pub mod critical_section;
pub mod error;
pub mod factory;
pub mod producer;
pub mod ticker;

mod sync_util;

pub use config::ProducerConfig;
pub use critical_section::{ConsumeFuture, ConsumeStream, CriticalSection};
pub use error::{
  BuildError, ConfigError, ConsumeError, ConsumeTimeoutError, FactoryError, ProduceError,
  PushError, TryConsumeError,
};
pub use factory::ValueFactory;
pub use producer::{PendingRead, Producer, ProducerBuilder};
pub use ticker::{Ticker, TickerStats};

// Helper function to check if a type is Send + Sync.
#[allow(dead_code)]
fn assert_send_sync<T: Send + Sync>() {}

#[allow(dead_code)]
fn handles_are_send_sync() {
  assert_send_sync::<CriticalSection<u64>>();
  assert_send_sync::<Producer<u64>>();
}
