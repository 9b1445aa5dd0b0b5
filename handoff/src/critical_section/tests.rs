use super::*; // CriticalSection, ConsumeFuture, ConsumeStream
use crate::error::{ConsumeError, ConsumeTimeoutError, FactoryError, ProduceError, TryConsumeError};
use crate::factory::{from_iter, try_from_fn};

use futures_util::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(1);

fn counting_section() -> CriticalSection<usize> {
  let next = AtomicUsize::new(0);
  CriticalSection::new(move || next.fetch_add(1, AtomicOrdering::Relaxed))
}

#[test]
fn produced_values_are_consumed_in_order() {
  let section = counting_section();
  for _ in 0..5 {
    section.produce().unwrap();
  }
  assert_eq!(section.len(), 5);
  for expected in 0..5 {
    assert_eq!(section.consume().unwrap(), expected);
  }
  assert!(section.is_empty());
}

#[test]
fn abc_sequence_then_blocks_for_fourth() {
  let section = Arc::new(CriticalSection::new(from_iter(vec!["A", "B", "C", "D"])));
  for _ in 0..3 {
    section.produce().unwrap();
  }
  assert_eq!(section.consume().unwrap(), "A");
  assert_eq!(section.consume().unwrap(), "B");
  assert_eq!(section.consume().unwrap(), "C");

  // The fourth consume must wait for the fourth produce.
  assert_eq!(
    section.consume_timeout(Duration::from_millis(50)),
    Err(ConsumeTimeoutError::Timeout)
  );

  let consumer = {
    let section = Arc::clone(&section);
    thread::spawn(move || section.consume())
  };
  thread::sleep(Duration::from_millis(50));
  assert!(!consumer.is_finished());

  section.produce().unwrap();
  assert_eq!(consumer.join().unwrap(), Ok("D"));
}

#[test]
fn factory_failure_enqueues_nothing() {
  let calls = Arc::new(AtomicUsize::new(0));
  let section = CriticalSection::new(try_from_fn({
    let calls = Arc::clone(&calls);
    move || {
      if calls.fetch_add(1, AtomicOrdering::SeqCst) == 1 {
        Err(FactoryError::new("flaky"))
      } else {
        Ok('x')
      }
    }
  }));

  section.produce().unwrap();
  match section.produce() {
    Err(ProduceError::Factory(FactoryError::Failed(e))) => assert_eq!(e.to_string(), "flaky"),
    res => panic!("Expected factory failure, got {:?}", res),
  }
  assert_eq!(section.len(), 1);
  section.produce().unwrap();
  assert_eq!(section.len(), 2);
}

#[test]
fn exhausted_factory_surfaces_as_produce_error() {
  let section = CriticalSection::new(from_iter(Vec::<u8>::new()));
  let err = section.produce().unwrap_err();
  assert!(matches!(err, ProduceError::Factory(ref e) if e.is_exhausted()));
  assert!(section.is_empty());
}

#[test]
fn try_consume_on_empty() {
  let section = counting_section();
  assert_eq!(section.try_consume(), Err(TryConsumeError::Empty));
  section.produce().unwrap();
  assert_eq!(section.try_consume(), Ok(0));
}

#[test]
fn consume_timeout_accepts_unbounded_durations() {
  let section = Arc::new(counting_section());
  section.produce().unwrap();
  assert_eq!(section.consume_timeout(Duration::MAX), Ok(0));

  // Nothing buffered: the wait must still be released by a later produce.
  let consumer = {
    let section = section.clone();
    thread::spawn(move || section.consume_timeout(Duration::MAX))
  };
  while section.waiting_consumers() < 1 {
    thread::yield_now();
  }
  section.produce().unwrap();
  assert_eq!(consumer.join().unwrap(), Ok(1));
}

#[test]
fn consume_timeout_gives_up_when_nothing_arrives() {
  let section = counting_section();
  assert_eq!(
    section.consume_timeout(Duration::from_millis(20)),
    Err(ConsumeTimeoutError::Timeout)
  );
  assert_eq!(section.waiting_consumers(), 0);
}

#[test]
fn push_shares_the_buffer_with_produce() {
  let section = counting_section();
  section.push(100).unwrap();
  section.produce().unwrap();
  assert_eq!(section.consume().unwrap(), 100);
  assert_eq!(section.consume().unwrap(), 0);
}

#[test]
fn close_is_idempotent_and_rejects_further_use() {
  let section = counting_section();
  section.produce().unwrap();
  section.close();
  section.close();

  assert!(section.is_closed());
  assert!(section.is_empty());
  assert!(section.produce().unwrap_err().is_closed());
  assert_eq!(section.push(7).unwrap_err().into_inner(), 7);
  assert_eq!(section.consume(), Err(ConsumeError::Closed));
  assert_eq!(section.try_consume(), Err(TryConsumeError::Closed));
  assert_eq!(
    section.consume_timeout(Duration::from_millis(1)),
    Err(ConsumeTimeoutError::Closed)
  );
}

#[test]
fn close_drops_buffered_values() {
  let drop_count = Arc::new(AtomicUsize::new(0));
  struct DropCounter(Arc<AtomicUsize>);
  impl Drop for DropCounter {
    fn drop(&mut self) {
      self.0.fetch_add(1, AtomicOrdering::SeqCst);
    }
  }

  let section = CriticalSection::new({
    let drop_count = Arc::clone(&drop_count);
    move || DropCounter(Arc::clone(&drop_count))
  });
  section.produce().unwrap();
  section.produce().unwrap();
  section.close();
  assert_eq!(drop_count.load(AtomicOrdering::SeqCst), 2);
}

#[test]
fn close_releases_blocked_consumers() {
  let section = Arc::new(counting_section());
  let num_consumers = 4;
  let barrier = Arc::new(Barrier::new(num_consumers + 1));

  let handles: Vec<_> = (0..num_consumers)
    .map(|_| {
      let section = Arc::clone(&section);
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        barrier.wait();
        section.consume()
      })
    })
    .collect();

  barrier.wait();
  while section.waiting_consumers() < num_consumers {
    thread::yield_now();
  }
  section.close();

  for handle in handles {
    assert_eq!(handle.join().unwrap(), Err(ConsumeError::Closed));
  }
}

#[test]
fn racing_consumers_split_single_value() {
  let section = Arc::new(counting_section());
  let barrier = Arc::new(Barrier::new(3));

  let handles: Vec<_> = (0..2)
    .map(|_| {
      let section = Arc::clone(&section);
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        barrier.wait();
        section.consume()
      })
    })
    .collect();

  section.produce().unwrap();
  barrier.wait();

  // Exactly one of the two gets value 0; the other keeps waiting.
  thread::sleep(Duration::from_millis(50));
  let finished = handles.iter().filter(|h| h.is_finished()).count();
  assert_eq!(finished, 1);

  section.produce().unwrap();
  let mut results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
  results.sort_unstable();
  assert_eq!(results, vec![0, 1]);
}

#[tokio::test]
async fn consume_async_waits_for_produce() {
  let section = Arc::new(counting_section());
  let producer = {
    let section = Arc::clone(&section);
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      section.produce().unwrap();
    })
  };

  let value = timeout(TEST_TIMEOUT, section.consume_async())
    .await
    .expect("Consume timed out")
    .unwrap();
  assert_eq!(value, 0);
  producer.await.unwrap();
}

#[tokio::test]
async fn dropped_future_forwards_its_wakeup() {
  let section = counting_section();

  let mut abandoned = Box::pin(section.consume_async());
  assert!(futures_util::poll!(abandoned.as_mut()).is_pending());
  let mut patient = Box::pin(section.consume_async());
  assert!(futures_util::poll!(patient.as_mut()).is_pending());

  // The produce wakes `abandoned`, which is dropped without consuming.
  section.produce().unwrap();
  drop(abandoned);
  assert_eq!(section.waiting_consumers(), 0, "patient waiter should have been woken");

  let value = timeout(TEST_TIMEOUT, patient).await.expect("Wakeup was lost").unwrap();
  assert_eq!(value, 0);
  assert_eq!(section.waiting_consumers(), 0);
}

#[tokio::test]
async fn idle_future_holds_the_wakeup_until_dropped() {
  let section = Arc::new(counting_section());

  let mut idle = Box::pin(section.consume_async());
  assert!(futures_util::poll!(idle.as_mut()).is_pending());

  let blocked = {
    let section = section.clone();
    thread::spawn(move || section.consume())
  };
  while section.waiting_consumers() < 2 {
    thread::yield_now();
  }

  // The wake goes to the registered future, which is never polled again.
  section.produce().unwrap();
  thread::sleep(Duration::from_millis(50));
  assert!(!blocked.is_finished());
  assert_eq!(section.len(), 1);

  drop(idle);
  assert_eq!(blocked.join().unwrap(), Ok(0));
  assert!(section.is_empty());
}

#[tokio::test]
async fn close_resolves_pending_futures() {
  let section = counting_section();
  let mut pending = Box::pin(section.consume_async());
  assert!(futures_util::poll!(pending.as_mut()).is_pending());
  section.close();
  assert_eq!(pending.await, Err(ConsumeError::Closed));
}

#[tokio::test]
async fn stream_ends_on_close() {
  let section = Arc::new(counting_section());
  for _ in 0..3 {
    section.produce().unwrap();
  }

  let mut stream = section.stream();
  assert_eq!(stream.next().await, Some(0));
  assert_eq!(stream.next().await, Some(1));
  assert_eq!(stream.next().await, Some(2));

  let closer = {
    let section = Arc::clone(&section);
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      section.close();
    })
  };
  assert_eq!(timeout(TEST_TIMEOUT, stream.next()).await.unwrap(), None);
  closer.await.unwrap();
}
