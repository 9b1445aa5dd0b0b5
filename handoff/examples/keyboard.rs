// examples/keyboard.rs
//
// A simulated keyboard buffer: a ticker "presses" a key every 200ms and the
// keys are read back through each of the producer's read styles.
//
// Run with `RUST_LOG=fibre_handoff=trace cargo run --example keyboard` to see
// every produce and consume.

use fibre_handoff::{ConsumeError, Producer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const KEYS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_thread_names(true)
    .init();

  let next_key = AtomicUsize::new(0);
  let keyboard = Producer::builder()
    .factory(move || KEYS[next_key.fetch_add(1, Ordering::Relaxed) % KEYS.len()] as char)
    .interval(Duration::from_millis(200))
    .thread_name("keyboard")
    .build()
    .expect("Failed to start keyboard producer");

  println!("--- Blocking read ---");
  for _ in 0..3 {
    println!("[Blocking] key: {:?}", keyboard.read());
  }

  println!("\n--- Future-based read ---");
  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .expect("Failed to build Tokio runtime");
  rt.block_on(async {
    for _ in 0..3 {
      println!("[Async] key: {:?}", keyboard.read_async().await);
    }
  });

  println!("\n--- Callback-based read ---");
  let (tx, rx) = mpsc::channel::<Result<char, ConsumeError>>();
  for _ in 0..3 {
    let tx = tx.clone();
    keyboard
      .read_with(move |result| {
        let _ = tx.send(result);
      })
      .expect("Failed to start reader");
  }
  drop(tx);
  for result in rx {
    println!("[Callback] key: {:?}", result);
  }

  println!("\n--- Begin/end read ---");
  let pending = keyboard.begin_read().expect("Failed to start reader");
  println!("[Begin/End] complete before end? {}", pending.is_complete());
  println!("[Begin/End] key: {:?}", pending.end());

  println!("\nStats: {:?}", keyboard.stats());
  keyboard.close();
  println!("After close: {:?}", keyboard.read());
}
