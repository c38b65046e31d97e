//! Latest-wins time-based sampling for tokio channels and streams.
//!
//! `downsample` turns an unbounded-rate source into one that emits at most
//! once per fixed period, always delivering the most recent value available
//! at the moment of emission. Intermediate values are dropped silently -
//! this is a sampler, not a queue.
//!
//! # Semantics
//!
//! - **Latest wins**: of all values that arrive within a period, only the
//!   last one is emitted.
//! - **Sparse input restarts the cadence**: if a period elapses with nothing
//!   buffered, the next value is emitted the moment it arrives and the
//!   period restarts from that emission. The gap between emissions is never
//!   shorter than the period, but can be arbitrarily longer.
//! - **Closure propagates**: when the input closes, the output closes
//!   promptly; a value still buffered at that moment is discarded, never
//!   flushed.
//!
//! # Two surfaces, one state machine
//!
//! [`Sampler`] consumes a `tokio::sync::mpsc::Receiver` and owns a
//! background task (cancelled when the handle is dropped).
//! [`SampleExt::sample`] is the combinator form for composing with other
//! stream adapters.
//!
//! # Example
//!
//! ```
//! use downsample::SampleExt;
//! use futures::StreamExt;
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use tokio_stream::wrappers::ReceiverStream;
//!
//! #[tokio::main(flavor = "current_thread", start_paused = true)]
//! async fn main() {
//!     let (tx, rx) = mpsc::channel(8);
//!     let mut positions = std::pin::pin!(ReceiverStream::new(rx).sample(Duration::from_millis(100)));
//!
//!     // A burst of updates within one period...
//!     for position in [1, 2, 3] {
//!         tx.send(position).await.unwrap();
//!     }
//!
//!     // ...collapses to the latest value at the tick.
//!     assert_eq!(positions.next().await, Some(3));
//!
//!     drop(tx);
//!     assert_eq!(positions.next().await, None);
//! }
//! ```

mod error;
mod sampler;
pub mod stream;

pub use error::{Result, SampleError};
pub use sampler::Sampler;
pub use stream::{Sample, SampleExt};
