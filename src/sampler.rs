//! Channel-based sampling.
//!
//! [`Sampler`] bridges an input channel to an output channel under a fixed
//! period, spawning one background task that owns all sampling state. The
//! task buffers at most one value (latest wins), emits it when the period
//! elapses, and falls back to emit-on-arrival when the input runs sparse.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{Result, SampleError};

/// Handle to a sampled channel.
///
/// Created by [`Sampler::spawn`]. Yields at most one value per period,
/// always the most recent value received from the input at the moment of
/// emission. Dropping the handle cancels the background task, so an
/// abandoned sampler never leaks even when its input never closes.
///
/// # Example
///
/// ```
/// use downsample::Sampler;
/// use std::time::Duration;
/// use tokio::sync::mpsc;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() -> downsample::Result<()> {
/// let (tx, rx) = mpsc::channel(8);
/// let mut sampled = Sampler::spawn(rx, Duration::from_millis(100))?;
///
/// tx.send(1).await.unwrap();
/// tx.send(2).await.unwrap();
///
/// // Only the latest value survives to the first tick.
/// assert_eq!(sampled.recv().await, Some(2));
///
/// // Closing the input shuts the sampler down.
/// drop(tx);
/// assert_eq!(sampled.recv().await, None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Sampler<T> {
    /// Sampled output
    output: mpsc::Receiver<T>,

    /// Count of values overwritten before they could be emitted
    dropped: Arc<AtomicU64>,

    /// Cancellation token for stopping the background task
    cancel: CancellationToken,
}

impl<T: Send + 'static> Sampler<T> {
    /// Spawn a sampling task over `input`, emitting at most once per `period`.
    ///
    /// Returns immediately with the output handle; all work happens in the
    /// background task. The task runs until the input channel closes, the
    /// handle is dropped, or the handle's consumer stops receiving and drops
    /// the handle mid-send.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::ZeroPeriod`] if `period` is zero.
    pub fn spawn(input: mpsc::Receiver<T>, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(SampleError::ZeroPeriod);
        }

        // Capacity 1: a slow consumer blocks the task's send, delaying the
        // next cycle rather than piling up stale values.
        let (output_tx, output_rx) = mpsc::channel(1);
        let dropped = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        let dropped_task = Arc::clone(&dropped);
        let cancel_task = cancel.clone();
        tokio::spawn(async move {
            sample_worker(input, output_tx, period, dropped_task, cancel_task).await;
        });

        Ok(Self { output: output_rx, dropped, cancel })
    }
}

impl<T> Sampler<T> {
    /// Receive the next sampled value.
    ///
    /// Returns `None` once the input channel has closed and the task has
    /// shut down. No value buffered at the moment of closure is ever
    /// delivered.
    pub async fn recv(&mut self) -> Option<T> {
        self.output.recv().await
    }

    /// Number of input values overwritten before they could be emitted.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Stream for Sampler<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().output.poll_recv(cx)
    }
}

impl<T> Drop for Sampler<T> {
    fn drop(&mut self) {
        // Cancel the task on drop so an unclosed input can't leak it
        self.cancel.cancel();
    }
}

/// Background task bridging input to output under the sampling period.
///
/// Two wait phases: armed (timer racing input) and, after a timer expiry
/// with nothing buffered, an input-only wait that emits the next arrival
/// immediately. The period restarts from every emission, so cadence is not
/// phase-locked to task start.
async fn sample_worker<T>(
    mut input: mpsc::Receiver<T>,
    output: mpsc::Sender<T>,
    period: Duration,
    dropped: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    let sleep = time::sleep(period);
    tokio::pin!(sleep);

    // Latest-wins slot; never holds more than one value
    let mut pending: Option<T> = None;

    // Set when the timer expired with an empty slot; while set, the timer is
    // parked and the next input value is emitted on arrival
    let mut awaiting_first = false;

    let mut emitted = 0u64;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("sampler cancelled");
                break;
            }
            received = input.recv() => match received {
                Some(value) => {
                    if awaiting_first {
                        // Sparse input: emit immediately and restart the window
                        awaiting_first = false;
                        if output.send(value).await.is_err() {
                            debug!("output receiver dropped, shutting down");
                            break;
                        }
                        emitted += 1;
                        trace!(emitted, "emitted on arrival after idle window");
                        sleep.as_mut().reset(Instant::now() + period);
                    } else if pending.replace(value).is_some() {
                        dropped.fetch_add(1, Ordering::Relaxed);
                        trace!("overwrote pending value");
                    }
                }
                None => {
                    // Anything left in the slot is discarded, not flushed
                    debug!(emitted, "input closed, shutting down");
                    break;
                }
            },
            () = &mut sleep, if !awaiting_first => {
                match pending.take() {
                    Some(value) => {
                        if output.send(value).await.is_err() {
                            debug!("output receiver dropped, shutting down");
                            break;
                        }
                        emitted += 1;
                        trace!(emitted, "emitted on tick");
                        sleep.as_mut().reset(Instant::now() + period);
                    }
                    None => awaiting_first = true,
                }
            }
        }
    }

    debug!(emitted, "sampler task ended");
    // Returning drops the output sender, closing the output exactly once
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn zero_period_is_rejected() {
        let (_tx, rx) = mpsc::channel::<u32>(1);
        let err = Sampler::spawn(rx, Duration::ZERO).unwrap_err();
        assert_eq!(err, SampleError::ZeroPeriod);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_value_wins_within_a_period() {
        let (tx, rx) = mpsc::channel(16);
        let mut sampled = Sampler::spawn(rx, Duration::from_millis(100)).unwrap();

        for value in [1, 2, 3] {
            tx.send(value).await.unwrap();
        }

        assert_eq!(sampled.recv().await, Some(3));
        assert_eq!(sampled.dropped(), 2);

        drop(tx);
        assert_eq!(sampled.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_implements_stream() {
        use futures::StreamExt;

        let (tx, rx) = mpsc::channel(4);
        let mut sampled = Sampler::spawn(rx, Duration::from_millis(50)).unwrap();

        tx.send("latest").await.unwrap();
        assert_eq!(sampled.next().await, Some("latest"));

        drop(tx);
        assert_eq!(sampled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_the_task() {
        let (tx, rx) = mpsc::channel::<u32>(1);
        let sampled = Sampler::spawn(rx, Duration::from_secs(60)).unwrap();
        drop(sampled);

        // Give the cancelled task a chance to run to completion
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        // The worker held the input receiver; its exit closes the channel
        assert!(tx.send(1).await.is_err());
    }

    proptest! {
        #[test]
        fn burst_keeps_only_the_latest(values in prop::collection::vec(any::<u32>(), 1..64)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            rt.block_on(async {
                let (tx, rx) = mpsc::channel(values.len());
                let mut sampled = Sampler::spawn(rx, Duration::from_millis(10)).unwrap();

                for &value in &values {
                    tx.send(value).await.unwrap();
                }

                prop_assert_eq!(sampled.recv().await, Some(*values.last().unwrap()));
                prop_assert_eq!(sampled.dropped(), values.len() as u64 - 1);

                drop(tx);
                prop_assert_eq!(sampled.recv().await, None);
                Ok(())
            })?;
        }
    }
}
