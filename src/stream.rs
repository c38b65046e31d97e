//! Stream sampling utilities

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep};

/// Extension trait to add time-based sampling to any Stream
pub trait SampleExt: Stream {
    /// Sample the stream, emitting at most once per period
    ///
    /// Uses "latest-wins" semantics - if multiple items arrive during a
    /// period, only the latest is emitted. When the input runs sparser than
    /// the period, the next item is emitted as soon as it arrives and the
    /// period restarts from that emission. Items still buffered when the
    /// input ends are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    fn sample(self, period: Duration) -> Sample<Self>
    where
        Self: Sized,
    {
        Sample::new(self, period)
    }
}

impl<T: Stream> SampleExt for T {}

pin_project! {
    /// A stream combinator that samples at a fixed period, latest value wins
    pub struct Sample<S: Stream> {
        #[pin]
        stream: S,
        #[pin]
        sleep: Sleep,
        period: Duration,
        pending: Option<S::Item>,
        // Timer expired with an empty slot; emit the next arrival immediately
        awaiting_first: bool,
        done: bool,
    }
}

impl<S: Stream> Sample<S> {
    /// Create a new sampled stream
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(stream: S, period: Duration) -> Self {
        assert!(!period.is_zero(), "sample period must be non-zero");

        Self {
            stream,
            sleep: sleep(period),
            period,
            pending: None,
            awaiting_first: false,
            done: false,
        }
    }
}

impl<S: Stream> Stream for Sample<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        // Drain all available items, keeping only the latest
        loop {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    if *this.awaiting_first {
                        // Sparse input: emit on arrival and restart the window
                        *this.awaiting_first = false;
                        this.sleep.as_mut().reset(Instant::now() + *this.period);
                        return Poll::Ready(Some(item));
                    }
                    *this.pending = Some(item);
                    // Continue draining
                }
                Poll::Ready(None) => {
                    // Stream ended; whatever is buffered is discarded
                    *this.done = true;
                    *this.pending = None;
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    // No more items available right now
                    break;
                }
            }
        }

        if *this.awaiting_first {
            // Timer is parked; only a new item or closure can wake us
            return Poll::Pending;
        }

        ready!(this.sleep.as_mut().poll(cx));

        match this.pending.take() {
            Some(item) => {
                this.sleep.as_mut().reset(Instant::now() + *this.period);
                Poll::Ready(Some(item))
            }
            None => {
                *this.awaiting_first = true;
                Poll::Pending
            }
        }
    }
}
