//! Streaming backpressure via bounded channels.
//!
//! Streaming responses pass straight through the caching decorator —
//! caching them would require full buffering, defeating the point of
//! streaming. What they do get is a bounded `tokio::sync::mpsc::channel`
//! between producer and consumer, so a fast transport cannot fill
//! unbounded memory while a slow agent loop drains events.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use crate::Result;

/// Default number of items buffered between producer and consumer.
///
/// 64 balances throughput (enough items to keep the consumer busy)
/// with memory pressure (bounded, not unbounded).
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Wrap a stream in a bounded channel for backpressure.
///
/// Spawns a producer task that reads from `inner` and sends items
/// through a bounded `mpsc` channel. When the channel is full, the
/// producer blocks until the consumer reads. If the consumer drops
/// the stream, the producer stops.
///
/// # Panics
///
/// Requires a tokio runtime context (called within an async fn).
pub fn bounded_stream<T: Send + 'static>(
    inner: Pin<Box<dyn Stream<Item = Result<T>> + Send>>,
    buffer_size: usize,
) -> Pin<Box<dyn Stream<Item = Result<T>> + Send>> {
    let (tx, rx) = tokio::sync::mpsc::channel(buffer_size);

    tokio::spawn(async move {
        let mut inner = inner;
        while let Some(item) = inner.next().await {
            if tx.send(item).await.is_err() {
                break; // receiver dropped
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}
