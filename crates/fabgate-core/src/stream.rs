//! The `CloseableStream` trait — an async source that can be terminated early.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use crate::error::GatewayError;

/// A boxed closable stream, as handed out by gateway clients.
pub type BoxCloseableStream<T> = Box<dyn CloseableStream<Item = T>>;

/// An asynchronous sequence that can be closed before it is exhausted.
///
/// `next` resolves to `None` at end of stream, `Some(Err(..))` when the
/// underlying transport fails, and `Some(Ok(..))` otherwise.
///
/// # Concurrency
/// Both methods take `&self`, so a stream can be shared through an `Arc`
/// between a consuming task and a task that cancels it. Calls to `next` are
/// serialized internally but the stream is meant for one logical consumer;
/// interleaving several consumers is the caller's responsibility.
#[async_trait]
pub trait CloseableStream: Send + Sync {
    type Item: Send;

    /// Wait for the next element.
    async fn next(&self) -> Option<Result<Self::Item, GatewayError>>;

    /// Release the underlying transport resources.
    ///
    /// Never fails and may be called any number of times. A pending `next`
    /// completes promptly and every later `next` returns `None`.
    fn close(&self);
}

#[async_trait]
impl<S> CloseableStream for Box<S>
where
    S: CloseableStream + ?Sized,
{
    type Item = S::Item;

    async fn next(&self) -> Option<Result<Self::Item, GatewayError>> {
        (**self).next().await
    }

    fn close(&self) {
        (**self).close()
    }
}

#[async_trait]
impl<S> CloseableStream for Arc<S>
where
    S: CloseableStream + ?Sized,
{
    type Item = S::Item;

    async fn next(&self) -> Option<Result<Self::Item, GatewayError>> {
        (**self).next().await
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Adapters for plugging closable streams into `futures` combinators.
pub trait CloseableStreamExt: CloseableStream + Sized + 'static {
    /// Convert into a pinned `futures::Stream`.
    ///
    /// Dropping the returned stream drops `self` without calling `close`;
    /// keep an `Arc` to the original and close it explicitly when early
    /// termination must release transport resources.
    fn into_stream(self) -> Pin<Box<dyn Stream<Item = Result<Self::Item, GatewayError>> + Send>>
    where
        Self::Item: 'static,
    {
        Box::pin(futures::stream::unfold(self, |stream| async move {
            let item = stream.next().await?;
            Some((item, stream))
        }))
    }
}

impl<S> CloseableStreamExt for S where S: CloseableStream + Sized + 'static {}
