//! Channel-backed closable stream.
//!
//! A gateway transport task owns the [`ChannelSender`] and pushes decoded
//! messages; the consumer owns the [`ChannelStream`]. Closing the stream
//! wakes any pending receive and tells the producer to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, Notify};

use crate::error::GatewayError;
use crate::stream::CloseableStream;

/// Close signal shared between both halves.
#[derive(Default)]
struct CloseSignal {
    closed: AtomicBool,
    notify: Notify,
}

impl CloseSignal {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent close is not missed.
        notified.as_mut().enable();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

/// Create a bounded channel stream. A capacity of zero is treated as one.
pub fn channel<T: Send>(capacity: usize) -> (ChannelSender<T>, ChannelStream<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let signal = Arc::new(CloseSignal::default());
    (
        ChannelSender {
            tx,
            signal: Arc::clone(&signal),
        },
        ChannelStream {
            rx: Mutex::new(rx),
            signal,
        },
    )
}

/// Producer half. Dropping every sender ends the stream naturally.
pub struct ChannelSender<T> {
    tx: mpsc::Sender<Result<T, GatewayError>>,
    signal: Arc<CloseSignal>,
}

impl<T> Clone for ChannelSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            signal: Arc::clone(&self.signal),
        }
    }
}

impl<T: Send> ChannelSender<T> {
    /// Deliver an element or a transport error to the consumer.
    ///
    /// Waits for buffer space; fails with [`GatewayError::Closed`] once the
    /// consumer has closed or dropped the stream.
    pub async fn send(&self, item: Result<T, GatewayError>) -> Result<(), GatewayError> {
        if self.signal.is_closed() {
            return Err(GatewayError::Closed);
        }
        tokio::select! {
            biased;
            _ = self.signal.wait() => Err(GatewayError::Closed),
            res = self.tx.send(item) => res.map_err(|_| GatewayError::Closed),
        }
    }

    /// Resolves once the consumer closes or drops the stream.
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.signal.wait() => {}
            _ = self.tx.closed() => {}
        }
    }

    /// Returns `true` if the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed() || self.tx.is_closed()
    }
}

/// Consumer half, a [`CloseableStream`] over the channel.
pub struct ChannelStream<T> {
    rx: Mutex<mpsc::Receiver<Result<T, GatewayError>>>,
    signal: Arc<CloseSignal>,
}

impl<T> ChannelStream<T> {
    /// Returns `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }
}

#[async_trait]
impl<T: Send> CloseableStream for ChannelStream<T> {
    type Item = T;

    async fn next(&self) -> Option<Result<T, GatewayError>> {
        if self.signal.is_closed() {
            return None;
        }
        let mut rx = self.rx.lock().await;
        let item = tokio::select! {
            biased;
            _ = self.signal.wait() => None,
            item = rx.recv() => item,
        };
        if self.signal.is_closed() {
            rx.close();
            return None;
        }
        item
    }

    fn close(&self) {
        self.signal.close();
        // A pending `next` holds the lock and closes the receiver itself.
        if let Ok(mut rx) = self.rx.try_lock() {
            rx.close();
        }
    }
}

impl<T> Drop for ChannelStream<T> {
    fn drop(&mut self) {
        self.signal.close();
    }
}
