//! Single-resolution completions for callback-style device APIs
//!
//! Host print services report results through success/error callbacks and
//! make no promise about calling only one of them, or only once. A
//! [`Resolver`] accepts the first signal and ignores every later one; the
//! paired [`Pending`] future yields that first signal. Dropping the
//! [`Pending`] (e.g. after a timeout) turns later signals into no-ops.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::device::DeviceTransport;
use crate::error::{PrintError, PrintResult};

/// Create a resolver/future pair
pub fn completion<T>() -> (Resolver<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Resolver {
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        Pending { rx },
    )
}

/// Settling side, handed to the callback-style device
pub struct Resolver<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<PrintResult<T>>>>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Resolver<T> {
    /// Signal success. Returns false if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Signal failure with the device's raw error payload
    pub fn reject(&self, payload: impl Into<Value>) -> bool {
        self.settle(Err(PrintError::Transport(payload.into())))
    }

    /// Signal failure with a typed error
    pub fn fail(&self, err: PrintError) -> bool {
        self.settle(Err(err))
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }

    fn settle(&self, result: PrintResult<T>) -> bool {
        let Some(tx) = self.slot.lock().take() else {
            debug!("Ignoring device signal after completion already settled");
            return false;
        };
        // The waiting side may be gone (timed out); the signal is consumed either way.
        if tx.send(result).is_err() {
            debug!("Device signal arrived after the waiter went away");
        }
        true
    }
}

/// Waiting side; resolves with the first signal
pub struct Pending<T> {
    rx: oneshot::Receiver<PrintResult<T>>,
}

impl<T> Future for Pending<T> {
    type Output = PrintResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(PrintError::transport(
                    "device released the request without responding",
                ))
            })
        })
    }
}

/// Device API that reports results through callbacks
pub trait CallbackDevice: Send + Sync {
    fn send(&self, command: String, done: Resolver<()>);

    fn read_until_delimiter(&self, delimiter: String, done: Resolver<String>);
}

/// Adapts a [`CallbackDevice`] to [`DeviceTransport`]
pub struct CallbackTransport<D> {
    device: D,
}

impl<D> CallbackTransport<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }
}

#[async_trait]
impl<D: CallbackDevice> DeviceTransport for CallbackTransport<D> {
    async fn send(&self, command: &str) -> PrintResult<()> {
        let (done, pending) = completion();
        self.device.send(command.to_string(), done);
        pending.await
    }

    async fn read_until(&self, delimiter: &str) -> PrintResult<String> {
        let (done, pending) = completion();
        self.device.read_until_delimiter(delimiter.to_string(), done);
        pending.await
    }
}
